use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use super::{handlers, AppState};

/// Largest upload the transcription API accepts.
const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::health_check))
        .route("/stats", get(handlers::handle_stats))
        .route("/chat", post(handlers::handle_chat))
        .route(
            "/transcribe",
            post(handlers::handle_transcribe).layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES)),
        )
}
