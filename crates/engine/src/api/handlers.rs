use axum::{
    body::Bytes,
    extract::{Json, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, sse::{Event, Sse}},
};
use futures_util::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::Instrument;

use persona_shared::Session;

use super::types::*;
use super::AppState;
use crate::events::EventSender;
use crate::task::transcription::{self, AudioFormat, Transcript};

const NO_AUDIO_WARNING: &str = "No audio recorded.";

type ApiError = (StatusCode, Json<serde_json::Value>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

pub async fn handle_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> axum::response::Response {
    if req.message.trim().is_empty() {
        return error(StatusCode::BAD_REQUEST, "message must not be empty").into_response();
    }

    if req.stream.unwrap_or(false) {
        handle_chat_stream(state, req).await.into_response()
    } else {
        handle_chat_standard(state, req).await.into_response()
    }
}

async fn handle_chat_standard(
    state: Arc<AppState>,
    req: ChatRequest,
) -> Result<Json<ChatResponse>, ApiError> {
    let mut session = Session::from_turns(req.history);
    tracing::info!(history = session.len(), "chat turn");

    let outcome = state
        .engine
        .chat(&req.message, session.history(), None)
        .await
        .map_err(|e| {
            tracing::error!(error = %format!("{:#}", e), "chat turn failed");
            error(StatusCode::BAD_GATEWAY, format!("Chat failed: {:#}", e))
        })?;

    session.record_exchange(&req.message, &outcome.reply);

    Ok(Json(ChatResponse {
        reply: outcome.reply,
        rounds: outcome.rounds,
        exhausted: outcome.exhausted,
        history: session.into_turns(),
    }))
}

async fn handle_chat_stream(
    state: Arc<AppState>,
    req: ChatRequest,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let request_id = uuid::Uuid::new_v4().to_string();
    let (events, rx) = EventSender::channel();
    let span = tracing::info_span!("chat_stream", request_id = %request_id);

    // The sender is moved into the task; the stream ends when the task drops it.
    tokio::spawn(
        async move {
            let session = Session::from_turns(req.history);
            tracing::info!(history = session.len(), "chat turn");

            match state.engine.chat(&req.message, session.history(), Some(&events)).await {
                Ok(outcome) => events.complete(&outcome),
                Err(e) => {
                    tracing::error!(error = %format!("{:#}", e), "chat turn failed");
                    events.error(format!("Chat failed: {:#}", e));
                }
            }
        }
        .instrument(span),
    );

    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let event = result.ok()?;
        let json = serde_json::to_string(&event).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream)
}

pub async fn handle_transcribe(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let format = AudioFormat::from_content_type(content_type);

    match transcription::transcribe_audio(state.transcriber.as_ref(), &body, format).await {
        Ok(Transcript::Speech(text)) => {
            (StatusCode::OK, Json(TranscriptionResponse { text })).into_response()
        }
        Ok(Transcript::NoSpeech) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "warning": NO_AUDIO_WARNING })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "transcription failed");
            error(StatusCode::BAD_GATEWAY, format!("Transcription failed: {:#}", e)).into_response()
        }
    }
}

pub async fn handle_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        unknown_tool_calls: state.engine.tools().unknown_calls(),
    })
}

pub async fn health_check() -> &'static str {
    "Persona is running"
}
