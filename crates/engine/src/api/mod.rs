pub mod routes;
pub mod handlers;
pub mod server;
pub mod types;

use std::sync::Arc;

use crate::task::ConversationEngine;
use crate::task::transcription::SpeechToText;

pub use server::start_server;

/// Shared by every request; holds nothing session-specific.
pub struct AppState {
    pub engine: ConversationEngine,
    pub transcriber: Arc<dyn SpeechToText>,
}

impl AppState {
    pub fn new(engine: ConversationEngine, transcriber: Arc<dyn SpeechToText>) -> Self {
        Self { engine, transcriber }
    }
}
