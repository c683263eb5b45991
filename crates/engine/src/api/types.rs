use serde::{Deserialize, Serialize};

use persona_shared::Turn;

// Chat endpoint
#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<Turn>,
    #[serde(default)]
    pub stream: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ChatResponse {
    pub reply: String,
    pub rounds: u32,
    pub exhausted: bool,
    /// The session history including this exchange.
    pub history: Vec<Turn>,
}

// Voice input
#[derive(Serialize, Deserialize, Debug)]
pub struct TranscriptionResponse {
    pub text: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct StatsResponse {
    pub unknown_tool_calls: u64,
}
