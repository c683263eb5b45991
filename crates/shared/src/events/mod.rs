use serde::{Deserialize, Serialize};

/// Progress of a single chat turn, streamed to clients as server-sent events.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    ToolCall {
        round: u32,
        tool: String,
        args: serde_json::Value,
    },
    ToolResult {
        round: u32,
        tool: String,
        result: String,
        truncated: bool,
    },
    UnknownTool {
        round: u32,
        tool: String,
    },
    Done {
        reply: String,
        rounds: u32,
        exhausted: bool,
    },
    Error {
        message: String,
    },
}
