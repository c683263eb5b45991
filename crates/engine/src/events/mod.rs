use tokio::sync::broadcast;
pub use persona_shared::events::ChatEvent;

use crate::task::ChatOutcome;

const CHANNEL_CAPACITY: usize = 100;
const RESULT_DISPLAY_LIMIT: usize = 500;

/// Per-request sender for progress events. Dropping the last clone closes the stream.
#[derive(Clone)]
pub struct EventSender {
    tx: broadcast::Sender<ChatEvent>,
}

impl EventSender {
    pub fn channel() -> (Self, broadcast::Receiver<ChatEvent>) {
        let (tx, rx) = broadcast::channel(CHANNEL_CAPACITY);
        (Self { tx }, rx)
    }

    fn send(&self, event: ChatEvent) {
        let _ = self.tx.send(event); // Ignore if no receivers
    }

    pub fn tool_call(&self, round: u32, tool: &str, args: serde_json::Value) {
        self.send(ChatEvent::ToolCall {
            round,
            tool: tool.to_string(),
            args,
        });
    }

    pub fn tool_result(&self, round: u32, tool: &str, result: String) {
        let total = result.chars().count();
        let truncated = total > RESULT_DISPLAY_LIMIT;
        let display_result = if truncated {
            let head: String = result.chars().take(RESULT_DISPLAY_LIMIT).collect();
            format!("{}... ({} chars total)", head, total)
        } else {
            result
        };

        self.send(ChatEvent::ToolResult {
            round,
            tool: tool.to_string(),
            result: display_result,
            truncated,
        });
    }

    pub fn unknown_tool(&self, round: u32, tool: &str) {
        self.send(ChatEvent::UnknownTool {
            round,
            tool: tool.to_string(),
        });
    }

    pub fn complete(&self, outcome: &ChatOutcome) {
        self.send(ChatEvent::Done {
            reply: outcome.reply.clone(),
            rounds: outcome.rounds,
            exhausted: outcome.exhausted,
        });
    }

    pub fn error(&self, message: String) {
        self.send(ChatEvent::Error { message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_results_are_truncated_on_char_boundaries() {
        let (events, mut rx) = EventSender::channel();

        events.tool_result(1, "record_unknown_question", "é".repeat(600));

        match rx.try_recv().unwrap() {
            ChatEvent::ToolResult { result, truncated, .. } => {
                assert!(truncated);
                assert!(result.ends_with("... (600 chars total)"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn sending_without_receivers_is_harmless() {
        let (events, rx) = EventSender::channel();
        drop(rx);
        events.error("gone".to_string());
    }
}
