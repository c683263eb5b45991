pub mod completion;
pub mod transcription;

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{json, Value};

use persona_shared::{ToolCall, ToolOutcome, ToolRegistry, Turn};

use crate::events::EventSender;
use completion::{CompletionBackend, CompletionRequest, Decision};

pub const DEFAULT_MAX_TOOL_ROUNDS: u32 = 8;

const EXHAUSTED_REPLY: &str =
    "Sorry, I wasn't able to finish working on that. Could you try asking in a different way?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOutcome {
    pub reply: String,
    /// Tool-resolution rounds performed; API round-trips are `rounds + 1`.
    pub rounds: u32,
    /// The round limit was hit and `reply` is a best-effort fallback.
    pub exhausted: bool,
}

/// Drives one user utterance through the chat-completion API, resolving tool calls.
pub struct ConversationEngine {
    backend: Arc<dyn CompletionBackend>,
    tools: Arc<ToolRegistry>,
    model: String,
    system_prompt: String,
    max_tool_rounds: u32,
}

impl ConversationEngine {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        tools: Arc<ToolRegistry>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            tools,
            model: model.into(),
            system_prompt: system_prompt.into(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_max_tool_rounds(mut self, max_tool_rounds: u32) -> Self {
        self.max_tool_rounds = max_tool_rounds;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// System prompt, then the session history, then the new user turn.
    pub fn build_messages(&self, user_message: &str, history: &[Turn]) -> Vec<Turn> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Turn::system(self.system_prompt.clone()));
        messages.extend_from_slice(history);
        messages.push(Turn::user(user_message));
        messages
    }

    /// Agentic loop: keeps resending until the model answers with text.
    pub async fn chat(
        &self,
        user_message: &str,
        history: &[Turn],
        events: Option<&EventSender>,
    ) -> Result<ChatOutcome> {
        if user_message.trim().is_empty() {
            bail!("message must not be empty");
        }

        let tools = self.tools.tools();
        let mut messages = self.build_messages(user_message, history);
        let mut rounds = 0;

        loop {
            let request = CompletionRequest {
                model: &self.model,
                messages: &messages,
                tools: &tools,
            };
            let response = self
                .backend
                .complete(&request)
                .await
                .with_context(|| format!("chat completion failed after {} tool round(s)", rounds))?;

            let choice = response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("chat completion returned no choices"))?;

            let (content, calls) = match choice.into_decision() {
                Decision::Reply(reply) => {
                    return Ok(ChatOutcome {
                        reply,
                        rounds,
                        exhausted: false,
                    });
                }
                Decision::ToolCalls { content, calls } => (content, calls),
            };

            if rounds >= self.max_tool_rounds {
                tracing::warn!(
                    rounds,
                    pending = calls.len(),
                    "tool round limit reached, returning partial reply"
                );
                let reply = content
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| EXHAUSTED_REPLY.to_string());
                return Ok(ChatOutcome {
                    reply,
                    rounds,
                    exhausted: true,
                });
            }

            rounds += 1;
            tracing::debug!(round = rounds, calls = calls.len(), "resolving tool calls");

            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                let payload = self.resolve(rounds, call, events).await;
                results.push(Turn::tool_result(call.id.clone(), &payload));
            }

            messages.push(Turn::assistant_tool_calls(content, calls));
            messages.extend(results);
        }
    }

    async fn resolve(&self, round: u32, call: &ToolCall, events: Option<&EventSender>) -> Value {
        let name = call.function.name.as_str();
        let parsed = parse_arguments(&call.function.arguments);

        tracing::info!(tool = name, round, "calling tool");
        if let Some(events) = events {
            let shown = match &parsed {
                Ok(args) => args.clone(),
                Err(_) => Value::String(call.function.arguments.clone()),
            };
            events.tool_call(round, name, shown);
        }

        // Unknown names are answered with `{}` whatever their arguments look like.
        let outcome = match parsed {
            Ok(args) => self.tools.invoke(name, &args).await,
            Err(_) if !self.tools.contains(name) => self.tools.invoke(name, &Value::Null).await,
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "malformed tool arguments");
                ToolOutcome::Failed(format!("{:#}", e))
            }
        };
        let payload = outcome.payload();

        if let Some(events) = events {
            match outcome {
                ToolOutcome::NotFound => events.unknown_tool(round, name),
                _ => events.tool_result(round, name, payload.to_string()),
            }
        }

        payload
    }
}

fn parse_arguments(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(raw).context("tool arguments are not valid JSON")
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use persona_shared::NotificationSink;

    use super::completion::{Choice, CompletionResponse, ResponseMessage};
    use super::*;

    /// Replays canned responses and remembers every message list it was sent.
    #[derive(Default)]
    pub struct ScriptedBackend {
        responses: Mutex<VecDeque<Result<CompletionResponse>>>,
        requests: Mutex<Vec<Vec<Turn>>>,
    }

    impl ScriptedBackend {
        pub fn new(responses: Vec<Result<CompletionResponse>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::default(),
            }
        }

        pub fn requests(&self) -> Vec<Vec<Turn>> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(&self, request: &CompletionRequest<'_>) -> Result<CompletionResponse> {
            assert!(!request.tools.is_empty(), "tool specs must be sent on every request");
            self.requests.lock().unwrap().push(request.messages.to_vec());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("no scripted response left")))
        }
    }

    #[derive(Default)]
    pub struct RecordingSink {
        messages: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        pub fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn push(&self, text: &str) {
            self.messages.lock().unwrap().push(text.to_string());
        }
    }

    pub fn reply(text: &str) -> Result<CompletionResponse> {
        Ok(CompletionResponse {
            choices: vec![Choice {
                finish_reason: Some("stop".to_string()),
                message: ResponseMessage {
                    content: Some(text.to_string()),
                    tool_calls: None,
                },
            }],
        })
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Result<CompletionResponse> {
        Ok(CompletionResponse {
            choices: vec![Choice {
                finish_reason: Some("tool_calls".to_string()),
                message: ResponseMessage {
                    content: None,
                    tool_calls: Some(calls),
                },
            }],
        })
    }

    pub fn engine(
        responses: Vec<Result<CompletionResponse>>,
    ) -> (ConversationEngine, Arc<ScriptedBackend>, Arc<RecordingSink>) {
        let backend = Arc::new(ScriptedBackend::new(responses));
        let sink = Arc::new(RecordingSink::default());
        let tools = Arc::new(ToolRegistry::with_defaults(sink.clone()));
        let engine = ConversationEngine::new(backend.clone(), tools, "gpt-4o-mini", "You are Ada.");
        (engine, backend, sink)
    }
}
