// src/task/completion.rs
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use persona_shared::{Tool, ToolCall, Turn};

pub const FINISH_TOOL_CALLS: &str = "tool_calls";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Serialize, Debug)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Turn],
    #[serde(skip_serializing_if = "no_tools")]
    pub tools: &'a [Tool],
}

fn no_tools(tools: &&[Tool]) -> bool {
    tools.is_empty()
}

#[derive(Deserialize, Debug, Clone)]
pub struct CompletionResponse {
    pub choices: Vec<Choice>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Choice {
    #[serde(default)]
    pub finish_reason: Option<String>,
    pub message: ResponseMessage,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// What the model asked for in one response.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Reply(String),
    ToolCalls {
        content: Option<String>,
        calls: Vec<ToolCall>,
    },
}

impl Choice {
    /// Only a `tool_calls` finish that actually carries calls starts a tool round.
    pub fn into_decision(self) -> Decision {
        let ResponseMessage { content, tool_calls } = self.message;
        match tool_calls {
            Some(calls) if self.finish_reason.as_deref() == Some(FINISH_TOOL_CALLS) && !calls.is_empty() => {
                Decision::ToolCalls { content, calls }
            }
            _ => Decision::Reply(content.unwrap_or_default()),
        }
    }
}

/// A hosted chat-completion endpoint.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<CompletionResponse>;
}

/// Client for the OpenAI REST API (chat completions and audio transcriptions).
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl OpenAiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    pub async fn transcribe(&self, model: &str, wav: Vec<u8>) -> Result<String> {
        let file = reqwest::multipart::Part::bytes(wav)
            .file_name("speech.wav")
            .mime_str("audio/wav")?;
        let form = reqwest::multipart::Form::new()
            .text("model", model.to_string())
            .part("file", file);

        let response = self
            .client
            .post(self.url("audio/transcriptions"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .context("transcription request failed")?;

        let response = ensure_success(response, "transcription").await?;
        let transcript = response
            .json::<TranscriptionResponse>()
            .await
            .context("malformed transcription response")?;

        Ok(transcript.text)
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<CompletionResponse> {
        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .context("chat completion request failed")?;

        let response = ensure_success(response, "chat completion").await?;
        response
            .json::<CompletionResponse>()
            .await
            .context("malformed chat completion response")
    }
}

async fn ensure_success(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    bail!("{} failed with {}: {}", what, status, body.trim())
}
