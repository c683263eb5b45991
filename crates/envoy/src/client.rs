use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use futures_util::StreamExt;
use persona_shared::events::ChatEvent;
use persona_shared::Turn;

#[derive(Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    pub history: &'a [Turn],
    stream: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub struct ChatResponse {
    pub reply: String,
    #[serde(default)]
    pub exhausted: bool,
}

#[derive(Debug, PartialEq)]
pub enum Transcription {
    Text(String),
    /// The server heard nothing; carries its warning text.
    NoSpeech(String),
}

#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn chat(&self, message: &str, history: &[Turn]) -> Result<ChatResponse> {
        let url = format!("{}/chat", self.base_url);

        let request = ChatRequest {
            message,
            history,
            stream: None,
        };

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(request_failed(response).await);
        }

        let response = response.json::<ChatResponse>().await?;
        Ok(response)
    }

    /// Streams one turn, handing every event to `event_handler`.
    /// Returns the final reply, or `None` if the stream ended without one.
    pub async fn chat_stream(
        &self,
        message: &str,
        history: &[Turn],
        mut event_handler: impl FnMut(&ChatEvent),
    ) -> Result<Option<String>> {
        let url = format!("{}/chat", self.base_url);

        let request = ChatRequest {
            message,
            history,
            stream: Some(true),
        };

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(request_failed(response).await);
        }

        let mut stream = response.bytes_stream();
        let mut buffer = Vec::new();
        let mut reply = None;

        while let Some(chunk) = stream.next().await {
            let bytes = chunk?;
            buffer.extend_from_slice(&bytes);

            for event in drain_events(&mut buffer) {
                if let ChatEvent::Done { reply: text, .. } = &event {
                    reply = Some(text.clone());
                }
                event_handler(&event);
            }
        }

        Ok(reply)
    }

    pub async fn transcribe(&self, audio: Vec<u8>, content_type: &str) -> Result<Transcription> {
        let url = format!("{}/transcribe", self.base_url);

        let response = self.client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(audio)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.json::<serde_json::Value>().await?;
            let warning = body["warning"].as_str().unwrap_or("No audio recorded.");
            return Ok(Transcription::NoSpeech(warning.to_string()));
        }

        if !response.status().is_success() {
            return Err(request_failed(response).await);
        }

        let body = response.json::<serde_json::Value>().await?;
        let text = body["text"]
            .as_str()
            .ok_or_else(|| anyhow!("Invalid text in response"))?;

        Ok(Transcription::Text(text.to_string()))
    }
}

async fn request_failed(response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let detail = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| body["error"].as_str().map(str::to_string));

    match detail {
        Some(detail) => anyhow!("Request failed: {} ({})", status, detail),
        None => anyhow!("Request failed: {}", status),
    }
}

/// Pulls every complete SSE line out of `buffer`, leaving a partial line behind.
fn drain_events(buffer: &mut Vec<u8>) -> Vec<ChatEvent> {
    let mut events = Vec::new();

    while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=newline_pos).collect();
        let line = String::from_utf8_lossy(&line);

        // SSE format: "data: {json}\n"
        if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim();
            if data.is_empty() {
                continue;
            }

            if let Ok(event) = serde_json::from_str::<ChatEvent>(data) {
                events.push(event);
            }
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::json;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn partial_lines_stay_buffered() {
        let mut buffer = b"data: {\"type\":\"error\",\"message\":\"boom\"}\n\ndata: {\"type\":".to_vec();

        let events = drain_events(&mut buffer);

        assert_eq!(events, vec![ChatEvent::Error { message: "boom".to_string() }]);
        assert_eq!(buffer, b"data: {\"type\":".to_vec());
    }

    #[test]
    fn non_data_lines_are_ignored() {
        let mut buffer = b": keep-alive\nevent: ping\n\n".to_vec();
        assert!(drain_events(&mut buffer).is_empty());
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn stream_returns_the_done_reply() {
        let app = Router::new().route(
            "/chat",
            post(|| async {
                [
                    r#"data: {"type":"tool_call","round":1,"tool":"record_unknown_question","args":{}}"#,
                    "",
                    r#"data: {"type":"done","reply":"I've noted that.","rounds":1,"exhausted":false}"#,
                    "",
                    "",
                ]
                .join("\n")
            }),
        );
        let client = ApiClient::new(serve(app).await);

        let mut seen = Vec::new();
        let reply = client
            .chat_stream("Do you know Zig?", &[], |event| seen.push(event.clone()))
            .await
            .unwrap();

        assert_eq!(reply.as_deref(), Some("I've noted that."));
        assert_eq!(seen.len(), 2);
    }

    #[tokio::test]
    async fn no_speech_is_a_warning_not_an_error() {
        let app = Router::new().route(
            "/transcribe",
            post(|| async {
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "warning": "No audio recorded." })),
                )
            }),
        );
        let client = ApiClient::new(serve(app).await);

        let outcome = client.transcribe(Vec::new(), "audio/wav").await.unwrap();

        assert_eq!(outcome, Transcription::NoSpeech("No audio recorded.".to_string()));
    }

    #[tokio::test]
    async fn server_errors_carry_the_detail() {
        let app = Router::new().route(
            "/chat",
            post(|| async {
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": "Chat failed: invalid api key" })),
                )
            }),
        );
        let client = ApiClient::new(serve(app).await);

        let err = client.chat("hi", &[]).await.unwrap_err();

        assert!(err.to_string().contains("invalid api key"));
    }
}
