use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

const PUSHOVER_ENDPOINT: &str = "https://api.pushover.net/1/messages.json";

/// Fire-and-forget delivery of a short text to the site owner.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn push(&self, text: &str);
}

#[derive(Clone)]
pub struct PushoverCredentials {
    token: String,
    user: String,
}

impl PushoverCredentials {
    pub fn new(token: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user: user.into(),
        }
    }
}

impl fmt::Debug for PushoverCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushoverCredentials")
            .field("token", &"<redacted>")
            .field("user", &"<redacted>")
            .finish()
    }
}

/// Pushover client. Without credentials every push is a silent no-op.
#[derive(Clone, Debug)]
pub struct Pushover {
    client: reqwest::Client,
    endpoint: String,
    credentials: Option<PushoverCredentials>,
}

impl Pushover {
    pub fn new(credentials: Option<PushoverCredentials>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: PUSHOVER_ENDPOINT.to_string(),
            credentials,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.credentials.is_some()
    }
}

#[async_trait]
impl NotificationSink for Pushover {
    async fn push(&self, text: &str) {
        let Some(credentials) = &self.credentials else {
            return;
        };

        let form = [
            ("token", credentials.token.as_str()),
            ("user", credentials.user.as_str()),
            ("message", text),
        ];

        // The outcome is deliberately not acted upon.
        match self
            .client
            .post(&self.endpoint)
            .form(&form)
            .timeout(Duration::from_secs(10))
            .send()
            .await
        {
            Ok(response) if !response.status().is_success() => {
                tracing::debug!(status = %response.status(), "pushover rejected notification");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "pushover delivery failed");
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::routing::post;
    use axum::{Form, Json, Router};

    use super::*;

    type Received = Arc<Mutex<Vec<HashMap<String, String>>>>;

    async fn spawn_pushover() -> (String, Received) {
        let received: Received = Arc::new(Mutex::new(Vec::new()));

        let app = Router::new()
            .route(
                "/1/messages.json",
                post(
                    |State(seen): State<Received>, Form(form): Form<HashMap<String, String>>| async move {
                        seen.lock().unwrap().push(form);
                        Json(serde_json::json!({ "status": 1 }))
                    },
                ),
            )
            .with_state(received.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/1/messages.json", addr), received)
    }

    #[tokio::test]
    async fn no_request_without_credentials() {
        let (endpoint, received) = spawn_pushover().await;
        let pushover = Pushover::new(None).with_endpoint(endpoint);

        pushover.push("Recording x").await;

        assert!(!pushover.is_enabled());
        assert!(received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn posts_token_user_and_message() {
        let (endpoint, received) = spawn_pushover().await;
        let pushover = Pushover::new(Some(PushoverCredentials::new("tok", "usr")))
            .with_endpoint(endpoint);

        pushover.push("Recording Do you know Zig?").await;

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["token"], "tok");
        assert_eq!(received[0]["user"], "usr");
        assert_eq!(received[0]["message"], "Recording Do you know Zig?");
    }

    #[tokio::test]
    async fn swallows_transport_errors() {
        let pushover = Pushover::new(Some(PushoverCredentials::new("tok", "usr")))
            .with_endpoint("http://127.0.0.1:9/1/messages.json");

        // Completes without panicking or surfacing anything.
        pushover.push("unreachable").await;
    }

    #[test]
    fn debug_output_hides_credentials() {
        let rendered = format!("{:?}", PushoverCredentials::new("secret-token", "secret-user"));
        assert!(!rendered.contains("secret"));
    }
}
