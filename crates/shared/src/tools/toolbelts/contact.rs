use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::notify::NotificationSink;
use crate::register_toolbelt;

pub const RECORD_USER_DETAILS: &str = "record_user_details";
pub const RECORD_UNKNOWN_QUESTION: &str = "record_unknown_question";

/// Lets the model hand visitor details and unanswered questions to the owner.
pub struct Contact {
    notifier: Arc<dyn NotificationSink>,
}

impl Contact {
    pub fn new(notifier: Arc<dyn NotificationSink>) -> Self {
        Self { notifier }
    }
}

register_toolbelt! {
    Contact {
        tools: {
            "record_user_details" => record_user_details {
                description: "Use this tool to record user interest and email address",
                params: [
                    required "email": "string" => "User email",
                    optional "name": "string" => "User name",
                    optional "notes": "string" => "Additional notes"
                ]
            },
            "record_unknown_question" => record_unknown_question {
                description: "Record any unanswered question",
                params: [
                    required "question": "string" => "Unanswered question"
                ]
            }
        }
    }
}

#[derive(Deserialize)]
struct UserDetails {
    email: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Deserialize)]
struct UnknownQuestion {
    question: String,
}

fn recorded() -> Value {
    json!({ "recorded": "ok" })
}

impl Contact {
    // Acknowledged whether or not the push is delivered.
    async fn record_user_details(&self, args: &Value) -> Result<Value> {
        let details = UserDetails::deserialize(args)
            .with_context(|| format!("invalid arguments for {}", RECORD_USER_DETAILS))?;

        let name = details.name.as_deref().unwrap_or("Name not provided");
        let notes = details.notes.as_deref().unwrap_or("not provided");

        self.notifier
            .push(&format!(
                "Recording {} with email {} and notes {}",
                name, details.email, notes
            ))
            .await;

        Ok(recorded())
    }

    async fn record_unknown_question(&self, args: &Value) -> Result<Value> {
        let UnknownQuestion { question } = UnknownQuestion::deserialize(args)
            .with_context(|| format!("invalid arguments for {}", RECORD_UNKNOWN_QUESTION))?;

        self.notifier.push(&format!("Recording {}", question)).await;

        Ok(recorded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::testing::RecordingSink;
    use crate::notify::{Pushover, PushoverCredentials};
    use crate::tools::Toolbelt;

    fn contact() -> (Contact, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (Contact::new(sink.clone()), sink)
    }

    #[test]
    fn schema_names_match_exported_constants() {
        let (contact, _) = contact();
        let names: Vec<&str> = contact.schemas().iter().map(|s| s.name).collect();
        assert_eq!(names, vec![RECORD_USER_DETAILS, RECORD_UNKNOWN_QUESTION]);
    }

    #[tokio::test]
    async fn user_details_fill_in_defaults() {
        let (contact, sink) = contact();

        let result = contact
            .call(RECORD_USER_DETAILS, &json!({ "email": "a@b.com" }))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result, json!({ "recorded": "ok" }));
        assert_eq!(
            sink.messages(),
            vec!["Recording Name not provided with email a@b.com and notes not provided".to_string()]
        );
    }

    #[tokio::test]
    async fn user_details_treat_null_as_missing() {
        let (contact, sink) = contact();

        contact
            .call(
                RECORD_USER_DETAILS,
                &json!({ "email": "a@b.com", "name": "Ada", "notes": null }),
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            sink.messages(),
            vec!["Recording Ada with email a@b.com and notes not provided".to_string()]
        );
    }

    #[tokio::test]
    async fn acknowledges_even_when_delivery_fails() {
        // Nothing listens on the discard port, so the post is refused.
        let pushover = Pushover::new(Some(PushoverCredentials::new("token", "user")))
            .with_endpoint("http://127.0.0.1:9/1/messages.json");
        let contact = Contact::new(Arc::new(pushover));

        for (tool, args) in [
            (RECORD_UNKNOWN_QUESTION, json!({ "question": "x" })),
            (RECORD_USER_DETAILS, json!({ "email": "a@b.com" })),
        ] {
            let result = contact.call(tool, &args).await.unwrap().unwrap();
            assert_eq!(result, json!({ "recorded": "ok" }));
        }
    }

    #[tokio::test]
    async fn other_names_are_not_dispatched() {
        let (contact, _) = contact();
        assert!(contact.call("record_anything", &json!({})).await.is_none());
    }
}
