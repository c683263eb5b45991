use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::notify::NotificationSink;
use crate::schemas::{Tool, ToolSchema};

pub mod toolbelts;

/// A group of tools the model may invoke. Implemented through `register_toolbelt!`.
#[async_trait]
pub trait Toolbelt: Send + Sync {
    fn name(&self) -> &'static str;

    fn schemas(&self) -> &'static [ToolSchema];

    /// `None` when this toolbelt has no tool called `tool`.
    async fn call(&self, tool: &str, args: &Value) -> Option<Result<Value>>;
}

/// Result of asking the registry to run a tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Completed(Value),
    Failed(String),
    NotFound,
}

impl ToolOutcome {
    /// Payload sent back to the model as the tool-result turn.
    pub fn payload(&self) -> Value {
        match self {
            ToolOutcome::Completed(value) => value.clone(),
            ToolOutcome::Failed(message) => json!({ "error": message }),
            ToolOutcome::NotFound => json!({}),
        }
    }
}

/// Fixed mapping from tool name to the toolbelt that owns it, built once at startup.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<&'static str, Arc<dyn Toolbelt>>,
    schemas: Vec<ToolSchema>,
    unknown_calls: AtomicU64,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the visitor contact tools.
    pub fn with_defaults(notifier: Arc<dyn NotificationSink>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(toolbelts::contact::Contact::new(notifier)));
        registry
    }

    pub fn register(&mut self, toolbelt: Arc<dyn Toolbelt>) {
        for schema in toolbelt.schemas() {
            if self.tools.contains_key(schema.name) {
                tracing::warn!(tool = schema.name, toolbelt = toolbelt.name(), "duplicate tool name ignored");
                continue;
            }
            self.tools.insert(schema.name, toolbelt.clone());
            self.schemas.push(schema.clone());
        }
    }

    /// Wire definitions passed on every completion request, in registration order.
    pub fn tools(&self) -> Vec<Tool> {
        self.schemas.iter().map(|s| s.to_tool()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub async fn invoke(&self, name: &str, args: &Value) -> ToolOutcome {
        let Some(toolbelt) = self.tools.get(name) else {
            self.unknown_calls.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(tool = name, "model requested an unknown tool");
            return ToolOutcome::NotFound;
        };

        match toolbelt.call(name, args).await {
            Some(Ok(value)) => ToolOutcome::Completed(value),
            Some(Err(e)) => {
                tracing::warn!(tool = name, error = %e, "tool failed");
                ToolOutcome::Failed(format!("{:#}", e))
            }
            None => {
                self.unknown_calls.fetch_add(1, Ordering::Relaxed);
                ToolOutcome::NotFound
            }
        }
    }

    /// Number of calls to tool names that are not registered.
    pub fn unknown_calls(&self) -> u64 {
        self.unknown_calls.load(Ordering::Relaxed)
    }
}
