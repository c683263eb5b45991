pub mod events;
pub mod macros;
pub mod messages;
pub mod notify;
pub mod schemas;
pub mod session;
pub mod tools;

pub use messages::{FunctionCall, Role, ToolCall, Turn};
pub use notify::{NotificationSink, Pushover, PushoverCredentials};
pub use schemas::{ParameterSchema, Tool, ToolSchema};
pub use session::Session;
pub use tools::{ToolOutcome, ToolRegistry, Toolbelt};

#[doc(hidden)]
pub mod __private {
    pub use async_trait::async_trait;
    pub use once_cell::sync::Lazy;
}
