use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use persona_shared::PushoverCredentials;

use crate::task::DEFAULT_MAX_TOOL_ROUNDS;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";
const DEFAULT_PERSONA_NAME: &str = "Ashish Kamat";
const DEFAULT_PERSONA_DIR: &str = "me";
const DEFAULT_BIND: &str = "0.0.0.0:8080";

/// Server settings, read from the environment once `.env` has been loaded.
#[derive(Clone)]
pub struct EngineConfig {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub model: String,
    pub transcription_model: String,
    pub persona_name: String,
    pub persona_dir: PathBuf,
    pub pushover: Option<PushoverCredentials>,
    pub bind_addr: String,
    pub max_tool_rounds: u32,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let openai_api_key = get("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;

        let pushover = match (get("PUSHOVER_TOKEN"), get("PUSHOVER_USER")) {
            (Some(token), Some(user)) => Some(PushoverCredentials::new(token, user)),
            _ => None,
        };

        let max_tool_rounds = match get("MAX_TOOL_ROUNDS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("MAX_TOOL_ROUNDS must be a whole number, got '{}'", raw))?,
            None => DEFAULT_MAX_TOOL_ROUNDS,
        };

        Ok(Self {
            openai_api_key,
            openai_base_url: or("OPENAI_BASE_URL", DEFAULT_BASE_URL),
            model: or("PERSONA_MODEL", DEFAULT_MODEL),
            transcription_model: or("TRANSCRIPTION_MODEL", DEFAULT_TRANSCRIPTION_MODEL),
            persona_name: or("PERSONA_NAME", DEFAULT_PERSONA_NAME),
            persona_dir: PathBuf::from(or("PERSONA_DIR", DEFAULT_PERSONA_DIR)),
            pushover,
            bind_addr: or("PERSONA_BIND", DEFAULT_BIND),
            max_tool_rounds,
        })
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("openai_api_key", &"<redacted>")
            .field("openai_base_url", &self.openai_base_url)
            .field("model", &self.model)
            .field("transcription_model", &self.transcription_model)
            .field("persona_name", &self.persona_name)
            .field("persona_dir", &self.persona_dir)
            .field("pushover", &self.pushover.is_some())
            .field("bind_addr", &self.bind_addr)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .finish()
    }
}
