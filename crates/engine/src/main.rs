use std::sync::Arc;
use anyhow::Result;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use persona_engine::api::{self, AppState};
use persona_engine::config::EngineConfig;
use persona_engine::persona::PersonaDocument;
use persona_engine::task::completion::OpenAiClient;
use persona_engine::task::transcription::WhisperTranscriber;
use persona_engine::task::ConversationEngine;
use persona_shared::{Pushover, ToolRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig::from_env()?;
    tracing::info!(model = %config.model, persona = %config.persona_name, "Starting Persona");

    // Persona documents are read once; the prompt never changes while running
    let persona = PersonaDocument::load(&config.persona_dir);
    let system_prompt = persona.system_prompt(&config.persona_name);

    let notifier = Pushover::new(config.pushover.clone());
    if !notifier.is_enabled() {
        tracing::info!("Pushover credentials not set, notifications are disabled");
    }
    let tools = Arc::new(ToolRegistry::with_defaults(Arc::new(notifier)));

    let api_client = OpenAiClient::new(&config.openai_base_url, &config.openai_api_key);
    let engine = ConversationEngine::new(
        Arc::new(api_client.clone()),
        tools,
        &config.model,
        system_prompt,
    )
    .with_max_tool_rounds(config.max_tool_rounds);
    let transcriber = Arc::new(WhisperTranscriber::new(api_client, &config.transcription_model));

    let state = Arc::new(AppState::new(engine, transcriber));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start API server
    let bind_addr = config.bind_addr.clone();
    let mut api_handle = tokio::spawn(async move {
        api::start_server(state, &bind_addr, shutdown_rx).await
    });

    tokio::select! {
        result = &mut api_handle => {
            // Server stopped on its own, most likely a bind failure
            return result?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Received shutdown signal...");
        }
    }

    let _ = shutdown_tx.send(true);
    api_handle.await??;

    tracing::info!("Persona shutdown complete.");
    Ok(())
}
