use persona_shared::events::ChatEvent;
use persona_shared::Session;
use crate::client::{ApiClient, Transcription};
use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::Path;

pub async fn single_message(client: ApiClient, message: String) -> Result<()> {
    match client.chat(&message, &[]).await {
        Ok(response) => {
            println!("{}", response.reply);
            if response.exhausted {
                println!("(stopped after too many tool calls)");
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
        }
    }
    Ok(())
}

pub async fn interactive_chat(client: ApiClient) -> Result<()> {
    println!("Envoy chat started. Type 'quit' to exit.\n");

    let mut session = Session::new();

    loop {
        print!("You: ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.eq_ignore_ascii_case("quit") {
            println!("Goodbye!");
            break;
        }

        if input.is_empty() {
            continue;
        }

        println!(); // Blank line before response

        match send_turn(&client, &mut session, input).await {
            Ok(()) => println!(),
            Err(e) => eprintln!("Error: {:#}\n", e),
        }
    }

    Ok(())
}

/// Transcribes a recording and, if anything was said, sends it as a turn.
pub async fn voice_message(client: ApiClient, path: &Path) -> Result<()> {
    let audio = std::fs::read(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    match client.transcribe(audio, content_type_for(path)).await? {
        Transcription::Text(text) => {
            println!("You said: {}\n", text);
            let mut session = Session::new();
            if let Err(e) = send_turn(&client, &mut session, &text).await {
                eprintln!("Error: {:#}", e);
            }
        }
        Transcription::NoSpeech(warning) => {
            eprintln!("⚠ {}", warning);
        }
    }

    Ok(())
}

/// Sends one turn and appends it to the session only once a reply arrives.
async fn send_turn(client: &ApiClient, session: &mut Session, message: &str) -> Result<()> {
    let reply = client
        .chat_stream(message, session.history(), handle_event)
        .await?;

    if let Some(reply) = reply {
        session.record_exchange(message, &reply);
    }
    Ok(())
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pcm") || ext.eq_ignore_ascii_case("raw") => {
            "audio/pcm"
        }
        _ => "audio/wav",
    }
}

fn handle_event(event: &ChatEvent) {
    match event {
        ChatEvent::ToolCall { tool, .. } => {
            println!("🔧 Calling: {}", tool);
        }
        ChatEvent::ToolResult { result, truncated, .. } => {
            if *truncated {
                println!("   ✓ {} [truncated]", result.lines().next().unwrap_or(""));
            } else {
                println!("   ✓ {}", result);
            }
        }
        ChatEvent::UnknownTool { tool, .. } => {
            println!("   ? No such tool: {}", tool);
        }
        ChatEvent::Done { reply, exhausted, .. } => {
            println!("{}", reply);
            if *exhausted {
                println!("(stopped after too many tool calls)");
            }
        }
        ChatEvent::Error { message } => {
            eprintln!("\n❌ Error: {}", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_recordings_are_sent_as_pcm() {
        assert_eq!(content_type_for(Path::new("clip.pcm")), "audio/pcm");
        assert_eq!(content_type_for(Path::new("clip.RAW")), "audio/pcm");
        assert_eq!(content_type_for(Path::new("clip.wav")), "audio/wav");
        assert_eq!(content_type_for(Path::new("clip")), "audio/wav");
    }
}
