use std::io::Cursor;

use anyhow::{Context, Result};
use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};

use super::completion::OpenAiClient;

/// Sample rate assumed for raw PCM uploads (16kHz, what Whisper prefers).
const PCM_SAMPLE_RATE: u32 = 16000;
const PCM_CHANNELS: u16 = 1;
const PCM_BITS_PER_SAMPLE: u16 = 16;

#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String>;
}

/// Hosted Whisper transcription through the OpenAI API.
pub struct WhisperTranscriber {
    api: OpenAiClient,
    model: String,
}

impl WhisperTranscriber {
    pub fn new(api: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            api,
            model: model.into(),
        }
    }
}

#[async_trait]
impl SpeechToText for WhisperTranscriber {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String> {
        self.api.transcribe(&self.model, wav).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    /// Headerless 16-bit little-endian mono samples.
    Pcm16,
}

impl AudioFormat {
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase());

        match mime.as_deref() {
            Some("audio/pcm") | Some("audio/l16") => AudioFormat::Pcm16,
            _ => AudioFormat::Wav,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcript {
    Speech(String),
    /// Nothing was recorded, or nothing intelligible came back.
    NoSpeech,
}

/// Turns an uploaded recording into text. Empty recordings never reach the API.
pub async fn transcribe_audio(
    stt: &dyn SpeechToText,
    audio: &[u8],
    format: AudioFormat,
) -> Result<Transcript> {
    let wav = match format {
        AudioFormat::Wav => audio.to_vec(),
        AudioFormat::Pcm16 if audio.len() < 2 => return Ok(Transcript::NoSpeech),
        AudioFormat::Pcm16 => pcm_to_wav(audio)?,
    };

    if wav.is_empty() {
        return Ok(Transcript::NoSpeech);
    }

    let text = stt.transcribe(wav).await?;
    let text = text.trim();

    if text.is_empty() {
        Ok(Transcript::NoSpeech)
    } else {
        Ok(Transcript::Speech(text.to_string()))
    }
}

/// Wraps raw PCM in a WAV container. A trailing odd byte is dropped.
pub fn pcm_to_wav(pcm: &[u8]) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: PCM_CHANNELS,
        sample_rate: PCM_SAMPLE_RATE,
        bits_per_sample: PCM_BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(pcm.len() + 44));
    {
        let mut writer = WavWriter::new(&mut cursor, spec).context("failed to start wav")?;
        for chunk in pcm.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([chunk[0], chunk[1]]))?;
        }
        writer.finalize().context("failed to finish wav")?;
    }

    Ok(cursor.into_inner())
}
