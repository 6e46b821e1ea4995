//! OpenAI realtime transcription module.
//!
//! This module provides streaming speech-to-text using OpenAI's Realtime API
//! with `intent=transcription`.
//!
//! # Features
//!
//! - Streaming input audio over one WebSocket connection
//! - Session-lifecycle handling: audio is gated on the provider-issued
//!   session id, and exactly one session configuration message is sent after
//!   `transcription_session.created`
//! - Verbatim relay of `conversation.item.input_audio_transcription.*`
//!   events through a registered callback
//!
//! # Supported Models
//!
//! - `gpt-4o-transcribe` (default)
//! - `gpt-4o-mini-transcribe` - lower latency
//! - `whisper-1`
//!
//! # Audio Format
//!
//! Input audio is PCM 16-bit signed little-endian at 24kHz by default.
//! G.711 u-law and a-law are also supported at 8kHz.
//!
//! # Example
//!
//! ```rust,ignore
//! use scribe_relay::core::transcription::{BaseTranscription, TranscriptionConfig};
//! use scribe_relay::core::transcription::openai::OpenAITranscription;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = TranscriptionConfig {
//!         api_key: "sk-...".to_string(),
//!         model: "gpt-4o-transcribe".to_string(),
//!         ..Default::default()
//!     };
//!
//!     let mut client = OpenAITranscription::new(config).unwrap();
//!
//!     client.on_transcription(Arc::new(|update| Box::pin(async move {
//!         println!("[{}] {}", update.event_type, update.raw);
//!     }))).unwrap();
//!
//!     client.connect().await.unwrap();
//!
//!     // Audio sent before the session id arrives is dropped
//!     client.send_audio(audio_bytes).await.unwrap();
//! }
//! ```

mod client;
mod config;
mod messages;

pub use client::OpenAITranscription;
pub use config::{
    AudioFormat, NoiseReduction, OPENAI_REALTIME_URL, OPENAI_TRANSCRIPTION_INTENT,
    OPENAI_TRANSCRIPTION_SAMPLE_RATE, TranscriptionModel,
};
pub use messages::{
    ApiError, ClientEvent, InputAudioTranscription, NoiseReductionConfig, ServerEvent,
    TranscriptionSession, TranscriptionSessionConfig, TurnDetection,
};
