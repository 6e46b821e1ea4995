//! Realtime transcription provider module.
//!
//! This module provides abstractions and the implementation for streaming
//! speech-to-text over a provider's realtime endpoint.
//!
//! # Architecture
//!
//! - `BaseTranscription` trait for provider abstraction
//! - Factory function for provider creation by name
//! - Callback-based event handling; transcription events are carried
//!   verbatim so downstream clients see the provider's own wire format
//!
//! # Supported Providers
//!
//! - **OpenAI Realtime API** (`intent=transcription`)

mod base;
pub mod openai;

pub use base::{
    BaseTranscription, BoxedTranscription, ConnectionState, TranscriptionConfig,
    TranscriptionError, TranscriptionErrorCallback, TranscriptionEventCallback,
    TranscriptionResult, TranscriptionUpdate, VadConfig,
};
pub use openai::{
    AudioFormat, NoiseReduction, OPENAI_REALTIME_URL, OPENAI_TRANSCRIPTION_SAMPLE_RATE,
    OpenAITranscription, TranscriptionModel,
};

/// Factory function to create a transcription provider.
///
/// # Supported Providers
///
/// - `"openai"` - OpenAI Realtime API with `intent=transcription`
pub fn create_transcription_provider(
    provider_type: &str,
    config: TranscriptionConfig,
) -> TranscriptionResult<BoxedTranscription> {
    match provider_type.to_lowercase().as_str() {
        "openai" => Ok(Box::new(OpenAITranscription::new(config)?)),
        other => Err(TranscriptionError::InvalidConfiguration(format!(
            "Unsupported provider: {}. Supported: {:?}",
            other,
            get_supported_transcription_providers()
        ))),
    }
}

/// Get list of supported transcription providers.
pub fn get_supported_transcription_providers() -> Vec<&'static str> {
    vec!["openai"]
}
