//! Base traits and types for realtime transcription providers.
//!
//! This module defines the foundational abstractions for providers that accept
//! a live audio stream and return transcription events over a streaming
//! connection.
//!
//! # Supported Providers
//!
//! - OpenAI Realtime API with `intent=transcription`
//!
//! # Audio Format
//!
//! Providers consume PCM 16-bit signed little-endian at 24kHz unless
//! configured otherwise. Audio bytes are treated as opaque and forwarded
//! without inspection.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during transcription operations.
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Provider-specific error
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for transcription operations.
pub type TranscriptionResult<T> = Result<T, TranscriptionError>;

// =============================================================================
// Configuration Types
// =============================================================================

/// Voice-activity-detection parameters sent in the session configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VadConfig {
    /// Activation threshold (0.0 to 1.0)
    pub threshold: f32,

    /// Amount of audio to include before voice detection (ms)
    pub prefix_padding_ms: u32,

    /// Silence duration before end of turn (ms)
    pub silence_duration_ms: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 500,
        }
    }
}

/// Base configuration for transcription providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// API key for authentication
    pub api_key: String,

    /// Provider name (e.g., "openai")
    #[serde(default)]
    pub provider: String,

    /// Transcription model (e.g., "gpt-4o-transcribe")
    #[serde(default)]
    pub model: String,

    /// Input language as an ISO-639-1 code
    #[serde(default)]
    pub language: String,

    /// Input audio format override
    #[serde(default)]
    pub input_audio_format: Option<String>,

    /// Voice-activity-detection parameters
    #[serde(default)]
    pub vad: VadConfig,

    /// Input noise reduction mode override
    #[serde(default)]
    pub noise_reduction: Option<String>,

    /// Endpoint override. When unset, the provider's production endpoint is
    /// used; tests point this at a local stub server.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            provider: String::new(),
            model: String::new(),
            language: "en".to_string(),
            input_audio_format: None,
            vad: VadConfig::default(),
            noise_reduction: None,
            endpoint: None,
        }
    }
}

// =============================================================================
// Connection State
// =============================================================================

/// Connection state for transcription providers.
///
/// There is no `Reconnecting` state: a dropped provider connection stays
/// dropped for the remainder of the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected to the provider
    #[default]
    Disconnected,
    /// Currently connecting
    Connecting,
    /// Connected and ready
    Connected,
    /// Connection failed
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Failed => write!(f, "Failed"),
        }
    }
}

// =============================================================================
// Callback Types
// =============================================================================

/// A transcription event received from the provider, carried verbatim.
///
/// The relay's contract is pass-through: `raw` is the exact JSON text the
/// provider sent, so downstream clients see the provider's own wire format.
/// `event_type` is the parsed tag, provided for routing and logging.
#[derive(Debug, Clone)]
pub struct TranscriptionUpdate {
    /// The provider's event type tag (e.g.
    /// `conversation.item.input_audio_transcription.delta`)
    pub event_type: String,
    /// The verbatim JSON text as received from the provider
    pub raw: String,
}

/// Callback type for transcription update events.
pub type TranscriptionEventCallback =
    Arc<dyn Fn(TranscriptionUpdate) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback type for error events.
pub type TranscriptionErrorCallback =
    Arc<dyn Fn(TranscriptionError) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

// =============================================================================
// Base Trait
// =============================================================================

/// Base trait for realtime transcription providers.
///
/// A provider owns one outbound streaming connection and the session state
/// negotiated over it. The session id issued by the provider is exposed
/// read-only through [`session_id`](BaseTranscription::session_id) and
/// [`is_session_ready`](BaseTranscription::is_session_ready); callers gate
/// audio forwarding on the latter.
#[async_trait]
pub trait BaseTranscription: Send + Sync {
    /// Create a new provider instance.
    fn new(config: TranscriptionConfig) -> TranscriptionResult<Self>
    where
        Self: Sized;

    /// Connect to the provider and start the session negotiation.
    async fn connect(&mut self) -> TranscriptionResult<()>;

    /// Disconnect from the provider.
    async fn disconnect(&mut self) -> TranscriptionResult<()>;

    /// Check if the provider connection is established.
    fn is_ready(&self) -> bool;

    /// Check if the provider has issued a session id.
    ///
    /// Audio sent before this returns true is dropped, not queued.
    fn is_session_ready(&self) -> bool;

    /// Get the provider-issued session id, if one has been observed.
    async fn session_id(&self) -> Option<String>;

    /// Get the current connection state.
    fn get_connection_state(&self) -> ConnectionState;

    /// Send a chunk of audio to the provider.
    ///
    /// Chunks arriving before the session id is known are silently dropped.
    /// Returns an error only when the connection itself is gone.
    async fn send_audio(&self, audio_data: Bytes) -> TranscriptionResult<()>;

    /// Register a callback for transcription update events.
    fn on_transcription(&mut self, callback: TranscriptionEventCallback)
    -> TranscriptionResult<()>;

    /// Register a callback for error events.
    fn on_error(&mut self, callback: TranscriptionErrorCallback) -> TranscriptionResult<()>;

    /// Get provider information.
    fn get_provider_info(&self) -> serde_json::Value;
}

/// Boxed trait object for transcription providers.
pub type BoxedTranscription = Box<dyn BaseTranscription>;
