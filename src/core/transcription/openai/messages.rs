//! OpenAI realtime transcription WebSocket message types.
//!
//! This module defines the client and server event types for the OpenAI
//! Realtime API when connected with `intent=transcription`. All events are
//! JSON-encoded and sent over WebSocket.
//!
//! # Protocol Overview
//!
//! Client events (sent to server):
//! - transcription_session.update - Configure the transcription session
//! - input_audio_buffer.append - Append base64 audio to the input buffer
//!
//! Server events (received from server):
//! - transcription_session.created - Session created, carries the session id
//! - transcription_session.updated - Session configuration acknowledged
//! - input_audio_buffer.speech_started - Speech detection started
//! - input_audio_buffer.speech_stopped - Speech detection stopped
//! - input_audio_buffer.committed - Audio buffer committed to an item
//! - conversation.item.input_audio_transcription.delta - Partial transcript
//! - conversation.item.input_audio_transcription.completed - Final transcript
//! - conversation.item.input_audio_transcription.failed - Transcription error
//! - error - Error occurred

use base64::prelude::*;
use serde::{Deserialize, Serialize};

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration for the transcription session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptionSessionConfig {
    /// Input audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<String>,

    /// Transcription model and language
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<InputAudioTranscription>,

    /// Turn detection configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,

    /// Input noise reduction configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_noise_reduction: Option<NoiseReductionConfig>,
}

/// Input audio transcription configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputAudioTranscription {
    /// Transcription model (e.g., "gpt-4o-transcribe")
    pub model: String,

    /// Input language as an ISO-639-1 code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Optional prompt to bias the transcription
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// Turn detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold
        #[serde(skip_serializing_if = "Option::is_none")]
        threshold: Option<f32>,
        /// Audio prefix padding in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        prefix_padding_ms: Option<u32>,
        /// Silence duration in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        silence_duration_ms: Option<u32>,
    },
    /// No turn detection
    #[serde(rename = "none")]
    None {},
}

/// Input noise reduction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseReductionConfig {
    /// Reduction mode ("near_field" or "far_field")
    #[serde(rename = "type")]
    pub kind: String,
}

// =============================================================================
// Client Events (sent to server)
// =============================================================================

/// Client events sent to the OpenAI realtime transcription endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update the transcription session configuration
    #[serde(rename = "transcription_session.update")]
    TranscriptionSessionUpdate {
        /// Session configuration
        session: TranscriptionSessionConfig,
    },

    /// Append audio to the input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded audio data
        audio: String,
    },
}

impl ClientEvent {
    /// Create an audio append event from raw bytes.
    pub fn audio_append(data: &[u8]) -> Self {
        ClientEvent::InputAudioBufferAppend {
            audio: BASE64_STANDARD.encode(data),
        }
    }
}

// =============================================================================
// Server Events (received from server)
// =============================================================================

/// Server events received from the OpenAI realtime transcription endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Error occurred
    #[serde(rename = "error")]
    Error {
        /// Error details
        error: ApiError,
    },

    /// Transcription session created
    #[serde(rename = "transcription_session.created")]
    TranscriptionSessionCreated {
        /// Session information
        session: TranscriptionSession,
    },

    /// Transcription session configuration acknowledged
    #[serde(rename = "transcription_session.updated")]
    TranscriptionSessionUpdated {
        /// Session information
        session: TranscriptionSession,
    },

    /// Speech started (VAD detected speech)
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {
        /// Audio start timestamp in ms
        audio_start_ms: u64,
        /// Item ID
        item_id: String,
    },

    /// Speech stopped (VAD detected silence)
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped {
        /// Audio end timestamp in ms
        audio_end_ms: u64,
        /// Item ID
        item_id: String,
    },

    /// Audio buffer committed
    #[serde(rename = "input_audio_buffer.committed")]
    InputAudioBufferCommitted {
        /// Previous item ID
        previous_item_id: Option<String>,
        /// New item ID
        item_id: String,
    },

    /// Audio buffer cleared
    #[serde(rename = "input_audio_buffer.cleared")]
    InputAudioBufferCleared,

    /// Partial input audio transcript
    #[serde(rename = "conversation.item.input_audio_transcription.delta")]
    TranscriptionDelta {
        /// Item ID
        item_id: String,
        /// Content index
        #[serde(default)]
        content_index: u32,
        /// Transcript delta
        delta: String,
    },

    /// Input audio transcription completed
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    TranscriptionCompleted {
        /// Item ID
        item_id: String,
        /// Content index
        #[serde(default)]
        content_index: u32,
        /// Transcript text
        transcript: String,
    },

    /// Input audio transcription failed
    #[serde(rename = "conversation.item.input_audio_transcription.failed")]
    TranscriptionFailed {
        /// Item ID
        item_id: String,
        /// Content index
        #[serde(default)]
        content_index: u32,
        /// Error details
        error: ApiError,
    },

    /// Any event type this client does not act on
    #[serde(other)]
    Unhandled,
}

impl ServerEvent {
    /// The wire name of this event's type tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            ServerEvent::Error { .. } => "error",
            ServerEvent::TranscriptionSessionCreated { .. } => "transcription_session.created",
            ServerEvent::TranscriptionSessionUpdated { .. } => "transcription_session.updated",
            ServerEvent::SpeechStarted { .. } => "input_audio_buffer.speech_started",
            ServerEvent::SpeechStopped { .. } => "input_audio_buffer.speech_stopped",
            ServerEvent::InputAudioBufferCommitted { .. } => "input_audio_buffer.committed",
            ServerEvent::InputAudioBufferCleared => "input_audio_buffer.cleared",
            ServerEvent::TranscriptionDelta { .. } => {
                "conversation.item.input_audio_transcription.delta"
            }
            ServerEvent::TranscriptionCompleted { .. } => {
                "conversation.item.input_audio_transcription.completed"
            }
            ServerEvent::TranscriptionFailed { .. } => {
                "conversation.item.input_audio_transcription.failed"
            }
            ServerEvent::Unhandled => "unhandled",
        }
    }

    /// Whether this event is a transcription update to relay downstream.
    ///
    /// Matches the `conversation.item.input_audio_transcription.*` family.
    pub fn is_transcription_update(&self) -> bool {
        matches!(
            self,
            ServerEvent::TranscriptionDelta { .. }
                | ServerEvent::TranscriptionCompleted { .. }
                | ServerEvent::TranscriptionFailed { .. }
        )
    }
}

// =============================================================================
// Supporting Types
// =============================================================================

/// API error information.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Error message
    pub message: String,
    /// Parameter that caused the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    /// Event ID that caused the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

/// Transcription session information.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionSession {
    /// Session ID
    pub id: String,
    /// Object type
    #[serde(default)]
    pub object: String,
    /// Expiry timestamp
    #[serde(default)]
    pub expires_at: Option<u64>,
    /// Input audio format
    #[serde(default)]
    pub input_audio_format: Option<String>,
    /// Input audio transcription config
    #[serde(default)]
    pub input_audio_transcription: Option<InputAudioTranscription>,
    /// Turn detection config
    #[serde(default)]
    pub turn_detection: Option<TurnDetection>,
    /// Response modalities
    #[serde(default)]
    pub modalities: Vec<String>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_append() {
        let data = vec![0u8, 1, 2, 3];
        let event = ClientEvent::audio_append(&data);
        match event {
            ClientEvent::InputAudioBufferAppend { audio } => {
                let decoded = BASE64_STANDARD.decode(&audio).unwrap();
                assert_eq!(decoded, data);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_audio_append_serialization() {
        let event = ClientEvent::audio_append(&[0xAA, 0xBB]);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("input_audio_buffer.append"));
        assert!(json.contains(&BASE64_STANDARD.encode([0xAAu8, 0xBB])));
    }

    #[test]
    fn test_session_update_serialization() {
        let event = ClientEvent::TranscriptionSessionUpdate {
            session: TranscriptionSessionConfig {
                input_audio_format: Some("pcm16".to_string()),
                input_audio_transcription: Some(InputAudioTranscription {
                    model: "gpt-4o-transcribe".to_string(),
                    language: Some("en".to_string()),
                    prompt: None,
                }),
                turn_detection: Some(TurnDetection::ServerVad {
                    threshold: Some(0.5),
                    prefix_padding_ms: Some(300),
                    silence_duration_ms: Some(500),
                }),
                input_audio_noise_reduction: None,
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("transcription_session.update"));
        assert!(json.contains("gpt-4o-transcribe"));
        assert!(json.contains("server_vad"));
        assert!(!json.contains("prompt"));
        assert!(!json.contains("input_audio_noise_reduction"));
    }

    #[test]
    fn test_session_created_deserialization() {
        let json = r#"{
            "type": "transcription_session.created",
            "session": {
                "id": "sess_abc123",
                "object": "realtime.transcription_session",
                "expires_at": 1700000000
            }
        }"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        match event {
            ServerEvent::TranscriptionSessionCreated { session } => {
                assert_eq!(session.id, "sess_abc123");
                assert_eq!(session.object, "realtime.transcription_session");
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_transcription_delta_deserialization() {
        let json = r#"{
            "type": "conversation.item.input_audio_transcription.delta",
            "item_id": "item_1",
            "content_index": 0,
            "delta": "hello"
        }"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        assert!(event.is_transcription_update());
        assert_eq!(
            event.event_type(),
            "conversation.item.input_audio_transcription.delta"
        );
    }

    #[test]
    fn test_transcription_completed_deserialization() {
        let json = r#"{
            "type": "conversation.item.input_audio_transcription.completed",
            "item_id": "item_1",
            "content_index": 0,
            "transcript": "hello world"
        }"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        match &event {
            ServerEvent::TranscriptionCompleted { transcript, .. } => {
                assert_eq!(transcript, "hello world");
            }
            _ => panic!("Wrong event type"),
        }
        assert!(event.is_transcription_update());
    }

    #[test]
    fn test_error_deserialization() {
        let json = r#"{
            "type": "error",
            "error": {
                "type": "invalid_request_error",
                "message": "Test error"
            }
        }"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        match event {
            ServerEvent::Error { error } => {
                assert_eq!(error.message, "Test error");
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_unknown_event_is_unhandled() {
        let json = r#"{"type": "conversation.item.created", "item": {"id": "item_1"}}"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, ServerEvent::Unhandled));
        assert!(!event.is_transcription_update());
    }

    #[test]
    fn test_control_events_are_not_relayed() {
        let created = r#"{"type": "transcription_session.created", "session": {"id": "s"}}"#;
        let event: ServerEvent = serde_json::from_str(created).unwrap();
        assert!(!event.is_transcription_update());

        let speech = r#"{
            "type": "input_audio_buffer.speech_started",
            "audio_start_ms": 120,
            "item_id": "item_1"
        }"#;
        let event: ServerEvent = serde_json::from_str(speech).unwrap();
        assert!(!event.is_transcription_update());
    }
}
