pub mod transcription;

// Re-export commonly used types for convenience
pub use transcription::{
    BaseTranscription, BoxedTranscription, ConnectionState, OpenAITranscription,
    TranscriptionConfig, TranscriptionError, TranscriptionResult, TranscriptionUpdate, VadConfig,
    create_transcription_provider, get_supported_transcription_providers,
};
