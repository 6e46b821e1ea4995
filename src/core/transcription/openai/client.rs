//! OpenAI realtime transcription client implementation.
//!
//! This module provides the client that implements the `BaseTranscription`
//! trait against OpenAI's WebSocket Realtime API in transcription intent.
//!
//! # API Reference
//!
//! - Endpoint: `wss://api.openai.com/v1/realtime?intent=transcription`
//! - Protocol: WebSocket with JSON events
//! - Audio: PCM 16-bit, 24kHz, mono, little-endian, base64 encoded
//!
//! # Session Lifecycle
//!
//! After the WebSocket handshake the provider sends
//! `transcription_session.created` carrying the session id. The client stores
//! the id, sends exactly one `transcription_session.update` with the
//! configured audio format, model, language and VAD parameters, and only then
//! starts accepting audio. Chunks submitted before the id is observed are
//! dropped, not queued.
//!
//! There is no reconnection: when the provider connection ends, transcription
//! stops for the remainder of the process lifetime.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use super::config::{
    AudioFormat, NoiseReduction, OPENAI_REALTIME_URL, OPENAI_TRANSCRIPTION_INTENT,
    OPENAI_TRANSCRIPTION_SAMPLE_RATE, TranscriptionModel,
};
use super::messages::{
    ClientEvent, InputAudioTranscription, NoiseReductionConfig, ServerEvent, TurnDetection,
    TranscriptionSessionConfig,
};
use crate::core::transcription::base::{
    BaseTranscription, ConnectionState, TranscriptionConfig, TranscriptionError,
    TranscriptionErrorCallback, TranscriptionEventCallback, TranscriptionResult,
    TranscriptionUpdate,
};

/// Channel capacity for WebSocket message sending.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Outgoing half of the provider WebSocket.
type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

// =============================================================================
// OpenAI Transcription Client
// =============================================================================

/// OpenAI realtime transcription client.
///
/// This client owns one outbound streaming connection to the provider and the
/// session state negotiated over it. All mutable state is behind `Arc`
/// wrappers so it can be shared with the spawned connection task; the
/// `connected` and `session_ready` flags use atomics for lock-free checks on
/// the audio path.
pub struct OpenAITranscription {
    /// Configuration
    config: TranscriptionConfig,
    /// Parsed transcription model
    model: TranscriptionModel,
    /// Parsed input audio format
    audio_format: AudioFormat,
    /// Parsed noise reduction mode
    noise_reduction: Option<NoiseReduction>,
    /// Connection state
    state: Arc<RwLock<ConnectionState>>,
    /// Connected flag (shared with the connection task)
    connected: Arc<AtomicBool>,
    /// Set once the provider has issued a session id. This is the readiness
    /// gate for the audio path: a single state transition, observed with an
    /// atomic load instead of a timed re-check.
    session_ready: Arc<AtomicBool>,
    /// Provider-issued session id
    session_id: Arc<RwLock<Option<String>>>,
    /// Audio chunks dropped because no session id was known yet
    dropped_chunks: Arc<AtomicU64>,

    /// WebSocket sender channel
    ws_sender: Arc<Mutex<Option<mpsc::Sender<ClientEvent>>>>,

    /// Callbacks
    transcription_callback: Arc<Mutex<Option<TranscriptionEventCallback>>>,
    error_callback: Arc<Mutex<Option<TranscriptionErrorCallback>>>,

    /// Connection task handle
    connection_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl OpenAITranscription {
    /// Get the configured transcription model.
    pub fn model(&self) -> TranscriptionModel {
        self.model
    }

    /// Get the configured input audio format.
    pub fn audio_format(&self) -> AudioFormat {
        self.audio_format
    }

    /// Number of audio chunks dropped before the session id was known.
    pub fn dropped_before_ready(&self) -> u64 {
        self.dropped_chunks.load(Ordering::Relaxed)
    }

    /// Build the WebSocket URL with the transcription intent parameter.
    fn build_ws_url(&self) -> String {
        let base = self
            .config
            .endpoint
            .as_deref()
            .unwrap_or(OPENAI_REALTIME_URL);
        format!("{}?{}", base, OPENAI_TRANSCRIPTION_INTENT)
    }

    /// Build the session configuration sent after `transcription_session.created`.
    fn build_session_config(&self) -> TranscriptionSessionConfig {
        TranscriptionSessionConfig {
            input_audio_format: Some(self.audio_format.as_str().to_string()),
            input_audio_transcription: Some(InputAudioTranscription {
                model: self.model.as_str().to_string(),
                language: if self.config.language.is_empty() {
                    None
                } else {
                    Some(self.config.language.clone())
                },
                prompt: None,
            }),
            turn_detection: Some(TurnDetection::ServerVad {
                threshold: Some(self.config.vad.threshold),
                prefix_padding_ms: Some(self.config.vad.prefix_padding_ms),
                silence_duration_ms: Some(self.config.vad.silence_duration_ms),
            }),
            input_audio_noise_reduction: self
                .noise_reduction
                .map(|nr| NoiseReductionConfig {
                    kind: nr.as_str().to_string(),
                }),
        }
    }

    /// Handle a server event inside the connection task.
    ///
    /// `raw` is the verbatim JSON text the event was parsed from; transcription
    /// updates are relayed with that exact text.
    #[allow(clippy::too_many_arguments)]
    async fn handle_server_event(
        event: ServerEvent,
        raw: &str,
        session_configured: &mut bool,
        ws_sink: &mut WsSink,
        session_config: &TranscriptionSessionConfig,
        transcription_cb: &Arc<Mutex<Option<TranscriptionEventCallback>>>,
        error_cb: &Arc<Mutex<Option<TranscriptionErrorCallback>>>,
        session_id: &Arc<RwLock<Option<String>>>,
        session_ready: &Arc<AtomicBool>,
    ) {
        match event {
            ServerEvent::TranscriptionSessionCreated { session } => {
                tracing::info!("Transcription session created: {}", session.id);
                *session_id.write().await = Some(session.id);

                // Exactly one session configuration per connector lifetime,
                // sent before the readiness flag flips so the first accepted
                // audio chunk can never overtake it.
                if !*session_configured {
                    let event = ClientEvent::TranscriptionSessionUpdate {
                        session: session_config.clone(),
                    };
                    match serde_json::to_string(&event) {
                        Ok(json) => {
                            if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                                tracing::error!("Failed to send session configuration: {}", e);
                            } else {
                                *session_configured = true;
                                tracing::debug!("Session configuration sent");
                            }
                        }
                        Err(e) => {
                            tracing::error!("Failed to serialize session configuration: {}", e);
                        }
                    }
                }

                session_ready.store(true, Ordering::Release);
            }

            ServerEvent::TranscriptionSessionUpdated { session } => {
                tracing::debug!("Transcription session updated: {}", session.id);
            }

            ServerEvent::Error { error } => {
                tracing::error!(
                    "OpenAI transcription error: {} - {}",
                    error.error_type,
                    error.message
                );
                if let Some(cb) = error_cb.lock().await.as_ref() {
                    let err = TranscriptionError::ProviderError(format!(
                        "{}: {}",
                        error.error_type, error.message
                    ));
                    cb(err).await;
                }
            }

            ServerEvent::SpeechStarted { audio_start_ms, .. } => {
                tracing::debug!("Speech started at {}ms", audio_start_ms);
            }

            ServerEvent::SpeechStopped { audio_end_ms, .. } => {
                tracing::debug!("Speech stopped at {}ms", audio_end_ms);
            }

            event if event.is_transcription_update() => {
                if let ServerEvent::TranscriptionFailed { error, .. } = &event {
                    tracing::warn!(
                        "Input audio transcription failed: {} - {}",
                        error.error_type,
                        error.message
                    );
                }
                if let Some(cb) = transcription_cb.lock().await.as_ref() {
                    cb(TranscriptionUpdate {
                        event_type: event.event_type().to_string(),
                        raw: raw.to_string(),
                    })
                    .await;
                }
            }

            _ => {
                tracing::trace!("Unhandled server event");
            }
        }
    }

    /// Send an event to the WebSocket.
    async fn send_event(&self, event: ClientEvent) -> TranscriptionResult<()> {
        if let Some(sender) = self.ws_sender.lock().await.as_ref() {
            sender
                .send(event)
                .await
                .map_err(|e| TranscriptionError::WebSocketError(e.to_string()))?;
            Ok(())
        } else {
            Err(TranscriptionError::NotConnected)
        }
    }
}

#[async_trait]
impl BaseTranscription for OpenAITranscription {
    fn new(config: TranscriptionConfig) -> TranscriptionResult<Self> {
        // Validate API key
        if config.api_key.is_empty() {
            return Err(TranscriptionError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        // Parse model
        let model = if config.model.is_empty() {
            TranscriptionModel::default()
        } else {
            TranscriptionModel::from_str_or_default(&config.model)
        };

        // Parse audio format
        let audio_format = if let Some(ref f) = config.input_audio_format {
            AudioFormat::from_str_or_default(f)
        } else {
            AudioFormat::default()
        };

        // Parse noise reduction mode
        let noise_reduction = config
            .noise_reduction
            .as_deref()
            .map(NoiseReduction::from_str_or_default);

        Ok(Self {
            config,
            model,
            audio_format,
            noise_reduction,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            connected: Arc::new(AtomicBool::new(false)),
            session_ready: Arc::new(AtomicBool::new(false)),
            session_id: Arc::new(RwLock::new(None)),
            dropped_chunks: Arc::new(AtomicU64::new(0)),
            ws_sender: Arc::new(Mutex::new(None)),
            transcription_callback: Arc::new(Mutex::new(None)),
            error_callback: Arc::new(Mutex::new(None)),
            connection_handle: Arc::new(Mutex::new(None)),
        })
    }

    async fn connect(&mut self) -> TranscriptionResult<()> {
        // Check if already connected
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }

        // Update state
        *self.state.write().await = ConnectionState::Connecting;

        // Build WebSocket URL
        let url = self.build_ws_url();

        // Derive the Host header from the endpoint so overrides work
        let parsed = Url::parse(&url)
            .map_err(|e| TranscriptionError::InvalidConfiguration(format!("Invalid endpoint: {e}")))?;
        let host = match (parsed.host_str(), parsed.port()) {
            (Some(h), Some(p)) => format!("{h}:{p}"),
            (Some(h), None) => h.to_string(),
            _ => {
                return Err(TranscriptionError::InvalidConfiguration(
                    "Endpoint URL has no host".to_string(),
                ));
            }
        };

        // Build request with headers
        let request = http::Request::builder()
            .uri(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("OpenAI-Beta", "realtime=v1")
            .header(
                "Sec-WebSocket-Key",
                tungstenite::handshake::client::generate_key(),
            )
            .header("Sec-WebSocket-Version", "13")
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Host", host)
            .body(())
            .map_err(|e| TranscriptionError::ConnectionFailed(e.to_string()))?;

        // Connect WebSocket
        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| TranscriptionError::ConnectionFailed(e.to_string()))?;

        tracing::info!("Connected to OpenAI realtime transcription endpoint");

        // Split the WebSocket
        let (mut ws_sink, mut ws_stream) = ws_stream.split();

        // Create channel for sending messages
        let (tx, mut rx) = mpsc::channel::<ClientEvent>(WS_CHANNEL_CAPACITY);
        *self.ws_sender.lock().await = Some(tx);

        // Clone references for the connection task
        let transcription_cb = self.transcription_callback.clone();
        let error_cb = self.error_callback.clone();
        let session_id = self.session_id.clone();
        let session_ready = self.session_ready.clone();
        let state = self.state.clone();
        let ws_sender = self.ws_sender.clone();
        let connected = self.connected.clone();
        let session_config = self.build_session_config();

        // Mark as connected before spawning task
        self.connected.store(true, Ordering::SeqCst);
        *self.state.write().await = ConnectionState::Connected;

        // Spawn the connection task. There is no reconnection loop: when this
        // loop ends, transcription stops for the rest of the process lifetime.
        let handle = tokio::spawn(async move {
            let mut session_configured = false;

            loop {
                tokio::select! {
                    // Handle outgoing messages
                    Some(event) = rx.recv() => {
                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(e) => {
                                tracing::error!("Failed to serialize event: {}", e);
                                continue;
                            }
                        };

                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            tracing::error!("Failed to send WebSocket message: {}", e);
                            break;
                        }
                    }

                    // Handle incoming messages
                    Some(msg) = ws_stream.next() => {
                        match msg {
                            Ok(Message::Text(text)) => {
                                match serde_json::from_str::<ServerEvent>(&text) {
                                    Ok(event) => {
                                        Self::handle_server_event(
                                            event,
                                            &text,
                                            &mut session_configured,
                                            &mut ws_sink,
                                            &session_config,
                                            &transcription_cb,
                                            &error_cb,
                                            &session_id,
                                            &session_ready,
                                        ).await;
                                    }
                                    Err(e) => {
                                        tracing::warn!("Failed to parse server event: {} - {}", e, text);
                                    }
                                }
                            }
                            Ok(Message::Close(_)) => {
                                tracing::info!("WebSocket closed by server");
                                break;
                            }
                            Ok(Message::Ping(data)) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    tracing::error!("Failed to send pong: {}", e);
                                }
                            }
                            Err(e) => {
                                tracing::error!("WebSocket error: {}", e);
                                break;
                            }
                            _ => {}
                        }
                    }

                    else => break,
                }
            }

            // Connection ended. Audio submitted from here on is dropped by
            // the readiness gate; transcription silently stops.
            connected.store(false, Ordering::SeqCst);
            session_ready.store(false, Ordering::SeqCst);
            *state.write().await = ConnectionState::Disconnected;
            *ws_sender.lock().await = None;
            tracing::info!("OpenAI transcription connection task ended");
        });

        *self.connection_handle.lock().await = Some(handle);

        Ok(())
    }

    async fn disconnect(&mut self) -> TranscriptionResult<()> {
        // Clear sender to stop the connection loop
        *self.ws_sender.lock().await = None;

        // Abort the connection task
        if let Some(handle) = self.connection_handle.lock().await.take() {
            handle.abort();
        }

        // Update state
        self.connected.store(false, Ordering::SeqCst);
        self.session_ready.store(false, Ordering::SeqCst);
        *self.state.write().await = ConnectionState::Disconnected;
        *self.session_id.write().await = None;

        tracing::info!("Disconnected from OpenAI realtime transcription endpoint");
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn is_session_ready(&self) -> bool {
        self.session_ready.load(Ordering::Acquire)
    }

    async fn session_id(&self) -> Option<String> {
        self.session_id.read().await.clone()
    }

    fn get_connection_state(&self) -> ConnectionState {
        if self.connected.load(Ordering::SeqCst) {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    async fn send_audio(&self, audio_data: Bytes) -> TranscriptionResult<()> {
        if !self.is_ready() {
            return Err(TranscriptionError::NotConnected);
        }

        // Readiness gate: audio submitted before the provider has issued a
        // session id is dropped, never queued.
        if !self.is_session_ready() {
            self.dropped_chunks.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                "No session id yet, dropping {} byte audio chunk",
                audio_data.len()
            );
            return Ok(());
        }

        self.send_event(ClientEvent::audio_append(&audio_data)).await
    }

    fn on_transcription(
        &mut self,
        callback: TranscriptionEventCallback,
    ) -> TranscriptionResult<()> {
        // Use try_lock to register synchronously when possible, avoiding a
        // race where events arrive before the callback is set
        if let Ok(mut guard) = self.transcription_callback.try_lock() {
            *guard = Some(callback);
        } else {
            let cb = self.transcription_callback.clone();
            tokio::spawn(async move {
                *cb.lock().await = Some(callback);
            });
        }
        Ok(())
    }

    fn on_error(&mut self, callback: TranscriptionErrorCallback) -> TranscriptionResult<()> {
        if let Ok(mut guard) = self.error_callback.try_lock() {
            *guard = Some(callback);
        } else {
            let cb = self.error_callback.clone();
            tokio::spawn(async move {
                *cb.lock().await = Some(callback);
            });
        }
        Ok(())
    }

    fn get_provider_info(&self) -> serde_json::Value {
        serde_json::json!({
            "provider": "openai",
            "api_type": "WebSocket Realtime",
            "intent": "transcription",
            "endpoint": OPENAI_REALTIME_URL,
            "supported_models": [
                "gpt-4o-transcribe",
                "gpt-4o-mini-transcribe",
                "whisper-1"
            ],
            "supported_audio_formats": [
                "pcm16", "g711_ulaw", "g711_alaw"
            ],
            "default_sample_rate": OPENAI_TRANSCRIPTION_SAMPLE_RATE,
            "features": {
                "streaming_transcription": true,
                "vad": true,
                "noise_reduction": true,
                "reconnection": false
            },
            "documentation": "https://platform.openai.com/docs/guides/realtime-transcription"
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
