//! Shared application state.
//!
//! The state owns the two halves of the relay: the upstream transcription
//! provider and the slot holding the current downstream client. Session state
//! lives inside the provider and is exposed read-only; the slot is the only
//! mutable binding shared between the upstream event path and the WebSocket
//! handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error};

use crate::config::ServerConfig;
use crate::core::transcription::{
    BaseTranscription, TranscriptionConfig, TranscriptionResult, create_transcription_provider,
};

/// The currently attached downstream client.
struct ClientHandle {
    /// Generation token identifying this attachment
    id: u64,
    /// Outgoing JSON text frames for this client
    sender: mpsc::Sender<String>,
}

/// Holder of the single "current client" reference.
///
/// At most one downstream client receives transcription output at a time.
/// Attaching returns a generation token; a new attachment replaces the
/// previous one, and a detach only clears the slot when the caller's token
/// still owns it. A connection that was replaced therefore cannot null out a
/// reference it no longer owns.
#[derive(Default)]
pub struct ClientSlot {
    inner: Mutex<Option<ClientHandle>>,
    next_id: AtomicU64,
}

impl ClientSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a client, replacing whichever client was previously held.
    ///
    /// Returns the generation token to pass to [`detach`](Self::detach).
    pub async fn attach(&self, sender: mpsc::Sender<String>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut guard = self.inner.lock().await;
        if let Some(old) = guard.replace(ClientHandle { id, sender }) {
            debug!("client {} replaced by client {}", old.id, id);
        }
        id
    }

    /// Release the slot if `id` still owns it.
    ///
    /// Returns whether the slot was cleared.
    pub async fn detach(&self, id: u64) -> bool {
        let mut guard = self.inner.lock().await;
        match guard.as_ref() {
            Some(current) if current.id == id => {
                *guard = None;
                true
            }
            _ => false,
        }
    }

    /// Whether a client is currently attached.
    pub async fn is_attached(&self) -> bool {
        self.inner.lock().await.is_some()
    }

    /// Push a JSON text frame to the current client.
    ///
    /// Delivery is best-effort: when no client is attached, or the attached
    /// client's connection has gone away, the frame is dropped silently.
    pub async fn push(&self, text: String) {
        let target = {
            let guard = self.inner.lock().await;
            guard.as_ref().map(|h| (h.id, h.sender.clone()))
        };
        match target {
            Some((id, sender)) => {
                if sender.send(text).await.is_err() {
                    debug!("client {} is gone, dropping transcription event", id);
                }
            }
            None => debug!("no client connected, dropping transcription event"),
        }
    }
}

/// Shared application state for all handlers.
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// Upstream transcription provider
    pub relay: Arc<dyn BaseTranscription>,
    /// The current downstream client
    pub client: Arc<ClientSlot>,
}

impl AppState {
    /// Create the application state and connect the upstream provider.
    pub async fn new(config: ServerConfig) -> TranscriptionResult<Arc<Self>> {
        let transcription = config.transcription_config();
        Self::with_transcription_config(config, transcription).await
    }

    /// Create the application state with an explicit provider configuration.
    ///
    /// Used by tests to point the provider at a stub endpoint.
    pub async fn with_transcription_config(
        config: ServerConfig,
        transcription: TranscriptionConfig,
    ) -> TranscriptionResult<Arc<Self>> {
        let client = Arc::new(ClientSlot::new());
        let mut relay = create_transcription_provider("openai", transcription)?;

        // Fan transcription events to whichever client is current at the
        // time the event arrives
        let slot = client.clone();
        relay.on_transcription(Arc::new(move |update| {
            let slot = slot.clone();
            Box::pin(async move {
                slot.push(update.raw).await;
            })
        }))?;

        relay.on_error(Arc::new(|err| {
            Box::pin(async move {
                error!("Upstream transcription error: {}", err);
            })
        }))?;

        relay.connect().await?;

        Ok(Arc::new(Self {
            config,
            relay: Arc::from(relay),
            client,
        }))
    }
}
