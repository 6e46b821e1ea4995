//! Downstream audio WebSocket handler.
//!
//! Clients connect to `/ws`, send raw PCM audio as binary frames and receive
//! the provider's transcription events as JSON text frames, verbatim.
//!
//! Each new connection replaces whichever client was previously held; there
//! is no fan-out to multiple clients. Audio received before the upstream
//! session id is known is silently dropped.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Channel buffer size for outgoing transcription events.
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Audio WebSocket handler.
///
/// Upgrades the HTTP connection to WebSocket and attaches the connection as
/// the current downstream client.
pub async fn ws_audio_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("Audio WebSocket connection upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_audio_socket(socket, state))
}

/// Handle the audio WebSocket connection.
async fn handle_audio_socket(socket: WebSocket, state: Arc<AppState>) {
    info!("Client connected");

    let (mut sender, mut receiver) = socket.split();
    let (event_tx, mut event_rx) = mpsc::channel::<String>(CHANNEL_BUFFER_SIZE);

    // Becoming the current client detaches whichever client was held before
    let client_id = state.client.attach(event_tx).await;

    // Sender task pumping transcription events to the client
    let sender_task = tokio::spawn(async move {
        while let Some(text) = event_rx.recv().await {
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Binary(data)) => {
                if state.relay.is_session_ready() {
                    if let Err(e) = state.relay.send_audio(data).await {
                        warn!("Failed to forward audio upstream: {}", e);
                    }
                } else {
                    debug!(
                        "No upstream session yet, dropping {} byte audio chunk",
                        data.len()
                    );
                }
            }
            Ok(Message::Text(text)) => {
                debug!("Ignoring {} byte text frame from client", text.len());
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!("Close received from client");
                break;
            }
            Err(e) => {
                warn!("Audio WebSocket error: {}", e);
                break;
            }
        }
    }

    sender_task.abort();

    // Only release the slot if this connection still owns it; a connection
    // that was replaced must not drop the new client's reference
    if state.client.detach(client_id).await {
        debug!("client {} released the slot", client_id);
    }

    info!("Client disconnected");
}
