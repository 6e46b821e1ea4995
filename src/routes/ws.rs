//! Audio WebSocket route configuration
//!
//! This module configures the WebSocket endpoint clients use to stream raw
//! PCM audio in and receive transcription events back.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::ws::ws_audio_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the audio WebSocket router
///
/// # Endpoint
///
/// `GET /ws` - WebSocket upgrade for audio streaming
///
/// # Protocol
///
/// After the upgrade, clients send binary audio frames (PCM 16-bit, 24kHz,
/// mono by default). The server pushes JSON text frames containing the
/// provider's transcription events verbatim
/// (`conversation.item.input_audio_transcription.*`).
///
/// Audio sent before the upstream session is established is dropped. A new
/// connection replaces the previously connected client.
pub fn create_ws_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws", get(ws_audio_handler))
        .layer(TraceLayer::new_for_http())
}
