//! End-to-end relay lifecycle tests.
//!
//! These tests run the full stack: a stub provider endpoint stands in for
//! OpenAI's realtime transcription API, the relay server runs on an
//! ephemeral port, and downstream clients connect over real WebSockets.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use base64::prelude::*;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

use scribe_relay::config::ServerConfig;
use scribe_relay::core::transcription::{BaseTranscription, VadConfig};
use scribe_relay::routes;
use scribe_relay::state::AppState;

const SESSION_CREATED: &str = r#"{"type":"transcription_session.created","session":{"id":"sess_e2e_001","object":"realtime.transcription_session"}}"#;

/// A stub provider endpoint for one upstream connection.
struct StubUpstream {
    endpoint: String,
    /// Messages the relay sent upstream, parsed as JSON
    received: mpsc::UnboundedReceiver<serde_json::Value>,
    /// Inject a text frame from the "provider" to the relay
    inject: mpsc::UnboundedSender<String>,
}

async fn spawn_stub(send_created_on_connect: bool) -> StubUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    let (received_tx, received_rx) = mpsc::unbounded_channel();
    let (inject_tx, mut inject_rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
            return;
        };
        let (mut sink, mut stream) = ws.split();

        if send_created_on_connect {
            let _ = sink.send(Message::Text(SESSION_CREATED.into())).await;
        }

        loop {
            tokio::select! {
                frame = inject_rx.recv() => match frame {
                    Some(text) => {
                        let _ = sink.send(Message::Text(text.into())).await;
                    }
                    None => break,
                },
                msg = stream.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(value) = serde_json::from_str(&text) {
                            let _ = received_tx.send(value);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    });

    StubUpstream {
        endpoint: format!("ws://{addr}/v1/realtime"),
        received: received_rx,
        inject: inject_tx,
    }
}

fn test_server_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        openai_api_key: "test_key".to_string(),
        transcription_model: "gpt-4o-transcribe".to_string(),
        transcription_language: "en".to_string(),
        vad: VadConfig::default(),
        noise_reduction: None,
        cors_allowed_origins: None,
    }
}

/// Build the relay against the stub and serve it on an ephemeral port.
///
/// Returns the listen address plus a clone of the router for `oneshot`
/// requests.
async fn spawn_relay(stub_endpoint: &str) -> (Arc<AppState>, SocketAddr, Router) {
    let config = test_server_config();
    let mut transcription = config.transcription_config();
    transcription.endpoint = Some(stub_endpoint.to_string());

    let state = AppState::with_transcription_config(config, transcription)
        .await
        .expect("connect relay to stub");

    let app = routes::api::create_api_router()
        .merge(routes::ws::create_ws_router())
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind relay");
    let addr = listener.local_addr().expect("relay addr");
    let serve_app = app.clone();
    tokio::spawn(async move {
        axum::serve(listener, serve_app).await.expect("serve relay");
    });

    (state, addr, app)
}

type DownstreamClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect_downstream(addr: SocketAddr) -> DownstreamClient {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("connect downstream client");
    ws
}

async fn wait_for<F: Fn() -> bool>(what: &str, cond: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn recv_upstream(rx: &mut mpsc::UnboundedReceiver<serde_json::Value>) -> serde_json::Value {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for upstream message")
        .expect("stub channel closed")
}

async fn recv_text(client: &mut DownstreamClient) -> String {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for downstream frame")
            .expect("downstream connection closed")
            .expect("downstream websocket error");
        match msg {
            Message::Text(text) => return text.to_string(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected downstream frame: {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_audio_forwarded_and_transcripts_relayed() {
    let mut stub = spawn_stub(true).await;
    let (state, addr, _app) = spawn_relay(&stub.endpoint).await;

    wait_for("session readiness", || state.relay.is_session_ready()).await;

    // The session configuration goes out before any audio
    let first = recv_upstream(&mut stub.received).await;
    assert_eq!(first["type"], "transcription_session.update");

    let mut client = connect_downstream(addr).await;

    // Binary PCM in becomes exactly one base64 append per chunk
    let audio = vec![10u8, 20, 30, 40];
    client
        .send(Message::Binary(audio.clone().into()))
        .await
        .unwrap();

    let append = recv_upstream(&mut stub.received).await;
    assert_eq!(append["type"], "input_audio_buffer.append");
    assert_eq!(
        append["audio"].as_str().unwrap(),
        BASE64_STANDARD.encode(&audio)
    );

    // A transcription event from the provider reaches the client verbatim
    let completed = r#"{"type":"conversation.item.input_audio_transcription.completed","item_id":"item_1","content_index":0,"transcript":"hello world"}"#;
    stub.inject.send(completed.to_string()).unwrap();

    assert_eq!(recv_text(&mut client).await, completed);
}

#[tokio::test]
async fn test_audio_dropped_while_session_missing() {
    // The stub never sends transcription_session.created
    let mut stub = spawn_stub(false).await;
    let (state, addr, _app) = spawn_relay(&stub.endpoint).await;

    assert!(state.relay.is_ready());
    assert!(!state.relay.is_session_ready());

    let mut client = connect_downstream(addr).await;
    for _ in 0..3 {
        client
            .send(Message::Binary(vec![1u8, 2, 3].into()))
            .await
            .unwrap();
    }

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(
        stub.received.try_recv().is_err(),
        "no audio and no session configuration may reach the provider"
    );
}

#[tokio::test]
async fn test_new_client_replaces_previous() {
    let mut stub = spawn_stub(true).await;
    let (state, addr, _app) = spawn_relay(&stub.endpoint).await;
    wait_for("session readiness", || state.relay.is_session_ready()).await;

    // Drain the session configuration
    let first = recv_upstream(&mut stub.received).await;
    assert_eq!(first["type"], "transcription_session.update");

    let mut old_client = connect_downstream(addr).await;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !state.client.is_attached().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for first client attach"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let mut new_client = connect_downstream(addr).await;
    // Give the second connection time to take over the slot
    tokio::time::sleep(Duration::from_millis(100)).await;

    let delta = r#"{"type":"conversation.item.input_audio_transcription.delta","item_id":"item_9","content_index":0,"delta":"only for the current client"}"#;
    stub.inject.send(delta.to_string()).unwrap();

    // Only the most recent connection receives the event
    assert_eq!(recv_text(&mut new_client).await, delta);
    let nothing = tokio::time::timeout(Duration::from_millis(200), old_client.next()).await;
    assert!(
        nothing.is_err(),
        "a replaced client must not receive transcription output"
    );
}

#[tokio::test]
async fn test_health_ok_regardless_of_upstream_state() {
    // Upstream session never becomes ready; health must not care
    let stub = spawn_stub(false).await;
    let (state, _addr, app) = spawn_relay(&stub.endpoint).await;
    assert!(!state.relay.is_session_ready());

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&body[..], b"ok");

    // Still ok after the upstream connection drops entirely
    drop(stub);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
