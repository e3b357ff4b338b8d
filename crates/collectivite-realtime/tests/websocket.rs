//! Socket.IO client against a minimal in-process Socket.IO server.

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use collectivite_core::{EventBus, RealtimeEventKind};
use collectivite_realtime::{ChannelState, RealtimeChannel, Reconnection, WebSocketTransport};
use tokio::sync::mpsc;

const WAIT: Duration = Duration::from_secs(5);

const OPEN: &str = r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;

#[derive(Clone)]
struct ServerState {
    frames: mpsc::UnboundedSender<String>,
}

fn text(frame: &str) -> Message {
    Message::Text(frame.to_string().into())
}

async fn socket_io(ws: WebSocketUpgrade, State(state): State<ServerState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| session(socket, state))
}

async fn session(mut socket: WebSocket, state: ServerState) {
    if socket.send(text(OPEN)).await.is_err() {
        return;
    }

    while let Some(Ok(msg)) = socket.recv().await {
        let Message::Text(frame) = msg else { continue };
        let frame = frame.as_str().to_string();
        let _ = state.frames.send(frame.clone());

        if let Some(auth) = frame.strip_prefix("40") {
            let auth: serde_json::Value = serde_json::from_str(auth).unwrap_or_default();
            if auth["token"] == "abc" {
                let _ = socket.send(text(r#"40{"sid":"wZX3oN0bSVIhsaknAAAI"}"#)).await;
                let _ = socket.send(text("2")).await;
                let _ = socket
                    .send(text(r#"42["project:created",{"id":"P1","budget":150000000}]"#))
                    .await;
            } else {
                let _ = socket
                    .send(text(r#"44{"message":"Authentication error"}"#))
                    .await;
            }
        }
    }
}

async fn spawn_server() -> (String, mpsc::UnboundedReceiver<String>) {
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();
    let app = Router::new()
        .route("/socket.io/", get(socket_io))
        .with_state(ServerState { frames: frames_tx });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), frames_rx)
}

/// Server that accepts the WebSocket but never opens an Engine.IO session.
async fn spawn_silent_server() -> (String, mpsc::UnboundedReceiver<()>) {
    let (upgrades_tx, upgrades_rx) = mpsc::unbounded_channel();
    let app = Router::new().route(
        "/socket.io/",
        get(move |ws: WebSocketUpgrade| {
            let upgrades = upgrades_tx.clone();
            async move {
                ws.on_upgrade(move |mut socket| async move {
                    let _ = upgrades.send(());
                    while let Some(Ok(_)) = socket.recv().await {}
                })
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), upgrades_rx)
}

async fn next_frame(frames: &mut mpsc::UnboundedReceiver<String>) -> String {
    tokio::time::timeout(WAIT, frames.recv()).await.unwrap().unwrap()
}

#[tokio::test]
async fn test_socket_io_session() {
    let (url, mut frames) = spawn_server().await;
    let transport = WebSocketTransport::new(&url, WAIT).unwrap();
    let bus = EventBus::new();
    let mut events = bus.stream_kind(RealtimeEventKind::ProjectCreated);

    let channel = RealtimeChannel::open(Arc::new(transport), "abc", bus, Reconnection::disabled());
    let mut state = channel.subscribe_state();

    assert_eq!(next_frame(&mut frames).await, r#"40{"token":"abc"}"#);

    tokio::time::timeout(WAIT, state.wait_for(|s| *s == ChannelState::Connected))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(next_frame(&mut frames).await, "3");

    let event = tokio::time::timeout(WAIT, futures::StreamExt::next(&mut events))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.payload["id"], "P1");
    assert_eq!(event.payload["budget"], 150_000_000);

    assert!(channel.join_room("projet-P1"));
    assert_eq!(next_frame(&mut frames).await, r#"42["join-room","projet-P1"]"#);

    channel.shutdown().await;
    assert_eq!(next_frame(&mut frames).await, "41");
}

#[tokio::test]
async fn test_rejected_token_leaves_channel_disconnected() {
    let (url, mut frames) = spawn_server().await;
    let transport = WebSocketTransport::new(&url, WAIT).unwrap();

    let channel = RealtimeChannel::open(
        Arc::new(transport),
        "expired",
        EventBus::new(),
        Reconnection::default(),
    );
    let mut state = channel.subscribe_state();

    assert_eq!(next_frame(&mut frames).await, r#"40{"token":"expired"}"#);
    tokio::time::timeout(WAIT, state.wait_for(|s| *s == ChannelState::Disconnected))
        .await
        .unwrap()
        .unwrap();
    assert!(!channel.is_connected());
}

#[tokio::test]
async fn test_handshake_timeout_is_retried() {
    let (url, mut upgrades) = spawn_silent_server().await;
    let transport = WebSocketTransport::new(&url, Duration::from_millis(200)).unwrap();
    let reconnection = Reconnection {
        enabled: true,
        initial_delay: Duration::from_millis(50),
        max_delay: Duration::from_millis(50),
    };

    let channel = RealtimeChannel::open(Arc::new(transport), "abc", EventBus::new(), reconnection);

    for _ in 0..3 {
        tokio::time::timeout(WAIT, upgrades.recv())
            .await
            .expect("channel stopped retrying")
            .unwrap();
    }
    assert!(!channel.is_connected());
}
