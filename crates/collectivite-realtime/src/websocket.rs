//! Socket.IO over WebSocket.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::{sync::mpsc, time::Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use crate::{
    protocol::{EnginePacket, Handshake, SocketPacket},
    transport::{
        DisconnectReason, Link, Outbound, RealtimeTransport, TransportError, TransportEvent,
    },
};

/// Path the Socket.IO server is mounted on.
pub const SOCKET_IO_PATH: &str = "/socket.io/";

/// Socket.IO client transport using WebSocket frames only.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: Url,
    connect_timeout: Duration,
}

impl WebSocketTransport {
    /// Create a transport for the Socket.IO server at `socket_url`.
    ///
    /// `http(s)` URLs are mapped to `ws(s)`.
    ///
    /// # Errors
    /// Returns error if the URL cannot be parsed or has an unsupported scheme.
    pub fn new(socket_url: &str, connect_timeout: Duration) -> Result<Self, TransportError> {
        Ok(Self {
            url: engine_url(socket_url)?,
            connect_timeout,
        })
    }

    /// Full Engine.IO endpoint URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }
}

fn engine_url(socket_url: &str) -> Result<Url, TransportError> {
    let mut url =
        Url::parse(socket_url).map_err(|e| TransportError::InvalidUrl(format!("{socket_url}: {e}")))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(TransportError::InvalidUrl(format!(
                "unsupported scheme {other}"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| TransportError::InvalidUrl(socket_url.to_string()))?;
    url.set_path(SOCKET_IO_PATH);
    url.query_pairs_mut()
        .clear()
        .append_pair("EIO", "4")
        .append_pair("transport", "websocket");
    Ok(url)
}

#[async_trait]
impl RealtimeTransport for WebSocketTransport {
    async fn connect(&self, token: &str) -> Result<Link, TransportError> {
        tracing::debug!(url = %self.url, "opening socket");

        let (ws, _) = tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let auth = json!({ "token": token });
        let connect_deadline = Instant::now() + self.connect_timeout;
        tokio::spawn(async move {
            drive(ws, auth, connect_deadline, outbound_rx, inbound_tx).await;
        });

        Ok(Link {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

async fn drive<S>(
    ws: S,
    auth: serde_json::Value,
    connect_deadline: Instant,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    inbound: mpsc::UnboundedSender<TransportEvent>,
) where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin,
{
    let (mut sink, mut stream) = ws.split();

    let mut handshake: Option<Handshake> = None;
    let mut connected = false;
    let mut heartbeat = connect_deadline;

    let outcome = loop {
        let deadline = if connected { heartbeat } else { connect_deadline };

        tokio::select! {
            frame = stream.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text.to_string(),
                    Some(Ok(Message::Close(_))) | None => {
                        break Some(TransportEvent::Disconnected(DisconnectReason::TransportClose));
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::error!("socket error: {e}");
                        break Some(TransportEvent::Disconnected(
                            DisconnectReason::TransportError(e.to_string()),
                        ));
                    }
                };

                if let Some(h) = &handshake {
                    heartbeat = Instant::now() + heartbeat_window(h);
                }

                let packet = match EnginePacket::decode(&text) {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::warn!("ignoring engine frame: {e}");
                        continue;
                    }
                };

                match packet {
                    EnginePacket::Open(h) => {
                        heartbeat = Instant::now() + heartbeat_window(&h);
                        tracing::debug!(sid = %h.sid, "engine handshake");
                        handshake = Some(h);
                        let connect = SocketPacket::connect(auth.clone()).into_engine();
                        if sink.send(Message::text(connect.encode())).await.is_err() {
                            break Some(TransportEvent::Disconnected(DisconnectReason::TransportClose));
                        }
                    }
                    EnginePacket::Ping => {
                        if sink.send(Message::text(EnginePacket::Pong.encode())).await.is_err() {
                            break Some(TransportEvent::Disconnected(DisconnectReason::TransportClose));
                        }
                    }
                    EnginePacket::Close => {
                        break Some(TransportEvent::Disconnected(DisconnectReason::TransportClose));
                    }
                    EnginePacket::Message(payload) => {
                        let event = match SocketPacket::decode(&payload) {
                            Ok(p) => on_socket_packet(p, &mut connected),
                            Err(e) => {
                                tracing::warn!("ignoring socket packet: {e}");
                                None
                            }
                        };
                        match event {
                            Some(event @ (TransportEvent::Disconnected(_) | TransportEvent::ConnectError { .. })) => {
                                break Some(event);
                            }
                            Some(event) => {
                                if inbound.send(event).is_err() {
                                    break None;
                                }
                            }
                            None => {}
                        }
                    }
                    EnginePacket::Pong | EnginePacket::Upgrade | EnginePacket::Noop => {}
                }
            }
            request = outbound.recv() => {
                match request {
                    Some(Outbound::Emit { name, payload }) => {
                        if !connected {
                            tracing::debug!(%name, "dropping emit before connect");
                            continue;
                        }
                        let frame = SocketPacket::event(name, payload).into_engine().encode();
                        if sink.send(Message::text(frame)).await.is_err() {
                            break Some(TransportEvent::Disconnected(DisconnectReason::TransportClose));
                        }
                    }
                    Some(Outbound::Close) | None => {
                        let frame = SocketPacket::disconnect().into_engine().encode();
                        let _ = sink.send(Message::text(frame)).await;
                        let _ = sink.close().await;
                        break Some(TransportEvent::Disconnected(DisconnectReason::ClientDisconnect));
                    }
                }
            }
            () = tokio::time::sleep_until(deadline) => {
                if connected {
                    tracing::warn!("socket heartbeat timed out");
                    break Some(TransportEvent::Disconnected(DisconnectReason::PingTimeout));
                }
                tracing::warn!("socket handshake timed out");
                break Some(TransportEvent::Disconnected(DisconnectReason::TransportError(
                    "connect timeout".into(),
                )));
            }
        }
    };

    if let Some(event) = outcome {
        let _ = inbound.send(event);
    }
    let _ = sink.close().await;
}

fn on_socket_packet(packet: SocketPacket, connected: &mut bool) -> Option<TransportEvent> {
    if packet.namespace() != crate::protocol::DEFAULT_NAMESPACE {
        return None;
    }
    match packet {
        SocketPacket::Connect { .. } => {
            *connected = true;
            Some(TransportEvent::Connected)
        }
        SocketPacket::Disconnect { .. } => {
            Some(TransportEvent::Disconnected(DisconnectReason::ServerDisconnect))
        }
        SocketPacket::ConnectError { message, .. } => Some(TransportEvent::ConnectError { message }),
        SocketPacket::Event { name, args, .. } => Some(TransportEvent::Event {
            name,
            payload: args.into_iter().next().unwrap_or(serde_json::Value::Null),
        }),
        SocketPacket::Ack { .. } => None,
    }
}

fn heartbeat_window(handshake: &Handshake) -> Duration {
    Duration::from_millis(handshake.ping_interval + handshake.ping_timeout)
}
