//! In-process transport for tests and offline development.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, mpsc};

use crate::transport::{
    DisconnectReason, Link, Outbound, RealtimeTransport, TransportError, TransportEvent,
};

/// Client side of an in-process transport.
///
/// Every `connect` hands a [`MemoryPeer`] to the paired [`MemoryServer`],
/// which plays the backend.
#[derive(Clone)]
pub struct MemoryTransport {
    peers: mpsc::UnboundedSender<MemoryPeer>,
    refuse: Arc<AtomicBool>,
}

impl MemoryTransport {
    /// Create a transport and the server side that receives its connections.
    #[must_use]
    pub fn new() -> (Self, MemoryServer) {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        let refuse = Arc::new(AtomicBool::new(false));

        let transport = Self {
            peers: peers_tx,
            refuse: Arc::clone(&refuse),
        };
        let server = MemoryServer {
            peers: Mutex::new(peers_rx),
            refuse,
        };

        (transport, server)
    }
}

#[async_trait]
impl RealtimeTransport for MemoryTransport {
    async fn connect(&self, token: &str) -> Result<Link, TransportError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectFailed("connection refused".into()));
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let peer = MemoryPeer {
            token: token.to_string(),
            outbound: outbound_rx,
            inbound: inbound_tx,
        };
        self.peers
            .send(peer)
            .map_err(|_| TransportError::ConnectFailed("server gone".into()))?;

        Ok(Link {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

/// Backend side of a [`MemoryTransport`].
pub struct MemoryServer {
    peers: Mutex<mpsc::UnboundedReceiver<MemoryPeer>>,
    refuse: Arc<AtomicBool>,
}

impl MemoryServer {
    /// Wait for the next client connection.
    pub async fn accept(&self) -> Option<MemoryPeer> {
        self.peers.lock().await.recv().await
    }

    /// Take a pending connection without waiting.
    pub async fn try_accept(&self) -> Option<MemoryPeer> {
        self.peers.lock().await.try_recv().ok()
    }

    /// Make subsequent `connect` calls fail at the transport level.
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }
}

/// One client connection as seen by the [`MemoryServer`].
pub struct MemoryPeer {
    token: String,
    outbound: mpsc::UnboundedReceiver<Outbound>,
    inbound: mpsc::UnboundedSender<TransportEvent>,
}

impl MemoryPeer {
    /// Credential the client connected with.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Accept the connection.
    pub fn accept(&self) -> bool {
        self.send(TransportEvent::Connected)
    }

    /// Refuse the connection.
    pub fn reject(&self, message: impl Into<String>) -> bool {
        self.send(TransportEvent::ConnectError {
            message: message.into(),
        })
    }

    /// Push a named event to the client.
    pub fn emit(&self, name: impl Into<String>, payload: Value) -> bool {
        self.send(TransportEvent::Event {
            name: name.into(),
            payload,
        })
    }

    /// End the connection.
    pub fn disconnect(&self, reason: DisconnectReason) -> bool {
        self.send(TransportEvent::Disconnected(reason))
    }

    /// Next request sent by the client; `None` once the client dropped the link.
    pub async fn recv(&mut self) -> Option<Outbound> {
        self.outbound.recv().await
    }

    /// Whether the client side has released the connection.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inbound.is_closed()
    }

    fn send(&self, event: TransportEvent) -> bool {
        self.inbound.send(event).is_ok()
    }
}
