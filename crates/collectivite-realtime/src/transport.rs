//! Transport abstraction under the real-time channel.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::protocol::ProtocolError;

/// Why an established connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The server disconnected the socket on purpose.
    ServerDisconnect,
    /// The client asked to close.
    ClientDisconnect,
    /// The underlying connection was closed.
    TransportClose,
    /// The underlying connection failed.
    TransportError(String),
    /// The server stopped answering heartbeats.
    PingTimeout,
}

impl DisconnectReason {
    /// Whether the channel should try again with the same credential.
    ///
    /// Deliberate disconnects, by either side, are final.
    #[must_use]
    pub const fn should_reconnect(&self) -> bool {
        !matches!(self, Self::ServerDisconnect | Self::ClientDisconnect)
    }
}

/// Event produced by a live connection.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The server accepted the credential.
    Connected,
    /// Named server-pushed event with its first argument.
    Event { name: String, payload: Value },
    /// The connection ended.
    Disconnected(DisconnectReason),
    /// The server refused the connection (e.g. invalid credential).
    ConnectError { message: String },
}

/// Request from the channel to the connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Fire-and-forget named emit.
    Emit { name: String, payload: Value },
    /// Disconnect and release the connection.
    Close,
}

/// Channel pair connecting a [`RealtimeChannel`](crate::RealtimeChannel) to
/// one physical connection.
///
/// Dropping `outbound` closes the connection.
#[derive(Debug)]
pub struct Link {
    /// Requests to the connection.
    pub outbound: mpsc::UnboundedSender<Outbound>,
    /// Events from the connection.
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Transport error.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid socket URL: {0}")]
    InvalidUrl(String),
    #[error("Connection failed: {0}")]
    ConnectFailed(String),
    #[error("Connection timed out")]
    Timeout,
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Trait for real-time transports.
///
/// `connect` opens one physical connection authenticated with `token` and
/// returns its [`Link`]. The server's verdict arrives later on the link as
/// [`TransportEvent::Connected`] or [`TransportEvent::ConnectError`].
#[async_trait]
pub trait RealtimeTransport: Send + Sync + 'static {
    /// Open a connection authenticated with `token`.
    async fn connect(&self, token: &str) -> Result<Link, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnect_decision() {
        assert!(!DisconnectReason::ServerDisconnect.should_reconnect());
        assert!(!DisconnectReason::ClientDisconnect.should_reconnect());
        assert!(DisconnectReason::TransportClose.should_reconnect());
        assert!(DisconnectReason::PingTimeout.should_reconnect());
        assert!(DisconnectReason::TransportError("reset".into()).should_reconnect());
    }
}
