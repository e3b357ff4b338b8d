//! Real-time channel to the collectivite backend.
//!
//! Provides:
//! - Engine.IO / Socket.IO packet codec
//! - `RealtimeTransport` trait with WebSocket (feature: websocket) and
//!   in-memory implementations
//! - `RealtimeChannel` - Connection state machine republishing server
//!   events on an `EventBus`

pub mod channel;
pub mod memory;
pub mod protocol;
pub mod transport;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use channel::{ChannelState, RealtimeChannel, Reconnection};
pub use memory::{MemoryPeer, MemoryServer, MemoryTransport};
pub use transport::{
    DisconnectReason, Link, Outbound, RealtimeTransport, TransportError, TransportEvent,
};

#[cfg(feature = "websocket")]
pub use websocket::WebSocketTransport;
