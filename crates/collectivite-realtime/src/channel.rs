//! Authenticated real-time channel and its connection state machine.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use collectivite_core::{EventBus, RealtimeEvent, RealtimeEventKind};
use serde_json::Value;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};

use crate::transport::{DisconnectReason, Link, Outbound, RealtimeTransport, TransportEvent};

/// Client-to-server event joining a room.
pub const JOIN_ROOM: &str = "join-room";
/// Client-to-server event leaving a room.
pub const LEAVE_ROOM: &str = "leave-room";

/// Connection state of a [`RealtimeChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No live connection.
    Disconnected,
    /// Connection attempt in progress.
    Connecting,
    /// The server accepted the credential.
    Connected,
}

/// Delays between reconnection attempts after a transient drop.
///
/// Defaults follow the Socket.IO client: 1 s doubling up to 5 s, unlimited
/// attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconnection {
    /// Whether to reconnect at all.
    pub enabled: bool,
    /// Delay before the first attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay.
    pub max_delay: Duration,
}

impl Default for Reconnection {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl Reconnection {
    /// Never reconnect.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Delay before attempt number `attempt` (0-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

type SharedOutbound = Arc<Mutex<Option<mpsc::UnboundedSender<Outbound>>>>;

/// One authenticated real-time session.
///
/// The channel owns a background task that connects with its credential,
/// republishes known server events on the [`EventBus`], and reconnects with
/// the same credential after transient drops. The credential never changes:
/// a new login means a new channel.
pub struct RealtimeChannel {
    token: String,
    state: watch::Receiver<ChannelState>,
    outbound: SharedOutbound,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl RealtimeChannel {
    /// Start a channel authenticated with `token`.
    #[must_use]
    pub fn open<T: RealtimeTransport>(
        transport: Arc<T>,
        token: impl Into<String>,
        bus: EventBus,
        reconnection: Reconnection,
    ) -> Self {
        let token = token.into();
        let (state_tx, state_rx) = watch::channel(ChannelState::Disconnected);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let outbound: SharedOutbound = Arc::new(Mutex::new(None));

        let driver = Driver {
            transport,
            token: token.clone(),
            bus,
            reconnection,
            state: state_tx,
            outbound: Arc::clone(&outbound),
        };
        let task = tokio::spawn(driver.run(shutdown_rx));

        Self {
            token,
            state: state_rx,
            outbound,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Credential this channel authenticates with.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    /// Whether the server currently accepts this channel.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ChannelState::Connected
    }

    /// Watch connection state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.state.clone()
    }

    /// Emit a named event. No-op unless connected; no acknowledgement.
    ///
    /// Returns true if the emit was handed to the connection.
    pub fn emit(&self, name: impl Into<String>, payload: Value) -> bool {
        if !self.is_connected() {
            return false;
        }
        let guard = self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().is_some_and(|tx| {
            tx.send(Outbound::Emit {
                name: name.into(),
                payload,
            })
            .is_ok()
        })
    }

    /// Join a server-side room. No-op unless connected.
    pub fn join_room(&self, room: &str) -> bool {
        self.emit(JOIN_ROOM, Value::String(room.to_string()))
    }

    /// Leave a server-side room. No-op unless connected.
    pub fn leave_room(&self, room: &str) -> bool {
        self.emit(LEAVE_ROOM, Value::String(room.to_string()))
    }

    /// Disconnect for good and wait for the background task to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("real-time task ended abnormally: {e}");
            }
        }
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for RealtimeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeChannel")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

struct Driver<T> {
    transport: Arc<T>,
    token: String,
    bus: EventBus,
    reconnection: Reconnection,
    state: watch::Sender<ChannelState>,
    outbound: SharedOutbound,
}

/// How a single connection attempt ended.
enum Ended {
    Shutdown,
    Retry,
    Final,
}

impl<T: RealtimeTransport> Driver<T> {
    async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        let mut attempt: u32 = 0;

        loop {
            self.set_state(ChannelState::Connecting);

            let connect = tokio::select! {
                result = self.transport.connect(&self.token) => result,
                _ = &mut shutdown => break,
            };

            let ended = match connect {
                Ok(link) => self.serve(link, &mut shutdown, &mut attempt).await,
                Err(e) => {
                    tracing::warn!("real-time connection failed: {e}");
                    self.set_state(ChannelState::Disconnected);
                    Ended::Retry
                }
            };

            match ended {
                Ended::Shutdown | Ended::Final => break,
                Ended::Retry if !self.reconnection.enabled => break,
                Ended::Retry => {}
            }

            let delay = self.reconnection.delay(attempt);
            attempt = attempt.saturating_add(1);
            tracing::debug!(?delay, attempt, "scheduling real-time reconnect");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                _ = &mut shutdown => break,
            }
        }

        self.set_state(ChannelState::Disconnected);
    }

    async fn serve(
        &self,
        link: Link,
        shutdown: &mut oneshot::Receiver<()>,
        attempt: &mut u32,
    ) -> Ended {
        let Link {
            outbound,
            mut inbound,
        } = link;
        *self.outbound.lock().unwrap_or_else(PoisonError::into_inner) = Some(outbound.clone());

        let ended = loop {
            tokio::select! {
                event = inbound.recv() => match event {
                    Some(TransportEvent::Connected) => {
                        tracing::info!("real-time channel connected");
                        *attempt = 0;
                        self.set_state(ChannelState::Connected);
                    }
                    Some(TransportEvent::Event { name, payload }) => self.republish(&name, payload),
                    Some(TransportEvent::Disconnected(reason)) => {
                        tracing::info!(?reason, "real-time channel disconnected");
                        break if reason.should_reconnect() {
                            Ended::Retry
                        } else {
                            Ended::Final
                        };
                    }
                    Some(TransportEvent::ConnectError { message }) => {
                        tracing::warn!("real-time connection refused: {message}");
                        break Ended::Final;
                    }
                    None => {
                        tracing::info!(reason = ?DisconnectReason::TransportClose, "real-time channel disconnected");
                        break Ended::Retry;
                    }
                },
                _ = &mut *shutdown => {
                    let _ = outbound.send(Outbound::Close);
                    break Ended::Shutdown;
                }
            }
        };

        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.set_state(ChannelState::Disconnected);
        ended
    }

    fn republish(&self, name: &str, payload: Value) {
        match RealtimeEventKind::from_name(name) {
            Some(kind) => {
                self.bus.publish(RealtimeEvent::new(kind, payload));
            }
            None => tracing::debug!(%name, "ignoring unknown real-time event"),
        }
    }

    fn set_state(&self, state: ChannelState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_reconnection_delays() {
        let r = Reconnection::default();
        assert_eq!(r.delay(0), Duration::from_secs(1));
        assert_eq!(r.delay(1), Duration::from_secs(2));
        assert_eq!(r.delay(2), Duration::from_secs(4));
        assert_eq!(r.delay(3), Duration::from_secs(5));
        assert_eq!(r.delay(40), Duration::from_secs(5));
    }
}
