//! Typed fan-out of real-time events to independent subscribers.

use futures::{StreamExt, future};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};

use crate::{RealtimeEvent, RealtimeEventKind};

/// Events buffered per subscriber before slow receivers start lagging.
const BUS_CAPACITY: usize = 1024;

/// Broadcast bus for [`RealtimeEvent`]s.
///
/// Publishers never learn who is listening; each subscriber gets its own
/// copy of every event published after it subscribed.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RealtimeEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create a new bus.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, event: RealtimeEvent) -> usize {
        tracing::debug!(kind = %event.kind, "publishing real-time event");
        self.sender.send(event).unwrap_or(0)
    }

    /// Get a receiver for live events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Stream of every event published from now on.
    ///
    /// Lagged receivers skip the events they missed.
    #[must_use]
    pub fn stream(&self) -> futures::stream::BoxStream<'static, RealtimeEvent> {
        BroadcastStream::new(self.subscribe())
            .filter_map(|res: Result<RealtimeEvent, BroadcastStreamRecvError>| async move {
                match res {
                    Ok(event) => Some(event),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event subscriber lagged");
                        None
                    }
                }
            })
            .boxed()
    }

    /// Stream of events of a single kind.
    #[must_use]
    pub fn stream_kind(
        &self,
        kind: RealtimeEventKind,
    ) -> futures::stream::BoxStream<'static, RealtimeEvent> {
        self.stream()
            .filter(move |event| future::ready(event.kind == kind))
            .boxed()
    }
}
