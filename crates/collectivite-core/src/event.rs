//! Named events pushed by the backend over the real-time channel.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kinds of server-pushed events the client re-publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RealtimeEventKind {
    #[serde(rename = "project:created")]
    ProjectCreated,
    #[serde(rename = "project:updated")]
    ProjectUpdated,
    #[serde(rename = "project:deleted")]
    ProjectDeleted,
    #[serde(rename = "transaction:confirmed")]
    TransactionConfirmed,
    #[serde(rename = "evaluation:completed")]
    EvaluationCompleted,
    #[serde(rename = "notification:new")]
    NotificationNew,
}

impl RealtimeEventKind {
    /// Every kind, in subscription order.
    pub const ALL: [Self; 6] = [
        Self::ProjectCreated,
        Self::ProjectUpdated,
        Self::ProjectDeleted,
        Self::TransactionConfirmed,
        Self::EvaluationCompleted,
        Self::NotificationNew,
    ];

    /// Event name on the wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ProjectCreated => "project:created",
            Self::ProjectUpdated => "project:updated",
            Self::ProjectDeleted => "project:deleted",
            Self::TransactionConfirmed => "transaction:confirmed",
            Self::EvaluationCompleted => "evaluation:completed",
            Self::NotificationNew => "notification:new",
        }
    }

    /// Look up a kind by its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for RealtimeEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown event name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown real-time event: {0}")]
pub struct UnknownEvent(pub String);

impl FromStr for RealtimeEventKind {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownEvent(s.to_string()))
    }
}

/// Event received from the backend, payload kept exactly as sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeEvent {
    /// Which event fired.
    pub kind: RealtimeEventKind,
    /// Original payload.
    pub payload: Value,
}

impl RealtimeEvent {
    /// Create a new event.
    #[must_use]
    pub const fn new(kind: RealtimeEventKind, payload: Value) -> Self {
        Self { kind, payload }
    }

    /// Deserialize the payload into a typed record.
    ///
    /// # Errors
    /// Returns error if the payload does not match `T`.
    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }

    /// The `id` field of the payload, when it has one.
    #[must_use]
    pub fn subject_id(&self) -> Option<&str> {
        self.payload.get("id").and_then(Value::as_str)
    }
}
