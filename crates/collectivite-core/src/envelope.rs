//! Response envelope shared by every backend endpoint.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message used when the backend rejects a request without explaining why.
pub const GENERIC_REJECTION: &str = "Request rejected by server";

/// `{ success, data, message? }` wrapper around every response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Whether the backend accepted the request.
    pub success: bool,
    /// Payload, present on success.
    pub data: Option<T>,
    /// Human-readable message, usually present on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Envelope could not be turned into a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("{0}")]
    Rejected(String),
    #[error("Response marked successful but carried no data")]
    MissingData,
}

impl<T> ApiEnvelope<T> {
    /// Successful envelope carrying `data`.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    /// Failed envelope carrying `message`.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Extract the payload.
    ///
    /// # Errors
    /// Returns [`EnvelopeError::Rejected`] when `success` is false and
    /// [`EnvelopeError::MissingData`] when a successful envelope has no data.
    pub fn into_result(self) -> Result<T, EnvelopeError> {
        if !self.success {
            return Err(EnvelopeError::Rejected(
                self.message
                    .unwrap_or_else(|| GENERIC_REJECTION.to_string()),
            ));
        }
        self.data.ok_or(EnvelopeError::MissingData)
    }
}
