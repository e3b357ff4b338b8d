//! Gateway errors.

use collectivite_core::EnvelopeError;
use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a backend call.
///
/// Every failure is surfaced to the caller; nothing is retried.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or transport failure before a response arrived.
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),
    /// The fixed client-side timeout elapsed.
    #[error("Request timed out")]
    Timeout,
    /// Non-2xx response. `message` comes from the body or is `HTTP {status}`.
    #[error("{message}")]
    Status { status: StatusCode, message: String },
    /// 2xx response whose envelope reported `success: false`.
    #[error("{message}")]
    Rejected { message: String },
    /// Response body did not have the expected shape.
    #[error("Malformed response: {0}")]
    Decode(String),
    /// The configured base URL does not parse.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Whether the backend refused the credential (401/403).
    #[must_use]
    pub fn is_auth_rejection(&self) -> bool {
        matches!(
            self,
            Self::Status { status, .. }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
        )
    }

    /// HTTP status, when the failure came from a response.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e)
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

impl From<EnvelopeError> for ApiError {
    fn from(e: EnvelopeError) -> Self {
        match e {
            EnvelopeError::Rejected(message) => Self::Rejected { message },
            EnvelopeError::MissingData => Self::Decode(e.to_string()),
        }
    }
}
