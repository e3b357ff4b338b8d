//! Typed backend endpoints.
//!
//! Each module adds methods to [`ApiClient`](crate::ApiClient) for one
//! resource family.

pub mod auth;
pub mod evaluations;
pub mod health;
pub mod notifications;
pub mod projects;
pub mod stats;
pub mod transactions;

pub use auth::{AuthGrant, Credentials, Registration};
pub use health::ConnectivityReport;

/// Percent-encode `raw` as a single path segment.
pub(crate) fn path_segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
