//! Authenticated HTTP gateway to the collectivite backend.
//!
//! Provides:
//! - `ApiConfig` - Base URL, prefix and timeouts
//! - `ApiClient` - Bearer-authenticated JSON requests
//! - Typed endpoints for auth, projects, transactions, evaluations,
//!   notifications and statistics

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod filters;

pub use client::ApiClient;
pub use config::ApiConfig;
pub use endpoints::{AuthGrant, ConnectivityReport, Credentials, Registration};
pub use error::ApiError;
pub use filters::Filters;
