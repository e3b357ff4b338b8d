//! Core abstractions for the collectivite client.
//!
//! This crate provides the fundamental building blocks:
//! - Backend records (`User`, `Project`, `Transaction`, ...)
//! - `ApiEnvelope` - The `{ success, data, message }` response wrapper
//! - `RealtimeEvent` and `EventBus` - Typed fan-out of pushed events
//! - `CredentialStore` - Bearer credential persistence trait

pub mod credentials;
pub mod envelope;
pub mod event;
pub mod event_bus;
pub mod types;

pub use credentials::{CREDENTIAL_KEY, CredentialError, CredentialStore};
pub use envelope::{ApiEnvelope, EnvelopeError};
pub use event::{RealtimeEvent, RealtimeEventKind};
pub use event_bus::EventBus;
pub use types::{CertificateInfo, CertificateStatus, Role, User};
