//! Authenticated session for the collectivite client.
//!
//! Provides:
//! - `SessionStore` - Identity, persisted credential and real-time channel
//! - Credential stores (memory, file)

pub mod credentials;
pub mod store;

pub use store::{SessionStatus, SessionStore};

#[cfg(feature = "memory")]
pub use credentials::MemoryCredentialStore;

#[cfg(feature = "file")]
pub use credentials::FileCredentialStore;
