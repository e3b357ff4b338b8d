//! Persistence of the session bearer credential.

use async_trait::async_trait;
use thiserror::Error;

/// Key under which the bearer credential is persisted.
pub const CREDENTIAL_KEY: &str = "authToken";

/// Credential storage error.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt credential store: {0}")]
    Corrupt(String),
    #[error("Credential store error: {0}")]
    Internal(String),
}

/// Trait for credential storage backends.
///
/// Holds at most one bearer token. Implementations must treat clearing an
/// empty store as success.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read the persisted credential, if any.
    async fn load(&self) -> Result<Option<String>, CredentialError>;

    /// Persist a credential, replacing any previous one.
    async fn save(&self, token: &str) -> Result<(), CredentialError>;

    /// Delete the persisted credential.
    async fn clear(&self) -> Result<(), CredentialError>;
}
