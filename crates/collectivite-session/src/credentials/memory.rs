//! In-memory credential store.

use std::sync::RwLock;

use async_trait::async_trait;
use collectivite_core::{CredentialError, CredentialStore};

/// In-memory credential store.
///
/// The credential is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `token`.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<String>, CredentialError> {
        Ok(self
            .token
            .read()
            .map_err(|e| CredentialError::Internal(e.to_string()))?
            .clone())
    }

    async fn save(&self, token: &str) -> Result<(), CredentialError> {
        *self
            .token
            .write()
            .map_err(|e| CredentialError::Internal(e.to_string()))? = Some(token.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<(), CredentialError> {
        self.token
            .write()
            .map_err(|e| CredentialError::Internal(e.to_string()))?
            .take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_ok;

    use super::*;

    #[tokio::test]
    async fn test_save_load_clear() {
        let store = MemoryCredentialStore::new();
        assert_eq!(assert_ok!(store.load().await), None);

        assert_ok!(store.save("abc").await);
        assert_eq!(assert_ok!(store.load().await).as_deref(), Some("abc"));

        assert_ok!(store.save("def").await);
        assert_eq!(assert_ok!(store.load().await).as_deref(), Some("def"));

        assert_ok!(store.clear().await);
        assert_eq!(assert_ok!(store.load().await), None);
        assert_ok!(store.clear().await);
    }

    #[tokio::test]
    async fn test_with_token() {
        let store = MemoryCredentialStore::with_token("abc");
        assert_eq!(assert_ok!(store.load().await).as_deref(), Some("abc"));
    }
}
