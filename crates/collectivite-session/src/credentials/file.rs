//! Credential store backed by a JSON file.
//!
//! The file holds a single key-value object:
//!
//! ```json
//! { "authToken": "<bearer>" }
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use collectivite_core::{CREDENTIAL_KEY, CredentialError, CredentialStore};
use serde_json::{Map, Value};

/// Directory under the platform config dir.
const APP_DIR: &str = "collectivite";
/// File name inside [`APP_DIR`].
const FILE_NAME: &str = "credentials.json";

/// Credential store persisting the bearer credential to disk.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Store at an explicit path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform default location.
    ///
    /// # Errors
    /// Returns error if the platform has no config directory.
    pub fn open_default() -> Result<Self, CredentialError> {
        Self::default_path()
            .map(Self::new)
            .ok_or_else(|| CredentialError::Internal("no config directory".into()))
    }

    /// `<config dir>/collectivite/credentials.json`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(FILE_NAME))
    }

    /// Location of the credential file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_atomic(&self, contents: &[u8]) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<String>, CredentialError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entries: Map<String, Value> = serde_json::from_slice(&bytes)
            .map_err(|e| CredentialError::Corrupt(e.to_string()))?;

        match entries.get(CREDENTIAL_KEY) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(token)) if token.is_empty() => Ok(None),
            Some(Value::String(token)) => Ok(Some(token.clone())),
            Some(_) => Err(CredentialError::Corrupt(format!(
                "{CREDENTIAL_KEY} is not a string"
            ))),
        }
    }

    async fn save(&self, token: &str) -> Result<(), CredentialError> {
        let mut entries = Map::new();
        entries.insert(CREDENTIAL_KEY.to_string(), Value::String(token.to_string()));
        let contents = serde_json::to_vec_pretty(&entries)
            .map_err(|e| CredentialError::Internal(e.to_string()))?;

        self.write_atomic(&contents).await?;
        tracing::debug!(path = %self.path.display(), "credential saved");
        Ok(())
    }

    async fn clear(&self) -> Result<(), CredentialError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "credential removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
