//! Authentication endpoints.

use collectivite_core::{Role, User};
use serde::{Deserialize, Serialize};

use crate::{ApiClient, ApiError};

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials<'a> {
    /// Account identifier (login name or e-mail).
    #[serde(rename = "email")]
    pub identifier: &'a str,
    /// Account secret.
    #[serde(rename = "password")]
    pub secret: &'a str,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub entity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Identity and bearer credential returned by login or registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthGrant {
    /// Authenticated user.
    pub user: User,
    /// Bearer credential for subsequent calls.
    pub token: String,
}

impl ApiClient {
    /// Exchange an identifier and secret for a bearer credential.
    ///
    /// # Errors
    /// Returns [`ApiError::Rejected`] or [`ApiError::Status`] when the
    /// backend refuses the credentials, and transport errors otherwise.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<AuthGrant, ApiError> {
        self.post("/auth/login", &Credentials { identifier, secret })
            .await
    }

    /// Create an account and obtain a bearer credential for it.
    ///
    /// # Errors
    /// As [`ApiClient::login`].
    pub async fn register(&self, registration: &Registration) -> Result<AuthGrant, ApiError> {
        self.post("/auth/register", registration).await
    }

    /// Profile of the user owning the current credential.
    ///
    /// # Errors
    /// Returns [`ApiError::Status`] with 401 when the credential is invalid
    /// or expired.
    pub async fn profile(&self) -> Result<User, ApiError> {
        self.get("/auth/profile").await
    }
}
