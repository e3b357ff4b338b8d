//! Authenticated JSON gateway.

use std::sync::{Arc, PoisonError, RwLock};

use collectivite_core::{ApiEnvelope, envelope::GENERIC_REJECTION};
use reqwest::{Method, header};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{ApiConfig, ApiError};

/// HTTP gateway to the backend.
///
/// Cloning is cheap; clones share the connection pool and the bearer
/// credential. Calls are independent: no retry, queueing or deduplication.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ApiConfig>,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    /// Create a new client.
    ///
    /// # Errors
    /// Returns [`ApiError::InvalidUrl`] if the base URL does not parse, or
    /// a transport error if the underlying HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        url::Url::parse(&config.api_base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", config.api_base_url)))?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ApiError::Transport)?;

        Ok(Self {
            http,
            config: Arc::new(config),
            token: Arc::new(RwLock::new(None)),
        })
    }

    /// Client configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub(crate) const fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Attach a bearer credential to subsequent requests.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    /// Stop sending a bearer credential.
    pub fn clear_token(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Current bearer credential.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Send a request and parse the JSON body.
    ///
    /// # Errors
    /// Returns [`ApiError::Status`] for non-2xx responses (message taken from
    /// the body when present), and transport/timeout/decode errors otherwise.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let url = self.config.endpoint_url(path);
        tracing::debug!(%method, %url, "api request");

        let mut builder = self
            .http
            .request(method.clone(), &url)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = self.token() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(%method, %url, "api request failed: {e}");
            ApiError::from(e)
        })?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let message = error_message(&bytes)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            tracing::warn!(%method, %url, status = status.as_u16(), "api error: {message}");
            return Err(ApiError::Status { status, message });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send a request and unwrap the `{ success, data }` envelope.
    ///
    /// # Errors
    /// As [`ApiClient::request`], plus [`ApiError::Rejected`] when the
    /// envelope reports `success: false`.
    pub async fn request_data<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let envelope: ApiEnvelope<T> = self.request(method, path, body).await?;
        Ok(envelope.into_result()?)
    }

    /// Send a request whose payload is irrelevant, checking only `success`.
    ///
    /// # Errors
    /// As [`ApiClient::request_data`].
    pub async fn request_ack(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<(), ApiError> {
        let envelope: ApiEnvelope<Value> = self.request(method, path, body).await?;
        if envelope.success {
            Ok(())
        } else {
            Err(ApiError::Rejected {
                message: envelope
                    .message
                    .unwrap_or_else(|| GENERIC_REJECTION.to_string()),
            })
        }
    }

    /// `GET` and unwrap the envelope.
    ///
    /// # Errors
    /// As [`ApiClient::request_data`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request_data(Method::GET, path, None).await
    }

    /// `POST` a JSON body and unwrap the envelope.
    ///
    /// # Errors
    /// As [`ApiClient::request_data`], or [`ApiError::Decode`] if `body`
    /// cannot be serialized.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.request_data(Method::POST, path, Some(body)).await
    }

    /// `PUT` a JSON body and unwrap the envelope.
    ///
    /// # Errors
    /// As [`ApiClient::post`].
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.request_data(Method::PUT, path, Some(body)).await
    }
}

/// Human-readable `message` field of an error body.
fn error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
