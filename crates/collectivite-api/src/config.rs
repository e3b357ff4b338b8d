//! Backend endpoints and client-side timeouts.

use std::time::Duration;

/// Deployed backend used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "https://backendcollectivite.up.railway.app";

/// Fixed HTTP request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Real-time channel connect timeout.
pub const SOCKET_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Environment variable overriding the API base URL.
pub const ENV_API_URL: &str = "COLLECTIVITE_API_URL";
/// Environment variable overriding the real-time channel URL.
pub const ENV_SOCKET_URL: &str = "COLLECTIVITE_SOCKET_URL";
/// Environment variable setting the API path prefix (e.g. `/api`).
pub const ENV_API_PREFIX: &str = "COLLECTIVITE_API_PREFIX";

/// Static client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL for HTTP calls.
    pub api_base_url: String,
    /// Base URL for the real-time channel.
    pub socket_url: String,
    /// Optional path prefix inserted between base URL and endpoint.
    pub api_prefix: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Real-time connect timeout.
    pub socket_connect_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl ApiConfig {
    /// Configuration pointing both HTTP and real-time traffic at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            socket_url: base_url.clone(),
            api_base_url: base_url,
            api_prefix: String::new(),
            request_timeout: REQUEST_TIMEOUT,
            socket_connect_timeout: SOCKET_CONNECT_TIMEOUT,
        }
    }

    /// Build from `COLLECTIVITE_*` environment variables, falling back to
    /// the defaults. The socket URL follows the API URL unless set.
    #[must_use]
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        let mut config = Self::new(non_empty(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.into()));
        if let Some(socket_url) = non_empty(ENV_SOCKET_URL) {
            config.socket_url = socket_url;
        }
        if let Some(prefix) = non_empty(ENV_API_PREFIX) {
            config.api_prefix = prefix;
        }
        config
    }

    /// Set the real-time channel URL.
    #[must_use]
    pub fn with_socket_url(mut self, socket_url: impl Into<String>) -> Self {
        self.socket_url = socket_url.into();
        self
    }

    /// Set the API path prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    /// Set the HTTP request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the real-time connect timeout.
    #[must_use]
    pub const fn with_socket_connect_timeout(mut self, timeout: Duration) -> Self {
        self.socket_connect_timeout = timeout;
        self
    }

    /// Full URL of an endpoint: base, then prefix (if any), then the endpoint
    /// with its leading slash removed.
    #[must_use]
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        let base = self.api_base_url.trim_end_matches('/');
        let endpoint = endpoint.strip_prefix('/').unwrap_or(endpoint);
        let prefix = self.api_prefix.trim_matches('/');

        if prefix.is_empty() {
            format!("{base}/{endpoint}")
        } else {
            format!("{base}/{prefix}/{endpoint}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_without_prefix() {
        let config = ApiConfig::new("http://localhost:5000");
        assert_eq!(
            config.endpoint_url("/auth/login"),
            "http://localhost:5000/auth/login"
        );
        assert_eq!(config.endpoint_url("health"), "http://localhost:5000/health");
    }

    #[test]
    fn test_endpoint_with_prefix() {
        let with_slash = ApiConfig::new("http://localhost:5000").with_prefix("/api");
        let without_slash = ApiConfig::new("http://localhost:5000/").with_prefix("api");

        assert_eq!(
            with_slash.endpoint_url("/projects/P1"),
            "http://localhost:5000/api/projects/P1"
        );
        assert_eq!(
            without_slash.endpoint_url("projects/P1"),
            "http://localhost:5000/api/projects/P1"
        );
    }

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.socket_url, DEFAULT_API_URL);
        assert!(config.api_prefix.is_empty());
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.socket_connect_timeout, Duration::from_secs(20));
    }
}
