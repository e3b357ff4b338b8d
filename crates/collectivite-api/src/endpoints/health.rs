//! Backend reachability probe.

use reqwest::header;
use serde::Serialize;

use crate::ApiClient;

/// Outcome of a `GET /health` probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectivityReport {
    /// Whether the backend answered with a 2xx status.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// URL that was probed.
    pub url: String,
}

impl ApiClient {
    /// Probe the backend health endpoint without credentials.
    ///
    /// Never fails: transport errors are reported in the returned value.
    pub async fn check_connectivity(&self) -> ConnectivityReport {
        let url = self.config().endpoint_url("health");

        let result = self
            .http()
            .get(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => ConnectivityReport {
                success: true,
                message: format!("API reachable ({})", response.status().as_u16()),
                url,
            },
            Ok(response) => ConnectivityReport {
                success: false,
                message: format!(
                    "API reachable but returned {}",
                    response.status().as_u16()
                ),
                url,
            },
            Err(e) => {
                tracing::warn!(%url, "health probe failed: {e}");
                ConnectivityReport {
                    success: false,
                    message: format!("Connection error: {e}"),
                    url,
                }
            }
        }
    }
}
