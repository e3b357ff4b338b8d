//! Dashboard statistics endpoints.

use collectivite_core::types::{BudgetStats, KpiData, ProjectStats};
use serde_json::Value;

use crate::{ApiClient, ApiError};

impl ApiClient {
    /// Headline figures.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn kpi(&self) -> Result<KpiData, ApiError> {
        self.get("/stats/overview").await
    }

    /// Project counters.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn project_stats(&self) -> Result<ProjectStats, ApiError> {
        self.get("/stats/projects").await
    }

    /// Budget counters.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn budget_stats(&self) -> Result<BudgetStats, ApiError> {
        self.get("/stats/budget").await
    }

    /// Ledger statistics, passed through as sent.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn blockchain_stats(&self) -> Result<Value, ApiError> {
        self.get("/stats/blockchain").await
    }
}
