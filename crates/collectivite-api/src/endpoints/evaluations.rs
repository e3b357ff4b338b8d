//! Evaluation endpoints.

use collectivite_core::types::Evaluation;
use serde::Deserialize;
use serde_json::Value;

use super::path_segment;
use crate::{ApiClient, ApiError, Filters};

#[derive(Deserialize)]
struct EvaluationPage {
    evaluations: Vec<Evaluation>,
}

impl ApiClient {
    /// List evaluations matching `filters`.
    ///
    /// # Errors
    /// Returns error if the request fails or the page is malformed.
    pub async fn evaluations(&self, filters: &Filters) -> Result<Vec<Evaluation>, ApiError> {
        let page: EvaluationPage = self.get(&filters.apply("/evaluations")).await?;
        Ok(page.evaluations)
    }

    /// Fetch one evaluation.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn evaluation(&self, id: &str) -> Result<Evaluation, ApiError> {
        self.get(&format!("/evaluations/{}", path_segment(id))).await
    }

    /// Record an evaluation.
    ///
    /// # Errors
    /// Returns error if the backend rejects it.
    pub async fn create_evaluation(&self, evaluation: &Value) -> Result<Evaluation, ApiError> {
        self.post("/evaluations", evaluation).await
    }

    /// Amend an evaluation.
    ///
    /// # Errors
    /// Returns error if the backend rejects it.
    pub async fn update_evaluation(
        &self,
        id: &str,
        evaluation: &Value,
    ) -> Result<Evaluation, ApiError> {
        self.put(&format!("/evaluations/{}", path_segment(id)), evaluation).await
    }
}
