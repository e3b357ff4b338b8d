//! Project endpoints.

use collectivite_core::types::{Project, ProjectDraft};
use reqwest::Method;
use serde::Deserialize;

use super::path_segment;
use crate::{ApiClient, ApiError, Filters};

#[derive(Deserialize)]
struct ProjectPage {
    projects: Vec<Project>,
}

impl ApiClient {
    /// List projects matching `filters`.
    ///
    /// # Errors
    /// Returns error if the request fails or the page is malformed.
    pub async fn projects(&self, filters: &Filters) -> Result<Vec<Project>, ApiError> {
        let page: ProjectPage = self.get(&filters.apply("/projects")).await?;
        Ok(page.projects)
    }

    /// Fetch one project.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn project(&self, id: &str) -> Result<Project, ApiError> {
        self.get(&format!("/projects/{}", path_segment(id))).await
    }

    /// Submit a new project.
    ///
    /// # Errors
    /// Returns error if the backend rejects the draft.
    pub async fn create_project(&self, draft: &ProjectDraft) -> Result<Project, ApiError> {
        self.post("/projects", draft).await
    }

    /// Update an existing project.
    ///
    /// # Errors
    /// Returns error if the backend rejects the update.
    pub async fn update_project(&self, id: &str, draft: &ProjectDraft) -> Result<Project, ApiError> {
        self.put(&format!("/projects/{}", path_segment(id)), draft).await
    }

    /// Delete a project.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn delete_project(&self, id: &str) -> Result<(), ApiError> {
        self.request_ack(Method::DELETE, &format!("/projects/{}", path_segment(id)), None)
            .await
    }
}
