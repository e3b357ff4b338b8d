//! Notification endpoints.

use collectivite_core::types::Notification;
use reqwest::Method;
use serde::Deserialize;

use super::path_segment;
use crate::{ApiClient, ApiError};

#[derive(Deserialize)]
struct NotificationPage {
    notifications: Vec<Notification>,
}

impl ApiClient {
    /// Notifications of the current user.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn notifications(&self) -> Result<Vec<Notification>, ApiError> {
        let page: NotificationPage = self.get("/notifications").await?;
        Ok(page.notifications)
    }

    /// Mark one notification as read.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn mark_notification_read(&self, id: &str) -> Result<(), ApiError> {
        self.request_ack(Method::PATCH, &format!("/notifications/{}/read", path_segment(id)), None)
            .await
    }

    /// Mark every notification as read.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn mark_all_notifications_read(&self) -> Result<(), ApiError> {
        self.request_ack(Method::PATCH, "/notifications/read-all", None)
            .await
    }
}
