//! Ledger transaction endpoints.

use collectivite_core::types::Transaction;
use serde::Deserialize;
use serde_json::Value;

use super::path_segment;
use crate::{ApiClient, ApiError, Filters};

#[derive(Deserialize)]
struct TransactionPage {
    transactions: Vec<Transaction>,
}

impl ApiClient {
    /// List transactions matching `filters`.
    ///
    /// # Errors
    /// Returns error if the request fails or the page is malformed.
    pub async fn transactions(&self, filters: &Filters) -> Result<Vec<Transaction>, ApiError> {
        let page: TransactionPage = self.get(&filters.apply("/transactions")).await?;
        Ok(page.transactions)
    }

    /// Fetch one transaction.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn transaction(&self, id: &str) -> Result<Transaction, ApiError> {
        self.get(&format!("/transactions/{}", path_segment(id))).await
    }

    /// Record a transaction. The body is passed through untouched.
    ///
    /// # Errors
    /// Returns error if the backend rejects it.
    pub async fn create_transaction(&self, transaction: &Value) -> Result<Transaction, ApiError> {
        self.post("/transactions", transaction).await
    }

    /// Ledger status of a transaction hash, as reported by the backend.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn transaction_status(&self, hash: &str) -> Result<Value, ApiError> {
        self.get(&format!("/transactions/status/{}", path_segment(hash))).await
    }
}
