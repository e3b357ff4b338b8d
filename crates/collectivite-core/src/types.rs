//! Records exchanged with the collectivite backend.
//!
//! Blockchain fields (hashes, block numbers, confirmations) are display data
//! sourced from the backend and are never interpreted here.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Authenticated user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Backend identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Organisational entity (commune, ministry directorate, ...).
    pub entity: String,
    /// Role within the validation workflow.
    pub role: Role,
    /// Signing certificate attached to the account.
    pub certificate_info: CertificateInfo,
    /// Optional avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Role of a user in the project workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Territorial decentralized collectivity agent (submits projects).
    Ctd,
    /// Ministry of decentralization agent (evaluates projects).
    Minddevel,
    /// Ministry of finance budget controller.
    Minfi,
    /// Public treasury.
    Tresor,
    /// Auditor.
    Auditeur,
    /// Platform administrator.
    Admin,
}

impl Role {
    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ctd => "ctd",
            Self::Minddevel => "minddevel",
            Self::Minfi => "minfi",
            Self::Tresor => "tresor",
            Self::Auditeur => "auditeur",
            Self::Admin => "admin",
        }
    }

    /// Label shown on profile screens.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Ctd => "Collectivité Territoriale Décentralisée",
            Self::Minddevel => "Agent MINDDEVEL",
            Self::Minfi => "Contrôleur MINFI",
            Self::Tresor => "Trésor Public",
            Self::Auditeur => "Auditeur",
            Self::Admin => "Administrateur",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Certificate record embedded in a [`User`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateInfo {
    /// Issuing authority.
    pub issuer: String,
    /// Expiry date as sent by the backend (ISO date).
    pub expiry_date: String,
    /// Certificate serial number.
    pub serial_number: String,
    /// Validity status.
    pub status: CertificateStatus,
}

/// Certificate validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    Valid,
    Expired,
    Revoked,
}

impl CertificateStatus {
    /// Badge label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Valid => "Valide",
            Self::Expired => "Expiré",
            Self::Revoked => "Révoqué",
        }
    }
}

/// Project lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Funded,
    Completed,
}

impl ProjectStatus {
    /// Wire name of the status, as used in list filters.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Funded => "funded",
            Self::Completed => "completed",
        }
    }

    /// Badge label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Submitted => "Soumis",
            Self::UnderReview => "En évaluation",
            Self::Approved => "Approuvé",
            Self::Rejected => "Rejeté",
            Self::Funded => "Financé",
            Self::Completed => "Terminé",
        }
    }
}

/// Submitted development project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    pub budget: f64,
    pub status: ProjectStatus,
    pub submitted_by: String,
    pub submission_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain_hash: Option<String>,
}

/// Fields accepted when creating or updating a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
}

/// Ledger transaction as recorded by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    pub timestamp: String,
    pub hash: String,
    pub signed_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TransactionMetadata>,
}

/// Free-form context attached to a transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

/// Evaluation of a project by a ministry agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub id: String,
    pub project_id: String,
    pub evaluator_id: String,
    pub score: f64,
    pub comments: String,
    pub timestamp: String,
}

/// User notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_read: bool,
    pub timestamp: String,
}

/// Dashboard headline figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiData {
    pub total_projects: u64,
    pub approved_projects: u64,
    pub total_budget: f64,
    pub average_processing_time: f64,
}

/// Project counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub total_projects: u64,
    pub active_projects: u64,
    pub completed_projects: u64,
    pub average_score: f64,
}

/// Budget counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetStats {
    pub total_budget: f64,
    pub approved_budget: f64,
    pub spent_budget: f64,
    pub remaining_budget: f64,
}
