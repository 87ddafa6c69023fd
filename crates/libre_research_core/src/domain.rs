//! crates/libre_research_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database; the report parts derive
//! serde so they can travel as JSON columns and response bodies unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub hashed_password: String,
}

/// Lifecycle state of a research report.
///
/// Never stored directly: it is derived from which fields the generation step
/// has populated, so a row can only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Complete,
    Failed,
}

impl ReportStatus {
    pub fn derive(summary: Option<&str>, error: Option<&str>) -> Self {
        match (summary, error) {
            (Some(_), _) => ReportStatus::Complete,
            (None, Some(_)) => ReportStatus::Failed,
            (None, None) => ReportStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Complete => "complete",
            ReportStatus::Failed => "failed",
        }
    }
}

/// One titled block of a report body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// A reference the model cited while researching the topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReference {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

/// The structured result of one successful generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedResearch {
    pub summary: String,
    pub sections: Vec<ReportSection>,
    pub sources: Vec<SourceReference>,
    /// The parsed JSON object exactly as the model returned it.
    pub raw: serde_json::Value,
}

/// A research report as persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchReport {
    pub id: Uuid,
    pub user_id: Uuid,
    pub topic: String,
    pub additional_context: Option<String>,
    pub summary: Option<String>,
    pub sections: Vec<ReportSection>,
    pub sources: Vec<SourceReference>,
    pub report_json: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ResearchReport {
    /// A freshly submitted report with nothing generated yet.
    pub fn pending(user_id: Uuid, topic: String, additional_context: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            topic,
            additional_context,
            summary: None,
            sections: Vec::new(),
            sources: Vec::new(),
            report_json: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn status(&self) -> ReportStatus {
        ReportStatus::derive(self.summary.as_deref(), self.error.as_deref())
    }

    pub fn summary_entry(&self) -> ReportSummary {
        ReportSummary {
            id: self.id,
            topic: self.topic.clone(),
            status: self.status(),
            created_at: self.created_at,
        }
    }
}

/// The slim view of a report used by history listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub id: Uuid,
    pub topic: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

/// Status of a report plus the recorded failure, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub status: ReportStatus,
    pub error: Option<String>,
}

/// A rendered, downloadable document.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}
