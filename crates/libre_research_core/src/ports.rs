//! crates/libre_research_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use crate::domain::{GeneratedResearch, ResearchReport, User, UserCredentials};
use async_trait::async_trait;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port and service operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Research is still in progress")]
    NotReady,
    #[error("Research generation failed: {0}")]
    GenerationFailed(String),
    #[error("Upstream service error: {0}")]
    Upstream(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---

    /// Fails with `PortError::Conflict` when the email is already taken.
    async fn create_user(&self, email: &str, hashed_password: &str) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    // --- Research Reports ---

    async fn create_report(&self, report: &ResearchReport) -> PortResult<()>;

    async fn get_report(&self, report_id: Uuid) -> PortResult<ResearchReport>;

    /// Stores a generation result. Only a pending report may be completed;
    /// anything else is a `PortError::Conflict`.
    async fn complete_report(
        &self,
        report_id: Uuid,
        research: &GeneratedResearch,
    ) -> PortResult<ResearchReport>;

    /// Records a generation failure. Same pending-only rule as `complete_report`.
    async fn fail_report(&self, report_id: Uuid, error: &str) -> PortResult<ResearchReport>;

    /// All reports owned by the user, newest first.
    async fn list_reports_for_user(&self, user_id: Uuid) -> PortResult<Vec<ResearchReport>>;
}

#[async_trait]
pub trait ResearchGenerationService: Send + Sync {
    /// Asks the model to research a topic and returns its raw text answer.
    async fn generate_research(
        &self,
        topic: &str,
        additional_context: Option<&str>,
    ) -> PortResult<String>;
}

pub trait PasswordService: Send + Sync {
    fn hash_password(&self, password: &str) -> PortResult<String>;
    fn verify_password(&self, password: &str, hashed_password: &str) -> bool;
}

pub trait TokenService: Send + Sync {
    /// Issues a signed bearer token for the user.
    fn issue_token(&self, user: &User) -> PortResult<String>;
    /// Verifies signature and expiry and returns the subject's id.
    fn verify_token(&self, token: &str) -> PortResult<Uuid>;
}

pub trait ReportRenderingService: Send + Sync {
    /// Lays out a completed report as a paginated document.
    fn render_report(&self, report: &ResearchReport) -> PortResult<Vec<u8>>;
}
