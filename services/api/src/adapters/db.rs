//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libre_research_core::domain::{
    GeneratedResearch, ReportSection, ResearchReport, SourceReference, User, UserCredentials,
};
use libre_research_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const REPORT_COLUMNS: &str = "id, user_id, topic, additional_context, summary, sections, sources, report_json, error, created_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    hashed_password: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user: User {
                id: self.id,
                email: self.email,
                created_at: self.created_at,
            },
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct ReportRecord {
    id: Uuid,
    user_id: Uuid,
    topic: String,
    additional_context: Option<String>,
    summary: Option<String>,
    sections: Json<Vec<ReportSection>>,
    sources: Json<Vec<SourceReference>>,
    report_json: Option<Json<serde_json::Value>>,
    error: Option<String>,
    created_at: DateTime<Utc>,
}
impl ReportRecord {
    fn to_domain(self) -> ResearchReport {
        ResearchReport {
            id: self.id,
            user_id: self.user_id,
            topic: self.topic,
            additional_context: self.additional_context,
            summary: self.summary,
            sections: self.sections.0,
            sources: self.sources.0,
            report_json: self.report_json.map(|j| j.0),
            error: self.error,
            created_at: self.created_at,
        }
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(e: sqlx::Error, what: String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        _ => unexpected(e),
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, email, hashed_password) VALUES ($1, $2, $3) \
             RETURNING id, email, hashed_password, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                PortError::Conflict(format!("User {} already exists", email))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain().user)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, hashed_password, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("User {} not found", email)))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, hashed_password, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("User {} not found", user_id)))?;
        Ok(record.to_domain().user)
    }

    async fn create_report(&self, report: &ResearchReport) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO research_reports (id, user_id, topic, additional_context, sections, sources, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(report.id)
        .bind(report.user_id)
        .bind(&report.topic)
        .bind(&report.additional_context)
        .bind(Json(&report.sections))
        .bind(Json(&report.sources))
        .bind(report.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_report(&self, report_id: Uuid) -> PortResult<ResearchReport> {
        let record = sqlx::query_as::<_, ReportRecord>(&format!(
            "SELECT {} FROM research_reports WHERE id = $1",
            REPORT_COLUMNS
        ))
        .bind(report_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Research report {} not found", report_id)))?;
        Ok(record.to_domain())
    }

    async fn complete_report(
        &self,
        report_id: Uuid,
        research: &GeneratedResearch,
    ) -> PortResult<ResearchReport> {
        let record = sqlx::query_as::<_, ReportRecord>(&format!(
            "UPDATE research_reports SET summary = $2, sections = $3, sources = $4, report_json = $5 \
             WHERE id = $1 AND summary IS NULL AND error IS NULL RETURNING {}",
            REPORT_COLUMNS
        ))
        .bind(report_id)
        .bind(&research.summary)
        .bind(Json(&research.sections))
        .bind(Json(&research.sources))
        .bind(Json(&research.raw))
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        record
            .map(ReportRecord::to_domain)
            .ok_or_else(|| PortError::Conflict(format!("Research report {} is not pending", report_id)))
    }

    async fn fail_report(&self, report_id: Uuid, error: &str) -> PortResult<ResearchReport> {
        let record = sqlx::query_as::<_, ReportRecord>(&format!(
            "UPDATE research_reports SET error = $2 \
             WHERE id = $1 AND summary IS NULL AND error IS NULL RETURNING {}",
            REPORT_COLUMNS
        ))
        .bind(report_id)
        .bind(error)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        record
            .map(ReportRecord::to_domain)
            .ok_or_else(|| PortError::Conflict(format!("Research report {} is not pending", report_id)))
    }

    async fn list_reports_for_user(&self, user_id: Uuid) -> PortResult<Vec<ResearchReport>> {
        let records = sqlx::query_as::<_, ReportRecord>(&format!(
            "SELECT {} FROM research_reports WHERE user_id = $1 ORDER BY created_at DESC",
            REPORT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let reports = records.into_iter().map(|r| r.to_domain()).collect();
        Ok(reports)
    }
}
