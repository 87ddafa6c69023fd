//! services/api/src/adapters/memory.rs
//!
//! A process-local `DatabaseService` used when no `DATABASE_URL` is configured
//! and by the HTTP tests. Contents are lost on restart.

use async_trait::async_trait;
use chrono::Utc;
use libre_research_core::domain::{GeneratedResearch, ResearchReport, User, UserCredentials};
use libre_research_core::ports::{DatabaseService, PortError, PortResult};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserCredentials>,
    /// Insertion order doubles as creation order for history listings.
    reports: Vec<ResearchReport>,
}

#[derive(Default)]
pub struct InMemoryDb {
    tables: RwLock<Tables>,
}

impl InMemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    async fn finish(
        &self,
        report_id: Uuid,
        apply: impl FnOnce(&mut ResearchReport) + Send,
    ) -> PortResult<ResearchReport> {
        let mut tables = self.tables.write().await;
        let report = tables
            .reports
            .iter_mut()
            .find(|r| r.id == report_id)
            .ok_or_else(|| PortError::NotFound(format!("Research report {} not found", report_id)))?;
        if report.summary.is_some() || report.error.is_some() {
            return Err(PortError::Conflict(format!(
                "Research report {} is not pending",
                report_id
            )));
        }
        apply(report);
        Ok(report.clone())
    }
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn create_user(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|c| c.user.email == email) {
            return Err(PortError::Conflict(format!("User {} already exists", email)));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        tables.users.insert(
            user.id,
            UserCredentials {
                user: user.clone(),
                hashed_password: hashed_password.to_string(),
            },
        );
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.tables
            .read()
            .await
            .users
            .values()
            .find(|c| c.user.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.tables
            .read()
            .await
            .users
            .get(&user_id)
            .map(|c| c.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn create_report(&self, report: &ResearchReport) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&report.user_id) {
            return Err(PortError::NotFound(format!("User {} not found", report.user_id)));
        }
        tables.reports.push(report.clone());
        Ok(())
    }

    async fn get_report(&self, report_id: Uuid) -> PortResult<ResearchReport> {
        self.tables
            .read()
            .await
            .reports
            .iter()
            .find(|r| r.id == report_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Research report {} not found", report_id)))
    }

    async fn complete_report(
        &self,
        report_id: Uuid,
        research: &GeneratedResearch,
    ) -> PortResult<ResearchReport> {
        self.finish(report_id, |r| {
            r.summary = Some(research.summary.clone());
            r.sections = research.sections.clone();
            r.sources = research.sources.clone();
            r.report_json = Some(research.raw.clone());
        })
        .await
    }

    async fn fail_report(&self, report_id: Uuid, error: &str) -> PortResult<ResearchReport> {
        self.finish(report_id, |r| r.error = Some(error.to_string())).await
    }

    async fn list_reports_for_user(&self, user_id: Uuid) -> PortResult<Vec<ResearchReport>> {
        Ok(self
            .tables
            .read()
            .await
            .reports
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }
}
