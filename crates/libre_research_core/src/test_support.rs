//! Shared fakes for the core service tests.

use crate::domain::{GeneratedResearch, ResearchReport, User, UserCredentials};
use crate::ports::{
    DatabaseService, PasswordService, PortError, PortResult, ReportRenderingService,
    ResearchGenerationService, TokenService,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Users and reports in insertion order.
#[derive(Default)]
pub struct FakeDb {
    users: Mutex<Vec<UserCredentials>>,
    reports: Mutex<Vec<ResearchReport>>,
    completion_error: Option<PortError>,
}

impl FakeDb {
    /// A store whose `complete_report` always fails with `error`.
    pub fn rejecting_completions(error: PortError) -> Self {
        Self {
            completion_error: Some(error),
            ..Self::default()
        }
    }

    pub fn report_count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }

    fn finish(
        &self,
        report_id: Uuid,
        apply: impl FnOnce(&mut ResearchReport),
    ) -> PortResult<ResearchReport> {
        let mut reports = self.reports.lock().unwrap();
        let report = reports
            .iter_mut()
            .find(|r| r.id == report_id)
            .ok_or_else(|| PortError::NotFound(report_id.to_string()))?;
        if report.summary.is_some() || report.error.is_some() {
            return Err(PortError::Conflict("already finished".to_string()));
        }
        apply(report);
        Ok(report.clone())
    }
}

#[async_trait]
impl DatabaseService for FakeDb {
    async fn create_user(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.user.email == email) {
            return Err(PortError::Conflict(email.to_string()));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        users.push(UserCredentials {
            user: user.clone(),
            hashed_password: hashed_password.to_string(),
        });
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(email.to_string()))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user.id == user_id)
            .map(|u| u.user.clone())
            .ok_or_else(|| PortError::NotFound(user_id.to_string()))
    }

    async fn create_report(&self, report: &ResearchReport) -> PortResult<()> {
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }

    async fn get_report(&self, report_id: Uuid) -> PortResult<ResearchReport> {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == report_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(report_id.to_string()))
    }

    async fn complete_report(
        &self,
        report_id: Uuid,
        research: &GeneratedResearch,
    ) -> PortResult<ResearchReport> {
        if let Some(e) = &self.completion_error {
            return Err(e.clone());
        }
        self.finish(report_id, |r| {
            r.summary = Some(research.summary.clone());
            r.sections = research.sections.clone();
            r.sources = research.sources.clone();
            r.report_json = Some(research.raw.clone());
        })
    }

    async fn fail_report(&self, report_id: Uuid, error: &str) -> PortResult<ResearchReport> {
        self.finish(report_id, |r| r.error = Some(error.to_string()))
    }

    async fn list_reports_for_user(&self, user_id: Uuid) -> PortResult<Vec<ResearchReport>> {
        Ok(self
            .reports
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }
}

type Calls = Arc<Mutex<Vec<(String, Option<String>)>>>;

/// Returns a fixed answer and records what it was asked.
pub struct FakeGenerator {
    result: PortResult<String>,
    calls: Calls,
}

impl FakeGenerator {
    pub fn succeeding(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
            calls: Calls::default(),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(PortError::Upstream(message.to_string())),
            calls: Calls::default(),
        }
    }

    pub fn calls(&self) -> Calls {
        self.calls.clone()
    }
}

#[async_trait]
impl ResearchGenerationService for FakeGenerator {
    async fn generate_research(
        &self,
        topic: &str,
        additional_context: Option<&str>,
    ) -> PortResult<String> {
        self.calls
            .lock()
            .unwrap()
            .push((topic.to_string(), additional_context.map(str::to_string)));
        self.result.clone()
    }
}

pub struct FakePasswords;

impl PasswordService for FakePasswords {
    fn hash_password(&self, password: &str) -> PortResult<String> {
        Ok(format!("hashed:{}", password))
    }

    fn verify_password(&self, password: &str, hashed_password: &str) -> bool {
        hashed_password == format!("hashed:{}", password)
    }
}

/// Tokens are just `token:<user id>`.
pub struct FakeTokens;

impl TokenService for FakeTokens {
    fn issue_token(&self, user: &User) -> PortResult<String> {
        Ok(format!("token:{}", user.id))
    }

    fn verify_token(&self, token: &str) -> PortResult<Uuid> {
        token
            .strip_prefix("token:")
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or_else(|| PortError::Unauthorized("bad token".to_string()))
    }
}

/// Renders a report as `topic|summary|title|content|...` text.
pub struct TextRenderer;

impl ReportRenderingService for TextRenderer {
    fn render_report(&self, report: &ResearchReport) -> PortResult<Vec<u8>> {
        let mut parts = vec![report.topic.clone(), report.summary.clone().unwrap_or_default()];
        for section in &report.sections {
            parts.push(section.title.clone());
            parts.push(section.content.clone());
        }
        Ok(parts.join("|").into_bytes())
    }
}
