//! crates/libre_research_core/src/research.rs
//!
//! The research report lifecycle: submission, the single generation step,
//! owner-scoped reads, and rendering.

use crate::domain::{
    RenderedDocument, ReportStatus, ReportSummary, ResearchReport, StatusView,
};
use crate::parse::parse_research;
use crate::ports::{
    DatabaseService, PortError, PortResult, ReportRenderingService, ResearchGenerationService,
};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

pub const MAX_TOPIC_CHARS: usize = 500;

/// Orchestrates the report store, the research generator, and the renderer.
#[derive(Clone)]
pub struct ReportService {
    db: Arc<dyn DatabaseService>,
    generator: Arc<dyn ResearchGenerationService>,
    renderer: Arc<dyn ReportRenderingService>,
}

impl ReportService {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        generator: Arc<dyn ResearchGenerationService>,
        renderer: Arc<dyn ReportRenderingService>,
    ) -> Self {
        Self {
            db,
            generator,
            renderer,
        }
    }

    /// Validates the topic and stores a new pending report.
    ///
    /// Generation is a separate step (`generate`) so callers decide whether to
    /// await it or run it detached.
    pub async fn submit(
        &self,
        user_id: Uuid,
        topic: &str,
        additional_context: Option<&str>,
    ) -> PortResult<ResearchReport> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(PortError::Validation("Topic must not be empty".to_string()));
        }
        if topic.chars().count() > MAX_TOPIC_CHARS {
            return Err(PortError::Validation(format!(
                "Topic must be at most {} characters",
                MAX_TOPIC_CHARS
            )));
        }
        let additional_context = additional_context
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let report = ResearchReport::pending(user_id, topic.to_string(), additional_context);
        self.db.create_report(&report).await?;
        info!(report_id = %report.id, %user_id, "Research submitted");
        Ok(report)
    }

    /// Runs the one and only generation attempt for a pending report.
    ///
    /// Any generator, parse or storage failure is recorded on the report; the
    /// returned error is reserved for failures to persist the outcome itself.
    pub async fn generate(&self, report: &ResearchReport) -> PortResult<ResearchReport> {
        let outcome = match self
            .generator
            .generate_research(&report.topic, report.additional_context.as_deref())
            .await
        {
            Ok(text) => parse_research(&text),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(research) => match self.db.complete_report(report.id, &research).await {
                Ok(updated) => {
                    info!(
                        report_id = %report.id,
                        sections = updated.sections.len(),
                        sources = updated.sources.len(),
                        "Research complete"
                    );
                    Ok(updated)
                }
                // Already finished; its outcome stands.
                Err(e @ PortError::Conflict(_)) => Err(e),
                Err(e) => {
                    error!(report_id = %report.id, "Failed to store research: {}", e);
                    self.db.fail_report(report.id, &e.to_string()).await
                }
            },
            Err(e) => {
                error!(report_id = %report.id, "Research generation failed: {}", e);
                self.db.fail_report(report.id, &e.to_string()).await
            }
        }
    }

    pub async fn get_status(&self, report_id: Uuid, user_id: Uuid) -> PortResult<StatusView> {
        let report = self.owned_report(report_id, user_id).await?;
        Ok(StatusView {
            status: report.status(),
            error: report.error,
        })
    }

    /// Fetches a completed report. Pending reports are `NotReady`; failed ones
    /// surface their recorded error.
    pub async fn get_report(&self, report_id: Uuid, user_id: Uuid) -> PortResult<ResearchReport> {
        let report = self.owned_report(report_id, user_id).await?;
        match report.status() {
            ReportStatus::Complete => Ok(report),
            ReportStatus::Pending => Err(PortError::NotReady),
            ReportStatus::Failed => Err(PortError::GenerationFailed(
                report.error.unwrap_or_default(),
            )),
        }
    }

    /// The caller's reports, newest first.
    pub async fn history(&self, user_id: Uuid) -> PortResult<Vec<ReportSummary>> {
        let reports = self.db.list_reports_for_user(user_id).await?;
        Ok(reports.iter().map(ResearchReport::summary_entry).collect())
    }

    pub async fn render_pdf(&self, report_id: Uuid, user_id: Uuid) -> PortResult<RenderedDocument> {
        let report = self.get_report(report_id, user_id).await?;
        let bytes = self.renderer.render_report(&report)?;
        Ok(RenderedDocument {
            file_name: pdf_file_name(&report.topic),
            bytes,
        })
    }

    /// Loads a report, hiding other users' reports behind `NotFound`.
    async fn owned_report(&self, report_id: Uuid, user_id: Uuid) -> PortResult<ResearchReport> {
        let not_found = || PortError::NotFound(format!("Research report {} not found", report_id));
        let report = self.db.get_report(report_id).await.map_err(|e| match e {
            PortError::NotFound(_) => not_found(),
            other => other,
        })?;
        if report.user_id != user_id {
            return Err(not_found());
        }
        Ok(report)
    }
}

/// `LibreResearch-<topic>.pdf`, with the topic reduced to filename-safe ASCII.
pub fn pdf_file_name(topic: &str) -> String {
    let mut stem: String = topic
        .trim()
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .take(80)
        .collect();
    if stem.is_empty() {
        stem = "Research_Report".to_string();
    }
    format!("LibreResearch-{}.pdf", stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeDb, FakeGenerator, TextRenderer};
    use pretty_assertions::assert_eq;

    const RESPONSE: &str = r#"{"summary": "S", "sections": [{"title": "Intro", "content": "body"}], "sources": [{"title": "Ref", "url": "https://example.com"}]}"#;

    fn service(generator: FakeGenerator) -> (ReportService, Arc<FakeDb>) {
        let db = Arc::new(FakeDb::default());
        let service = ReportService::new(db.clone(), Arc::new(generator), Arc::new(TextRenderer));
        (service, db)
    }

    #[tokio::test]
    async fn report_is_not_ready_until_generated() {
        let (service, _) = service(FakeGenerator::succeeding(RESPONSE));
        let user = Uuid::new_v4();
        let report = service.submit(user, "T", None).await.unwrap();

        let status = service.get_status(report.id, user).await.unwrap();
        assert_eq!(status.status, ReportStatus::Pending);
        assert_eq!(service.get_report(report.id, user).await.unwrap_err(), PortError::NotReady);

        service.generate(&report).await.unwrap();

        let fetched = service.get_report(report.id, user).await.unwrap();
        assert_eq!(fetched.summary.as_deref(), Some("S"));
        assert_eq!(fetched.sections[0].title, "Intro");
        assert_eq!(fetched.sections[0].content, "body");
        assert_eq!(fetched.sources[0].url.as_deref(), Some("https://example.com"));
        assert_eq!(fetched.report_json.as_ref().unwrap()["summary"], "S");
    }

    #[tokio::test]
    async fn upstream_failure_marks_report_failed_for_good() {
        let (service, _) = service(FakeGenerator::failing("quota exceeded"));
        let user = Uuid::new_v4();
        let report = service.submit(user, "T", None).await.unwrap();

        let failed = service.generate(&report).await.unwrap();
        assert_eq!(failed.status(), ReportStatus::Failed);

        for _ in 0..2 {
            let status = service.get_status(report.id, user).await.unwrap();
            assert_eq!(status.status, ReportStatus::Failed);
            assert!(status.error.unwrap().contains("quota exceeded"));
            let err = service.get_report(report.id, user).await.unwrap_err();
            assert!(matches!(err, PortError::GenerationFailed(_)));
        }
    }

    #[tokio::test]
    async fn malformed_response_marks_report_failed() {
        let (service, _) = service(FakeGenerator::succeeding("no json here"));
        let user = Uuid::new_v4();
        let report = service.submit(user, "T", None).await.unwrap();
        let failed = service.generate(&report).await.unwrap();
        assert_eq!(failed.status(), ReportStatus::Failed);
    }

    #[tokio::test]
    async fn storage_failure_on_completion_marks_report_failed() {
        let db = Arc::new(FakeDb::rejecting_completions(PortError::Unexpected(
            "invalid byte sequence for encoding UTF8: 0x00".to_string(),
        )));
        let service = ReportService::new(
            db.clone(),
            Arc::new(FakeGenerator::succeeding(RESPONSE)),
            Arc::new(TextRenderer),
        );
        let user = Uuid::new_v4();
        let report = service.submit(user, "T", None).await.unwrap();

        let failed = service.generate(&report).await.unwrap();
        assert_eq!(failed.status(), ReportStatus::Failed);

        let status = service.get_status(report.id, user).await.unwrap();
        assert_eq!(status.status, ReportStatus::Failed);
        assert!(status.error.unwrap().contains("0x00"));
    }

    #[tokio::test]
    async fn finished_report_cannot_be_generated_again() {
        let (service, _) = service(FakeGenerator::succeeding(RESPONSE));
        let user = Uuid::new_v4();
        let report = service.submit(user, "T", None).await.unwrap();
        service.generate(&report).await.unwrap();

        let err = service.generate(&report).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
        let status = service.get_status(report.id, user).await.unwrap();
        assert_eq!(status.status, ReportStatus::Complete);
    }

    #[tokio::test]
    async fn other_users_cannot_see_a_report() {
        let (service, _) = service(FakeGenerator::succeeding(RESPONSE));
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let report = service.submit(owner, "T", None).await.unwrap();
        service.generate(&report).await.unwrap();

        assert!(matches!(
            service.get_status(report.id, intruder).await.unwrap_err(),
            PortError::NotFound(_)
        ));
        assert!(matches!(
            service.get_report(report.id, intruder).await.unwrap_err(),
            PortError::NotFound(_)
        ));
        assert!(matches!(
            service.render_pdf(report.id, intruder).await.unwrap_err(),
            PortError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn submission_validates_topic() {
        let (service, db) = service(FakeGenerator::succeeding(RESPONSE));
        let user = Uuid::new_v4();
        assert!(matches!(
            service.submit(user, "   ", None).await.unwrap_err(),
            PortError::Validation(_)
        ));
        let long = "x".repeat(MAX_TOPIC_CHARS + 1);
        assert!(matches!(
            service.submit(user, &long, None).await.unwrap_err(),
            PortError::Validation(_)
        ));
        assert_eq!(db.report_count(), 0);
    }

    #[tokio::test]
    async fn submission_forwards_trimmed_context() {
        let generator = FakeGenerator::succeeding(RESPONSE);
        let seen = generator.calls();
        let (service, _) = service(generator);
        let report = service
            .submit(Uuid::new_v4(), "  Rust  ", Some("  for beginners "))
            .await
            .unwrap();
        assert_eq!(report.topic, "Rust");
        service.generate(&report).await.unwrap();
        assert_eq!(
            seen.lock().unwrap().clone(),
            vec![("Rust".to_string(), Some("for beginners".to_string()))]
        );
    }

    #[tokio::test]
    async fn history_lists_only_the_callers_reports() {
        let (service, _) = service(FakeGenerator::succeeding(RESPONSE));
        let user = Uuid::new_v4();
        service.submit(user, "first", None).await.unwrap();
        service.submit(user, "second", None).await.unwrap();
        service.submit(Uuid::new_v4(), "someone else", None).await.unwrap();

        let history = service.history(user).await.unwrap();
        let topics: Vec<_> = history.iter().map(|h| h.topic.as_str()).collect();
        assert_eq!(topics, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn render_pdf_names_file_after_topic() {
        let (service, _) = service(FakeGenerator::succeeding(RESPONSE));
        let user = Uuid::new_v4();
        let report = service.submit(user, "Rust & WebAssembly", None).await.unwrap();
        service.generate(&report).await.unwrap();

        let doc = service.render_pdf(report.id, user).await.unwrap();
        assert_eq!(doc.file_name, "LibreResearch-Rust__WebAssembly.pdf");
        assert_eq!(String::from_utf8(doc.bytes).unwrap(), "Rust & WebAssembly|S|Intro|body");
    }

    #[test]
    fn file_name_falls_back_for_unprintable_topics() {
        assert_eq!(pdf_file_name("日本語"), "LibreResearch-Research_Report.pdf");
    }
}
