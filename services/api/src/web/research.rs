//! services/api/src/web/research.rs
//!
//! Research report endpoints. Submission returns `202 Accepted` right after the
//! pending report is stored; generation then runs on a detached task and
//! clients poll `/status`.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use libre_research_core::domain::{
    ReportSection, ReportSummary, ResearchReport, SourceReference, User,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::parse_id;
use crate::web::state::AppState;

/// Seconds a client should expect to wait before polling pays off.
pub const ESTIMATED_SECONDS: u32 = 60;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct ResearchRequest {
    pub topic: String,
    #[serde(default)]
    pub additional_context: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ResearchResponse {
    pub research_id: Uuid,
    pub status: String,
    pub estimated_time: u32,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct SectionBody {
    pub title: String,
    pub content: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct SourceBody {
    pub title: String,
    pub url: Option<String>,
    pub snippet: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ReportResponse {
    pub id: Uuid,
    pub topic: String,
    pub additional_context: Option<String>,
    pub status: String,
    pub summary: String,
    pub sections: Vec<SectionBody>,
    pub sources: Vec<SourceBody>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub topic: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    pub researches: Vec<HistoryEntry>,
}

impl From<ReportSection> for SectionBody {
    fn from(s: ReportSection) -> Self {
        Self {
            title: s.title,
            content: s.content,
        }
    }
}

impl From<SourceReference> for SourceBody {
    fn from(s: SourceReference) -> Self {
        Self {
            title: s.title,
            url: s.url,
            snippet: s.snippet,
        }
    }
}

impl From<ResearchReport> for ReportResponse {
    fn from(report: ResearchReport) -> Self {
        let status = report.status().as_str().to_string();
        Self {
            id: report.id,
            topic: report.topic,
            additional_context: report.additional_context,
            status,
            summary: report.summary.unwrap_or_default(),
            sections: report.sections.into_iter().map(Into::into).collect(),
            sources: report.sources.into_iter().map(Into::into).collect(),
            created_at: report.created_at,
        }
    }
}

impl From<ReportSummary> for HistoryEntry {
    fn from(s: ReportSummary) -> Self {
        Self {
            id: s.id,
            topic: s.topic,
            status: s.status.as_str().to_string(),
            created_at: s.created_at,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/research/ - Submit a topic for research
#[utoipa::path(
    post,
    path = "/api/research/",
    tag = "research",
    security(("bearer" = [])),
    request_body = ResearchRequest,
    responses(
        (status = 202, description = "Research accepted", body = ResearchResponse),
        (status = 400, description = "Empty or overlong topic"),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn submit_research_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(req): Json<ResearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .reports
        .submit(user.id, &req.topic, req.additional_context.as_deref())
        .await?;

    let response = ResearchResponse {
        research_id: report.id,
        status: report.status().as_str().to_string(),
        estimated_time: ESTIMATED_SECONDS,
    };

    // The spawned task is the only writer of the report from here on.
    let reports = state.reports.clone();
    tokio::spawn(async move {
        if let Err(e) = reports.generate(&report).await {
            error!(report_id = %report.id, "Failed to record research outcome: {}", e);
        }
    });

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// GET /api/research/history - The caller's reports, newest first
#[utoipa::path(
    get,
    path = "/api/research/history",
    tag = "research",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Research history", body = HistoryResponse),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let researches = state
        .reports
        .history(user.id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(HistoryResponse { researches }))
}

/// GET /api/research/{id}/status - Poll a report's lifecycle state
#[utoipa::path(
    get,
    path = "/api/research/{id}/status",
    tag = "research",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Research report id")),
    responses(
        (status = 200, description = "Current status", body = StatusResponse),
        (status = 404, description = "Research report not found")
    )
)]
pub async fn status_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let view = state.reports.get_status(parse_id(&id)?, user.id).await?;
    Ok(Json(StatusResponse {
        status: view.status.as_str().to_string(),
        error: view.error,
    }))
}

/// GET /api/research/{id} - Fetch a completed report
#[utoipa::path(
    get,
    path = "/api/research/{id}",
    tag = "research",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Research report id")),
    responses(
        (status = 200, description = "Completed report", body = ReportResponse),
        (status = 404, description = "Research report not found"),
        (status = 409, description = "Research is still in progress"),
        (status = 502, description = "Research generation failed")
    )
)]
pub async fn get_report_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<ReportResponse>, ApiError> {
    let report = state.reports.get_report(parse_id(&id)?, user.id).await?;
    Ok(Json(report.into()))
}

/// GET /api/research/{id}/pdf - Download a completed report as a PDF
#[utoipa::path(
    get,
    path = "/api/research/{id}/pdf",
    tag = "research",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Research report id")),
    responses(
        (status = 200, description = "PDF attachment", body = Vec<u8>, content_type = "application/pdf"),
        (status = 404, description = "Research report not found"),
        (status = 409, description = "Research is still in progress"),
        (status = 502, description = "Research generation failed")
    )
)]
pub async fn pdf_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state.reports.render_pdf(parse_id(&id)?, user.id).await?;
    let disposition = format!("attachment; filename=\"{}\"", document.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes,
    ))
}
