//! services/api/src/web/rest.rs
//!
//! Service-level endpoints and the master definition for the OpenAPI
//! specification.

use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

use crate::web::{auth, research, users};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        root_handler,
        health_handler,
        auth::register_handler,
        auth::token_handler,
        users::me_handler,
        users::get_user_handler,
        research::submit_research_handler,
        research::history_handler,
        research::status_handler,
        research::get_report_handler,
        research::pdf_handler,
    ),
    components(
        schemas(
            MessageResponse,
            HealthResponse,
            auth::RegisterRequest,
            auth::TokenRequest,
            auth::TokenResponse,
            auth::UserResponse,
            research::ResearchRequest,
            research::ResearchResponse,
            research::StatusResponse,
            research::SectionBody,
            research::SourceBody,
            research::ReportResponse,
            research::HistoryEntry,
            research::HistoryResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Libre Research API", description = "Topic research reports generated by an LLM, with PDF export.")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

//=========================================================================================
// Service Endpoints
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// GET / - Welcome message
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service is up", body = MessageResponse))
)]
pub async fn root_handler() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Welcome to the Libre Research API".to_string(),
    })
}

/// GET /health - Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}
