//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how each
//! variant is reported over HTTP.

use crate::config::ConfigError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use libre_research_core::ports::PortError;
use serde_json::json;
use tracing::error;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core services or ports.
    #[error(transparent)]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error from running the schema migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Port(e) => match e {
                PortError::Validation(_) => StatusCode::BAD_REQUEST,
                PortError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                PortError::NotFound(_) => StatusCode::NOT_FOUND,
                PortError::Conflict(_) | PortError::NotReady => StatusCode::CONFLICT,
                PortError::GenerationFailed(_) | PortError::Upstream(_) => StatusCode::BAD_GATEWAY,
                PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Upstream failures stay visible; anything else server-side is opaque.
        let opaque = status.is_server_error()
            && !matches!(
                self,
                ApiError::Port(PortError::GenerationFailed(_) | PortError::Upstream(_))
            );
        let detail = if opaque {
            error!("Request failed: {:?}", self);
            "Internal server error".to_string()
        } else {
            if status.is_server_error() {
                error!("Request failed: {}", self);
            }
            self.to_string()
        };

        let body = Json(json!({ "detail": detail }));
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_domain_errors_to_statuses() {
        let cases = [
            (PortError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (PortError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (PortError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (PortError::Conflict("x".into()), StatusCode::CONFLICT),
            (PortError::NotReady, StatusCode::CONFLICT),
            (PortError::GenerationFailed("x".into()), StatusCode::BAD_GATEWAY),
            (PortError::Upstream("x".into()), StatusCode::BAD_GATEWAY),
            (PortError::Unexpected("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn unauthorized_carries_bearer_challenge() {
        let response = ApiError::from(PortError::Unauthorized("nope".into())).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    async fn detail_of(err: ApiError) -> String {
        let body = axum::body::to_bytes(err.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        value["detail"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn internal_details_are_not_leaked() {
        let response = ApiError::Internal("db password is hunter2".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            detail_of(ApiError::Internal("db password is hunter2".into())).await,
            "Internal server error"
        );
    }

    #[tokio::test]
    async fn unexpected_storage_errors_are_not_leaked() {
        let err = ApiError::from(PortError::Unexpected(
            "relation \"users\" does not exist".into(),
        ));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            detail_of(ApiError::from(PortError::Unexpected(
                "relation \"users\" does not exist".into()
            )))
            .await,
            "Internal server error"
        );
    }

    #[tokio::test]
    async fn upstream_failures_keep_their_detail() {
        let detail = detail_of(ApiError::from(PortError::Upstream("model unavailable".into()))).await;
        assert!(detail.contains("model unavailable"));
    }
}
