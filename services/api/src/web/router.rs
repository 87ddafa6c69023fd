//! services/api/src/web/router.rs
//!
//! Assembles the HTTP routes. Everything under `/api/users` and `/api/research`
//! sits behind `require_auth`.

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::web::{
    auth::{register_handler, token_handler},
    middleware::require_auth,
    research::{
        get_report_handler, history_handler, pdf_handler, status_handler,
        submit_research_handler,
    },
    rest::{health_handler, root_handler, ApiDoc},
    state::AppState,
    users::{get_user_handler, me_handler},
};

/// Builds the application router, including the Swagger UI.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/token", post(token_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/users/me", get(me_handler))
        .route("/api/users/{id}", get(get_user_handler))
        .route("/api/research", post(submit_research_handler))
        .route("/api/research/", post(submit_research_handler))
        .route("/api/research/history", get(history_handler))
        .route("/api/research/{id}", get(get_report_handler))
        .route("/api/research/{id}/status", get(status_handler))
        .route("/api/research/{id}/pdf", get(pdf_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
