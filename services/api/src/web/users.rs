//! services/api/src/web/users.rs

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use libre_research_core::domain::User;
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::auth::UserResponse;
use crate::web::parse_id;
use crate::web::state::AppState;

/// GET /api/users/me - The authenticated caller's profile
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn me_handler(Extension(user): Extension<User>) -> Json<UserResponse> {
    Json(user.into())
}

/// GET /api/users/{id} - Fetch a user profile by id
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user_id = parse_id(&id)?;
    let user = state.auth.get_user(user_id).await?;
    Ok(Json(user.into()))
}
