use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use postboard_types::api::CreateUserRequest;

use crate::error::ApiError;
use crate::state::{AppState, blocking};

/// GET /api/users
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let users = blocking(&state, |db| db.list_users()).await?;
    Ok(Json(users))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;

    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("User name is required.".into()));
    }

    let user = blocking(&state, move |db| db.create_user(&name))
        .await?
        .ok_or_else(|| ApiError::Conflict("User with this name already exists.".into()))?;

    info!("Created user {} ({})", user.name, user.id);
    Ok((StatusCode::CREATED, Json(user)))
}
