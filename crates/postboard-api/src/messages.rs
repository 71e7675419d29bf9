use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, info};

use postboard_types::MessageId;
use postboard_types::api::{SendMessageRequest, StatusBody, UpdateMessageRequest};

use crate::error::ApiError;
use crate::state::{AppState, blocking};

/// GET /api/messages, oldest first.
pub async fn list_messages(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let messages = blocking(&state, |db| db.list_messages()).await?;
    Ok(Json(messages))
}

/// POST /api/messages
pub async fn send_message(
    State(state): State<AppState>,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;

    let text = req.text.trim().to_string();
    let sender_id = match req.sender_id {
        Some(id) if !text.is_empty() && !id.as_str().is_empty() => id,
        _ => {
            return Err(ApiError::BadRequest(
                "Message text and senderId are required.".into(),
            ));
        }
    };

    let message = blocking(&state, move |db| db.insert_message(&text, &sender_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Sender user not found.".into()))?;

    debug!("Message {} posted by {}", message.id, message.sender_name);
    Ok((StatusCode::CREATED, Json(message)))
}

/// PUT /api/messages/{id}
pub async fn update_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;

    let text = req.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::BadRequest("Message text cannot be empty.".into()));
    }

    let id = MessageId(id);
    let message = blocking(&state, move |db| db.update_message(&id, &text))
        .await?
        .ok_or_else(|| ApiError::NotFound("Message not found.".into()))?;

    debug!("Message {} edited", message.id);
    Ok(Json(message))
}

/// DELETE /api/messages/{id}
pub async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = MessageId(id);
    let target = id.clone();
    let deleted = blocking(&state, move |db| db.delete_message(&target)).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("Message with id {} not found.", id)));
    }

    info!("Message {} deleted", id);
    Ok(Json(StatusBody {
        message: "Message deleted successfully.".into(),
    }))
}
