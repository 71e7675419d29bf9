use axum::{Json, extract::State, response::IntoResponse};
use bytes::Bytes;
use tracing::info;

use postboard_types::Snapshot;
use postboard_types::api::StatusBody;

use crate::error::ApiError;
use crate::state::{AppState, blocking};

/// POST /api/import. The request body is the uploaded export file.
///
/// Replaces the whole persisted data set. Nothing is written unless the
/// upload holds both the `users` and `messages` arrays.
pub async fn import_snapshot(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = Snapshot::parse(&body)?;
    let (users, messages) = (snapshot.users.len(), snapshot.messages.len());

    blocking(&state, move |db| db.replace_snapshot(snapshot)).await?;

    info!("Imported {} users and {} messages", users, messages);
    Ok(Json(StatusBody {
        message: "Data imported successfully.".into(),
    }))
}
