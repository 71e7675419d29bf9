pub mod error;
pub mod messages;
pub mod snapshot;
pub mod state;
pub mod users;

use axum::{
    Json, Router,
    extract::OriginalUri,
    routing::{get, post, put},
};

use postboard_types::api::HealthResponse;

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// All REST routes, nested under `/api`. Unmatched paths get a JSON 404.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        .route(
            "/messages/{id}",
            put(messages::update_message).delete(messages::delete_message),
        )
        .route("/import", post(snapshot::import_snapshot))
        .with_state(state);

    Router::new().nest("/api", api).fallback(not_found)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".into(),
        message: "Postboard backend is running".into(),
    })
}

async fn not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::NotFound(format!("Route {} not found.", uri))
}
