use crate::api::AppState;
use crate::error::AppError;
use axum::extract::State;
use axum::Json;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready only when the database answers.
pub async fn ready(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let _: (i64,) = sqlx::query_as("SELECT 1")
        .fetch_one(state.repo.pool())
        .await?;
    Ok(Json(serde_json::json!({"status": "ready"})))
}
