//! End-of-day batch endpoint.

use crate::api::AppState;
use crate::domain::{Action, Principal};
use crate::error::AppError;
use crate::lifecycle::EodResult;
use axum::extract::State;
use axum::Json;

/// Run the EOD batch. Admin only; a second call while one is running gets a
/// conflict instead of overlapping.
pub async fn run_eod(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<EodResult>, AppError> {
    if !principal.can(Action::RunEod) {
        return Err(AppError::Permission(
            "only admins can run the EOD batch".to_string(),
        ));
    }
    let result = state.eod.run().await?;
    Ok(Json(result))
}
