//! Business-date endpoints.

use crate::api::AppState;
use crate::domain::{Action, Principal};
use crate::error::AppError;
use axum::extract::State;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemDay {
    pub system_day: Option<NaiveDate>,
}

pub async fn get_system_day(State(state): State<AppState>) -> Result<Json<SystemDay>, AppError> {
    let system_day = state.repo.get_system_day().await?;
    Ok(Json(SystemDay { system_day }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSystemDay {
    pub system_day: NaiveDate,
}

/// Set the business date. Admin only; writes are serialized so the date can
/// never double-advance.
pub async fn set_system_day(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<SetSystemDay>,
) -> Result<Json<SystemDay>, AppError> {
    if !principal.can(Action::SetSystemDay) {
        return Err(AppError::Permission(
            "only admins can set the system day".to_string(),
        ));
    }
    state.eod.set_system_day(payload.system_day).await?;
    Ok(Json(SystemDay {
        system_day: Some(payload.system_day),
    }))
}
