//! GSec deal endpoints.

use crate::api::AppState;
use crate::domain::{GsecDeal, Principal};
use crate::error::AppError;
use crate::lifecycle::{GsecStatusPatch, NewGsecDeal};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

pub async fn create_gsec(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<NewGsecDeal>,
) -> Result<Json<GsecDeal>, AppError> {
    let deal = state.deals.create_gsec(payload, &principal).await?;
    Ok(Json(deal))
}

pub async fn get_gsec(
    State(state): State<AppState>,
    Path(deal_number): Path<String>,
) -> Result<Json<GsecDeal>, AppError> {
    let deal = state
        .repo
        .get_gsec(&deal_number)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("GSec deal {} not found", deal_number)))?;
    Ok(Json(deal))
}

pub async fn update_gsec_status(
    State(state): State<AppState>,
    Path(deal_number): Path<String>,
    principal: Principal,
    Json(patch): Json<GsecStatusPatch>,
) -> Result<Json<GsecDeal>, AppError> {
    let deal = state
        .deals
        .update_gsec_status(&deal_number, patch, &principal)
        .await?;
    Ok(Json(deal))
}

pub async fn recent_gsec(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<GsecDeal>>, AppError> {
    let limit = query.limit.unwrap_or(state.config.recent_deals_limit);
    if limit <= 0 {
        return Err(AppError::Validation("limit must be positive".to_string()));
    }
    let deals = state.repo.recent_gsec(limit).await?;
    Ok(Json(deals))
}
