//! Generic transaction endpoints.

use crate::api::AppState;
use crate::domain::{Deal, Principal};
use crate::error::AppError;
use crate::lifecycle::{NewTransaction, TransactionPatch};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

pub async fn create_transaction(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<NewTransaction>,
) -> Result<Json<Deal>, AppError> {
    let deal = state.deals.create_transaction(payload, &principal).await?;
    Ok(Json(deal))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(deal_number): Path<String>,
) -> Result<Json<Deal>, AppError> {
    let deal = state
        .repo
        .get_transaction(&deal_number)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("transaction {} not found", deal_number)))?;
    Ok(Json(deal))
}

pub async fn update_transaction(
    State(state): State<AppState>,
    Path(deal_number): Path<String>,
    principal: Principal,
    Json(patch): Json<TransactionPatch>,
) -> Result<Json<Deal>, AppError> {
    let deal = state
        .deals
        .update_transaction(&deal_number, patch, &principal)
        .await?;
    Ok(Json(deal))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    Path(deal_number): Path<String>,
    _principal: Principal,
) -> Result<Json<serde_json::Value>, AppError> {
    state.deals.delete_transaction(&deal_number).await?;
    Ok(Json(serde_json::json!({"deleted": deal_number})))
}

pub async fn recent_transactions(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<Deal>>, AppError> {
    let limit = query.limit.unwrap_or(state.config.recent_deals_limit);
    if limit <= 0 {
        return Err(AppError::Validation("limit must be positive".to_string()));
    }
    let deals = state.repo.recent_transactions(limit).await?;
    Ok(Json(deals))
}
