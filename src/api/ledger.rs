//! General-ledger and statement endpoints.

use crate::api::AppState;
use crate::db::repo::{BalanceSheet, LedgerFilters, ProfitAndLoss};
use crate::domain::LedgerEntry;
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LedgerQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub account_id: Option<i64>,
    pub deal_number: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn general_ledger(
    State(state): State<AppState>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<Vec<LedgerEntry>>, AppError> {
    let filters = LedgerFilters {
        start_date: query.start_date,
        end_date: query.end_date,
        account_id: query.account_id,
        deal_number: query.deal_number,
        limit: query.limit,
        offset: query.offset,
    };
    let entries = state.repo.general_ledger(&filters).await?;
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

pub async fn profit_and_loss(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<ProfitAndLoss>, AppError> {
    if query.end_date < query.start_date {
        return Err(AppError::Validation(
            "endDate must not precede startDate".to_string(),
        ));
    }
    let statement = state
        .repo
        .profit_and_loss(query.start_date, query.end_date)
        .await?;
    Ok(Json(statement))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsOfQuery {
    pub as_of_date: NaiveDate,
}

pub async fn balance_sheet(
    State(state): State<AppState>,
    Query(query): Query<AsOfQuery>,
) -> Result<Json<BalanceSheet>, AppError> {
    let statement = state.repo.balance_sheet(query.as_of_date).await?;
    Ok(Json(statement))
}
