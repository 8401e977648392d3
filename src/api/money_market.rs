//! Money-market deal endpoints.

use crate::api::AppState;
use crate::domain::{MoneyMarketDeal, Principal};
use crate::error::AppError;
use crate::lifecycle::NewMoneyMarketDeal;
use axum::extract::State;
use axum::Json;

pub async fn create_deal(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<NewMoneyMarketDeal>,
) -> Result<Json<MoneyMarketDeal>, AppError> {
    let deal = state.deals.create_money_market(payload, &principal).await?;
    Ok(Json(deal))
}
