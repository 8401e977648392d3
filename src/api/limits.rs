//! Counterparty limit status endpoint.

use crate::api::AppState;
use crate::domain::{CounterpartyType, Currency, Decimal, ProductType};
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitStatusQuery {
    pub counterparty_id: i64,
    pub counterparty_type: String,
    pub product_type: String,
    pub currency: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitStatus {
    pub counterparty_id: i64,
    pub counterparty_type: CounterpartyType,
    pub product_type: ProductType,
    pub currency: Currency,
    pub configured: bool,
    pub product_limit: Decimal,
    pub overall_limit: Decimal,
    pub current_product_exposure: Decimal,
    pub current_overall_exposure: Decimal,
}

/// Current exposure against the configured ceilings, both dimensions.
pub async fn get_limit_status(
    State(state): State<AppState>,
    Query(query): Query<LimitStatusQuery>,
) -> Result<Json<LimitStatus>, AppError> {
    let counterparty_type = CounterpartyType::parse(&query.counterparty_type).ok_or_else(|| {
        AppError::Validation(format!(
            "invalid counterparty type: {}",
            query.counterparty_type
        ))
    })?;
    let product_type = ProductType::parse(&query.product_type).ok_or_else(|| {
        AppError::Validation(format!("invalid product type: {}", query.product_type))
    })?;
    let currency = Currency::new(query.currency);

    let (limits, exposure) = state
        .repo
        .limit_status(query.counterparty_id, counterparty_type, product_type, &currency)
        .await?;

    let (configured, product_limit, overall_limit) = match &limits {
        Some(limits) => (
            true,
            limits.product_limit(product_type),
            limits.overall_exposure_limit,
        ),
        None => (false, Decimal::zero(), Decimal::zero()),
    };

    Ok(Json(LimitStatus {
        counterparty_id: query.counterparty_id,
        counterparty_type,
        product_type,
        currency,
        configured,
        product_limit,
        overall_limit,
        current_product_exposure: exposure.product,
        current_overall_exposure: exposure.overall,
    }))
}
