pub mod coupons;
pub mod deals;
pub mod eod;
pub mod gsec;
pub mod health;
pub mod ledger;
pub mod limits;
pub mod money_market;
pub mod system_day;

use crate::config::Config;
use crate::db::Repository;
use crate::domain::Principal;
use crate::error::AppError;
use crate::lifecycle::{DealService, EodRunner};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub deals: Arc<DealService>,
    pub eod: Arc<EodRunner>,
}

impl AppState {
    pub fn new(
        repo: Arc<Repository>,
        config: Config,
        deals: Arc<DealService>,
        eod: Arc<EodRunner>,
    ) -> Self {
        Self {
            repo,
            config,
            deals,
            eod,
        }
    }
}

/// The auth collaborator upstream places the caller's identity and role in
/// the `x-user-data` header as JSON; requests without it are anonymous and
/// rejected here.
#[axum::async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get("x-user-data")
            .ok_or_else(|| AppError::Permission("missing x-user-data header".to_string()))?;
        serde_json::from_slice(raw.as_bytes())
            .map_err(|e| AppError::Permission(format!("invalid x-user-data header: {}", e)))
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/transactions", post(deals::create_transaction))
        .route("/v1/transactions/recent", get(deals::recent_transactions))
        .route(
            "/v1/transactions/:deal_number",
            get(deals::get_transaction)
                .patch(deals::update_transaction)
                .delete(deals::delete_transaction),
        )
        .route("/v1/gsec", post(gsec::create_gsec))
        .route("/v1/gsec/recent", get(gsec::recent_gsec))
        .route(
            "/v1/gsec/:deal_number",
            get(gsec::get_gsec).patch(gsec::update_gsec_status),
        )
        .route("/v1/money-market", post(money_market::create_deal))
        .route("/v1/isins", post(coupons::create_isin))
        .route("/v1/coupons/:isin", get(coupons::get_coupon_dates))
        .route("/v1/limits/status", get(limits::get_limit_status))
        .route("/v1/ledger", get(ledger::general_ledger))
        .route("/v1/ledger/profit-and-loss", get(ledger::profit_and_loss))
        .route("/v1/ledger/balance-sheet", get(ledger::balance_sheet))
        .route(
            "/v1/system-day",
            get(system_day::get_system_day).put(system_day::set_system_day),
        )
        .route("/v1/eod", post(eod::run_eod))
        .layer(cors)
        .with_state(state)
}
