//! ISIN master and coupon-date endpoints.

use crate::api::AppState;
use crate::db::repo::IsinRecord;
use crate::domain::{CouponScheduleEntry, Currency, Decimal, Isin, Principal};
use crate::engine;
use crate::error::AppError;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIsin {
    pub isin: String,
    pub issuer: String,
    pub issue_date: NaiveDate,
    pub maturity_date: NaiveDate,
    pub coupon_rate: Decimal,
    pub series: Option<String>,
    pub day_basis: Option<i64>,
    pub currency: Option<String>,
    pub face_value: Option<Decimal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IsinCreated {
    pub isin: String,
    pub schedule: Vec<CouponScheduleEntry>,
}

/// Register an ISIN and generate its coupon schedule once; the schedule is
/// immutable afterward.
pub async fn create_isin(
    State(state): State<AppState>,
    _principal: Principal,
    Json(payload): Json<NewIsin>,
) -> Result<Json<IsinCreated>, AppError> {
    if payload.isin.trim().is_empty() {
        return Err(AppError::Validation("isin is required".to_string()));
    }
    if payload.maturity_date <= payload.issue_date {
        return Err(AppError::Validation(
            "maturityDate must be after issueDate".to_string(),
        ));
    }
    if state.repo.get_isin(&payload.isin).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "ISIN {} already registered",
            payload.isin
        )));
    }

    let face_value = payload.face_value.unwrap_or_else(Decimal::hundred);
    let schedule = engine::generate_coupon_schedule(
        payload.issue_date,
        payload.maturity_date,
        payload.coupon_rate,
        face_value,
    );

    let record = IsinRecord {
        isin: Isin::new(payload.isin.clone()),
        issuer: payload.issuer,
        issue_date: payload.issue_date,
        maturity_date: payload.maturity_date,
        coupon_rate: payload.coupon_rate,
        series: payload.series,
        day_basis: payload.day_basis.unwrap_or(365),
        currency: Currency::new(
            payload
                .currency
                .unwrap_or_else(|| state.config.default_currency.clone()),
        ),
    };
    state.repo.insert_isin_with_schedule(&record, &schedule).await?;

    Ok(Json(IsinCreated {
        isin: payload.isin,
        schedule,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponDatesQuery {
    pub value_date: NaiveDate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponDates {
    pub isin: String,
    pub value_date: NaiveDate,
    pub previous: NaiveDate,
    pub next: NaiveDate,
}

/// Previous and next coupon dates bracketing a value date.
pub async fn get_coupon_dates(
    State(state): State<AppState>,
    Path(isin): Path<String>,
    Query(query): Query<CouponDatesQuery>,
) -> Result<Json<CouponDates>, AppError> {
    let schedule = state.repo.coupon_schedule(&isin).await?;
    let window = engine::prev_and_next_coupon_date(&schedule, query.value_date)
        .ok_or_else(|| AppError::NotFound(format!("no coupon schedule for ISIN {}", isin)))?;

    Ok(Json(CouponDates {
        isin,
        value_date: query.value_date,
        previous: window.previous,
        next: window.next,
    }))
}
