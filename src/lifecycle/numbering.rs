//! Deal-number issuance.
//!
//! Generic and GSec deals take `{YYYYMMDD}{4 random digits}` with bounded
//! collision retries; money-market deals take `{YYYYMMDD}{product}{4-digit
//! sequence}` where the sequence continues from the highest number already
//! issued for that date and product. Both run on the caller's open
//! transaction, and the deal-number UNIQUE constraints reject any number a
//! concurrent writer slips in between the check and the insert.

use crate::db::repo::{deal_number_exists_tx, max_money_market_sequence_tx};
use crate::domain::DealNumber;
use crate::error::AppError;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteConnection;
use tracing::warn;
use uuid::Uuid;

/// Collision retries before giving up.
pub const MAX_ATTEMPTS: u32 = 10;

fn random_suffix() -> u32 {
    (Uuid::new_v4().as_u128() % 10_000) as u32
}

/// Allocate a date-plus-random deal number unique across the deal tables.
pub async fn generate_deal_number(
    conn: &mut SqliteConnection,
    date: NaiveDate,
) -> Result<DealNumber, AppError> {
    let prefix = date.format("%Y%m%d").to_string();

    for attempt in 1..=MAX_ATTEMPTS {
        let candidate = format!("{}{:04}", prefix, random_suffix());
        if !deal_number_exists_tx(conn, &candidate).await? {
            return Ok(DealNumber::new(candidate));
        }
        warn!(candidate, attempt, "Deal number collision, regenerating");
    }

    Err(AppError::NumberGenerationExhausted {
        attempts: MAX_ATTEMPTS,
    })
}

/// Allocate the next product-scoped money-market deal number for a date.
pub async fn generate_money_market_number(
    conn: &mut SqliteConnection,
    trade_date: NaiveDate,
    product_code: &str,
) -> Result<DealNumber, AppError> {
    let max_seq = max_money_market_sequence_tx(conn, trade_date, product_code).await?;
    let next_seq = max_seq + 1;
    if next_seq > 9_999 {
        return Err(AppError::NumberGenerationExhausted {
            attempts: MAX_ATTEMPTS,
        });
    }

    let number = format!(
        "{}{}{:04}",
        trade_date.format("%Y%m%d"),
        product_code,
        next_seq
    );
    Ok(DealNumber::new(number))
}
