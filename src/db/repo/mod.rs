//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `deals.rs` - generic transaction, GSec, and money-market deal rows
//! - `ledger.rs` - chart of accounts, posting rules, ledger entries, reports
//! - `limits.rs` - counterparty limit rows and exposure sums
//! - `coupons.rs` - ISIN master and coupon schedules
//!
//! Multi-step mutations run inside one sqlx transaction owned by the
//! lifecycle layer; the `*_tx` free functions in the submodules take a
//! `&mut SqliteConnection` so every step shares that transaction.

mod coupons;
mod deals;
mod ledger;
mod limits;

pub use coupons::IsinRecord;
pub use deals::{GsecAccrualRow, MoneyMarketAccrualRow};
pub use ledger::{AccountBalance, BalanceSheet, LedgerFilters, ProfitAndLoss};

pub use deals::{
    deal_number_exists_tx, delete_transaction_tx, get_gsec_tx, get_transaction_tx, insert_gsec_tx,
    insert_money_market_tx, insert_transaction_tx, max_money_market_sequence_tx,
    record_eod_posting_tx, update_gsec_workflow_tx, update_transaction_fields_tx,
    update_transaction_workflow_tx,
};
pub use ledger::{
    account_id_by_code_tx, delete_ledger_entries_for_deal_tx, insert_ledger_lines_tx,
    posting_rule_tx, settlement_account_code_tx,
};
pub use limits::{
    exposure_snapshot_tx, get_counterparty_limits_tx, overall_exposure_tx, product_exposure_tx,
    transaction_product_type_tx,
};

use crate::domain::Decimal;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// The underlying pool, for callers that own their own transactions.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // =========================================================================
    // Balance account operations
    // =========================================================================

    /// Create a balance account and return its id.
    pub async fn create_account(
        &self,
        name: &str,
        opening_balance: Decimal,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO accounts (name, balance) VALUES (?, ?)")
            .bind(name)
            .bind(opening_balance.to_canonical_string())
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Fetch a balance account's current balance.
    pub async fn account_balance(&self, account_id: i64) -> Result<Option<Decimal>, sqlx::Error> {
        let row = sqlx::query("SELECT balance FROM accounts WHERE id = ?")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| parse_decimal_lenient(r.get("balance"), "accounts.balance")))
    }

    // =========================================================================
    // System day operations
    // =========================================================================

    /// Current business date: the latest system_day row.
    pub async fn get_system_day(&self) -> Result<Option<NaiveDate>, sqlx::Error> {
        let row = sqlx::query("SELECT system_date FROM system_day ORDER BY id DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.and_then(|r| parse_date_opt(r.get("system_date"), "system_day.system_date")))
    }

    /// Append a new system-day row; callers serialize through the day lock.
    pub async fn set_system_day(&self, date: NaiveDate) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO system_day (system_date, last_updated) VALUES (?, CURRENT_TIMESTAMP)",
        )
        .bind(date.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Adjust a balance account by `delta` inside an open transaction.
///
/// Read-modify-write in Rust so the balance arithmetic stays decimal-exact.
pub async fn adjust_account_balance_tx(
    conn: &mut SqliteConnection,
    account_id: i64,
    delta: Decimal,
) -> Result<(), sqlx::Error> {
    let row = sqlx::query("SELECT balance FROM accounts WHERE id = ?")
        .bind(account_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    let balance = parse_decimal_lenient(row.get("balance"), "accounts.balance");
    let updated = balance + delta;

    sqlx::query("UPDATE accounts SET balance = ? WHERE id = ?")
        .bind(updated.to_canonical_string())
        .bind(account_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// =========================================================================
// Row-mapping helpers shared by the submodules
// =========================================================================

/// Parse a stored canonical decimal, logging and defaulting to zero on
/// malformed data rather than failing the read path.
pub(crate) fn parse_decimal_lenient(value: String, column: &str) -> Decimal {
    Decimal::from_str(&value).unwrap_or_else(|e| {
        warn!(column, value = %value, error = %e, "Failed to parse stored decimal, using zero");
        Decimal::zero()
    })
}

/// Parse an optional stored decimal column.
pub(crate) fn get_decimal_opt(row: &SqliteRow, column: &str) -> Option<Decimal> {
    row.get::<Option<String>, _>(column)
        .map(|v| parse_decimal_lenient(v, column))
}

/// Parse a required stored decimal column.
pub(crate) fn get_decimal(row: &SqliteRow, column: &str) -> Decimal {
    parse_decimal_lenient(row.get::<String, _>(column), column)
}

/// Parse an ISO date string, logging on malformed data.
pub(crate) fn parse_date_opt(value: String, column: &str) -> Option<NaiveDate> {
    match NaiveDate::from_str(&value) {
        Ok(date) => Some(date),
        Err(e) => {
            warn!(column, value = %value, error = %e, "Failed to parse stored date");
            None
        }
    }
}

/// Parse an optional ISO date column.
pub(crate) fn get_date_opt(row: &SqliteRow, column: &str) -> Option<NaiveDate> {
    row.get::<Option<String>, _>(column)
        .and_then(|v| parse_date_opt(v, column))
}

/// Parse a required ISO date column; falls back to the epoch date on
/// malformed data so reads never panic.
pub(crate) fn get_date(row: &SqliteRow, column: &str) -> NaiveDate {
    get_date_opt(row, column)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch date is valid"))
}
