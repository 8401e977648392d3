//! Counterparty limit rows and exposure aggregation.
//!
//! Exposure sums are folded in Rust over stored canonical decimals. The
//! `*_tx` functions run on the caller's connection so the read-then-decide
//! sequence shares the transaction that inserts the new deal.

use super::{get_decimal, parse_decimal_lenient, Repository};
use crate::domain::{CounterpartyType, Currency, Decimal, ProductType};
use crate::engine::{CounterpartyLimits, ExposureSnapshot};
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;

/// Resolve the configured limit row for (counterparty, type, currency).
///
/// Rows with a blank currency apply to every currency, matching the source
/// system's lookup.
pub async fn get_counterparty_limits_tx(
    conn: &mut SqliteConnection,
    counterparty_id: i64,
    counterparty_type: CounterpartyType,
    currency: &Currency,
) -> Result<Option<CounterpartyLimits>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT * FROM counterparty_limits
        WHERE counterparty_id = ? AND counterparty_type = ?
          AND (currency = ? OR currency = '')
        ORDER BY currency DESC
        LIMIT 1
        "#,
    )
    .bind(counterparty_id)
    .bind(counterparty_type.as_str())
    .bind(currency.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|r| CounterpartyLimits {
        overall_exposure_limit: get_decimal(&r, "overall_exposure_limit"),
        product_transaction_limit: get_decimal(&r, "product_transaction_limit"),
        product_money_market_limit: get_decimal(&r, "product_money_market_limit"),
        product_fx_limit: get_decimal(&r, "product_fx_limit"),
        product_derivative_limit: get_decimal(&r, "product_derivative_limit"),
        product_repo_limit: get_decimal(&r, "product_repo_limit"),
        product_reverse_repo_limit: get_decimal(&r, "product_reverse_repo_limit"),
        product_gsec_limit: get_decimal(&r, "product_gsec_limit"),
        product_sell_and_buy_back_limit: get_decimal(&r, "product_sell_and_buy_back_limit"),
        product_buy_and_sell_back_limit: get_decimal(&r, "product_buy_and_sell_back_limit"),
    }))
}

async fn sum_column(
    conn: &mut SqliteConnection,
    sql: &str,
    counterparty_id: i64,
    currency: &str,
    extra: Option<&str>,
) -> Result<Decimal, sqlx::Error> {
    let mut query = sqlx::query(sql).bind(counterparty_id);
    if let Some(extra) = extra {
        query = query.bind(extra);
    }
    query = query.bind(currency);
    let rows = query.fetch_all(&mut *conn).await?;

    let mut sum = Decimal::zero();
    for row in rows {
        let value: String = row.get(0);
        sum = sum + parse_decimal_lenient(value, "exposure amount");
    }
    Ok(sum)
}

/// Current exposure already recorded for one counterparty+product+currency.
///
/// GSec exposure is the face-value total in the GSec table; other products
/// sum generic transaction amounts whose transaction type carries the
/// product tag; money-market exposure sums principal amounts.
pub async fn product_exposure_tx(
    conn: &mut SqliteConnection,
    counterparty_id: i64,
    product: ProductType,
    currency: &Currency,
) -> Result<Decimal, sqlx::Error> {
    match product {
        ProductType::Gsec => {
            sum_column(
                conn,
                "SELECT face_value FROM gsec_deals WHERE counterparty_id = ? AND currency = ?",
                counterparty_id,
                currency.as_str(),
                None,
            )
            .await
        }
        ProductType::MoneyMarket => {
            sum_column(
                conn,
                "SELECT principal_amount FROM money_market_deals WHERE counterparty_id = ? AND currency = ?",
                counterparty_id,
                currency.as_str(),
                None,
            )
            .await
        }
        other => {
            sum_column(
                conn,
                r#"
                SELECT amount FROM transactions
                WHERE counterparty_id = ?
                  AND transaction_type_id IN
                      (SELECT id FROM transaction_types WHERE product_type = ?)
                  AND currency = ?
                "#,
                counterparty_id,
                currency.as_str(),
                Some(other.as_str()),
            )
            .await
        }
    }
}

/// Current exposure across every product for one counterparty+currency.
pub async fn overall_exposure_tx(
    conn: &mut SqliteConnection,
    counterparty_id: i64,
    currency: &Currency,
) -> Result<Decimal, sqlx::Error> {
    let transactions = sum_column(
        conn,
        "SELECT amount FROM transactions WHERE counterparty_id = ? AND currency = ?",
        counterparty_id,
        currency.as_str(),
        None,
    )
    .await?;
    let gsec = sum_column(
        conn,
        "SELECT face_value FROM gsec_deals WHERE counterparty_id = ? AND currency = ?",
        counterparty_id,
        currency.as_str(),
        None,
    )
    .await?;
    let money_market = sum_column(
        conn,
        "SELECT principal_amount FROM money_market_deals WHERE counterparty_id = ? AND currency = ?",
        counterparty_id,
        currency.as_str(),
        None,
    )
    .await?;
    Ok(transactions + gsec + money_market)
}

/// Product dimension tagged on a transaction type, if registered.
pub async fn transaction_product_type_tx(
    conn: &mut SqliteConnection,
    transaction_type_id: i64,
) -> Result<Option<ProductType>, sqlx::Error> {
    let row = sqlx::query("SELECT product_type FROM transaction_types WHERE id = ?")
        .bind(transaction_type_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.and_then(|r| ProductType::parse(r.get("product_type"))))
}

/// Both exposure dimensions for a limit check, on one connection.
pub async fn exposure_snapshot_tx(
    conn: &mut SqliteConnection,
    counterparty_id: i64,
    product: ProductType,
    currency: &Currency,
) -> Result<ExposureSnapshot, sqlx::Error> {
    let product_exposure = product_exposure_tx(conn, counterparty_id, product, currency).await?;
    let overall = overall_exposure_tx(conn, counterparty_id, currency).await?;
    Ok(ExposureSnapshot {
        product: product_exposure,
        overall,
    })
}

impl Repository {
    /// Create or replace the limit row for one (counterparty, type, currency).
    pub async fn upsert_counterparty_limits(
        &self,
        counterparty_id: i64,
        counterparty_type: CounterpartyType,
        currency: &Currency,
        limits: &CounterpartyLimits,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO counterparty_limits (
                counterparty_id, counterparty_type, currency, overall_exposure_limit,
                product_transaction_limit, product_money_market_limit, product_fx_limit,
                product_derivative_limit, product_repo_limit, product_reverse_repo_limit,
                product_gsec_limit, product_sell_and_buy_back_limit, product_buy_and_sell_back_limit
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(counterparty_id, counterparty_type, currency) DO UPDATE SET
                overall_exposure_limit = excluded.overall_exposure_limit,
                product_transaction_limit = excluded.product_transaction_limit,
                product_money_market_limit = excluded.product_money_market_limit,
                product_fx_limit = excluded.product_fx_limit,
                product_derivative_limit = excluded.product_derivative_limit,
                product_repo_limit = excluded.product_repo_limit,
                product_reverse_repo_limit = excluded.product_reverse_repo_limit,
                product_gsec_limit = excluded.product_gsec_limit,
                product_sell_and_buy_back_limit = excluded.product_sell_and_buy_back_limit,
                product_buy_and_sell_back_limit = excluded.product_buy_and_sell_back_limit
            "#,
        )
        .bind(counterparty_id)
        .bind(counterparty_type.as_str())
        .bind(currency.as_str())
        .bind(limits.overall_exposure_limit.to_canonical_string())
        .bind(limits.product_transaction_limit.to_canonical_string())
        .bind(limits.product_money_market_limit.to_canonical_string())
        .bind(limits.product_fx_limit.to_canonical_string())
        .bind(limits.product_derivative_limit.to_canonical_string())
        .bind(limits.product_repo_limit.to_canonical_string())
        .bind(limits.product_reverse_repo_limit.to_canonical_string())
        .bind(limits.product_gsec_limit.to_canonical_string())
        .bind(limits.product_sell_and_buy_back_limit.to_canonical_string())
        .bind(limits.product_buy_and_sell_back_limit.to_canonical_string())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Register a transaction type and its product-dimension tag.
    pub async fn insert_transaction_type(
        &self,
        name: &str,
        product: ProductType,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO transaction_types (name, product_type) VALUES (?, ?)")
                .bind(name)
                .bind(product.as_str())
                .execute(self.pool())
                .await?;
        Ok(result.last_insert_rowid())
    }

    /// Read-only limit status: configured ceilings plus current exposures.
    pub async fn limit_status(
        &self,
        counterparty_id: i64,
        counterparty_type: CounterpartyType,
        product: ProductType,
        currency: &Currency,
    ) -> Result<(Option<CounterpartyLimits>, ExposureSnapshot), sqlx::Error> {
        let mut conn = self.pool().acquire().await?;
        let limits =
            get_counterparty_limits_tx(&mut conn, counterparty_id, counterparty_type, currency)
                .await?;
        let exposure = exposure_snapshot_tx(&mut conn, counterparty_id, product, currency).await?;
        Ok((limits, exposure))
    }
}
