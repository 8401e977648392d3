//! Deal row operations: generic transactions, GSec, and money-market deals.

use super::{get_date, get_date_opt, get_decimal, get_decimal_opt, Repository};
use crate::domain::{
    ApprovalLevel, ApprovalStep, Currency, Deal, DealNumber, DealStatus, GsecDeal, Isin,
    MoneyMarketDeal, MoneyMarketSide, TradeType,
};
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use tracing::warn;

/// Money-market row slice consumed by the EOD accrual pass. The per-day
/// field stays raw so unparseable legacy values can be skipped and logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoneyMarketAccrualRow {
    pub deal_number: String,
    pub deal_type: Option<String>,
    pub per_day_interest: Option<String>,
    pub currency: String,
}

/// GSec row slice consumed by the EOD accrual pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GsecAccrualRow {
    pub deal_number: String,
    pub per_day_accrual: Option<String>,
    pub maturity_date: Option<NaiveDate>,
    pub currency: String,
}

fn parse_approval_chain(raw: String, deal_number: &str) -> Vec<ApprovalStep> {
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(deal_number, error = %e, "Failed to parse approval chain, using empty");
        Vec::new()
    })
}

fn map_transaction_row(row: &SqliteRow) -> Deal {
    let deal_number: String = row.get("deal_number");
    let approval_chain = parse_approval_chain(row.get("approval_chain"), &deal_number);
    Deal {
        deal_number: DealNumber::new(deal_number),
        source_account_id: row.get("source_account_id"),
        category: row.get("category"),
        amount: get_decimal(row, "amount"),
        currency: Currency::new(row.get("currency")),
        txn_date: get_date(row, "txn_date"),
        trade_date: get_date_opt(row, "trade_date"),
        value_date: get_date_opt(row, "value_date"),
        description: row.get("description"),
        counterparty_id: row.get("counterparty_id"),
        counterparty_type: row.get("counterparty_type"),
        transaction_type_id: row.get("transaction_type_id"),
        price: get_decimal_opt(row, "price"),
        yield_pct: get_decimal_opt(row, "yield_pct"),
        portfolio: row.get("portfolio"),
        strategy: row.get("strategy"),
        commission: get_decimal_opt(row, "commission"),
        brokerage: get_decimal_opt(row, "brokerage"),
        remarks: row.get("remarks"),
        status: DealStatus::parse(row.get("status")).unwrap_or_default(),
        approval_status: DealStatus::parse(row.get("approval_status")).unwrap_or_default(),
        current_approval_level: ApprovalLevel::parse(row.get("current_approval_level"))
            .unwrap_or_default(),
        approval_chain,
        submitted_by: row.get("submitted_by"),
        comment: row.get("comment"),
    }
}

fn map_gsec_row(row: &SqliteRow) -> GsecDeal {
    let deal_number: String = row.get("deal_number");
    let approval_chain = parse_approval_chain(row.get("approval_chain"), &deal_number);
    GsecDeal {
        deal_number: DealNumber::new(deal_number),
        trade_type: TradeType::parse(row.get("trade_type")).unwrap_or(TradeType::Buy),
        counterparty_id: row.get("counterparty_id"),
        counterparty_type: row.get("counterparty_type"),
        isin: Isin::new(row.get("isin")),
        face_value: get_decimal(row, "face_value"),
        value_date: get_date(row, "value_date"),
        last_coupon_date: get_date_opt(row, "last_coupon_date"),
        next_coupon_date: get_date_opt(row, "next_coupon_date"),
        accrued_interest: get_decimal_opt(row, "accrued_interest"),
        coupon_interest: get_decimal_opt(row, "coupon_interest"),
        clean_price: get_decimal_opt(row, "clean_price"),
        dirty_price: get_decimal_opt(row, "dirty_price"),
        settlement_amount: get_decimal_opt(row, "settlement_amount"),
        settlement_bank_code: row.get("settlement_bank_code"),
        issue_date: get_date_opt(row, "issue_date"),
        maturity_date: get_date(row, "maturity_date"),
        per_day_accrual: get_decimal_opt(row, "per_day_accrual"),
        yield_pct: get_decimal_opt(row, "yield_pct"),
        brokerage: get_decimal_opt(row, "brokerage"),
        currency: Currency::new(row.get("currency")),
        portfolio: row.get("portfolio"),
        strategy: row.get("strategy"),
        broker: row.get("broker"),
        status: DealStatus::parse(row.get("status")).unwrap_or_default(),
        approval_status: DealStatus::parse(row.get("approval_status")).unwrap_or_default(),
        current_approval_level: ApprovalLevel::parse(row.get("current_approval_level"))
            .unwrap_or_default(),
        approval_chain,
        submitted_by: row.get("submitted_by"),
        comment: row.get("comment"),
    }
}

fn map_money_market_row(row: &SqliteRow) -> MoneyMarketDeal {
    MoneyMarketDeal {
        deal_number: DealNumber::new(row.get("deal_number")),
        trade_date: get_date(row, "trade_date"),
        value_date: get_date(row, "value_date"),
        maturity_date: get_date(row, "maturity_date"),
        counterparty_id: row.get("counterparty_id"),
        counterparty_type: row.get("counterparty_type"),
        product_code: row.get("product_code"),
        deal_type: MoneyMarketSide::parse(row.get("deal_type"))
            .unwrap_or(MoneyMarketSide::Lending),
        currency: Currency::new(row.get("currency")),
        principal_amount: get_decimal(row, "principal_amount"),
        interest_rate: get_decimal(row, "interest_rate"),
        tenor: row.get("tenor"),
        interest_amount: get_decimal_opt(row, "interest_amount"),
        maturity_value: get_decimal_opt(row, "maturity_value"),
        per_day_interest: get_decimal_opt(row, "per_day_interest"),
        settlement_bank_code: row.get("settlement_bank_code"),
        status: DealStatus::parse(row.get("status")).unwrap_or_default(),
    }
}

/// True if the deal number is already taken in either deal table.
pub async fn deal_number_exists_tx(
    conn: &mut SqliteConnection,
    deal_number: &str,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM transactions WHERE deal_number = ?
            UNION
            SELECT 1 FROM gsec_deals WHERE deal_number = ?
        ) AS taken
        "#,
    )
    .bind(deal_number)
    .bind(deal_number)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.get::<i64, _>("taken") != 0)
}

/// Insert a generic transaction row inside an open transaction.
pub async fn insert_transaction_tx(
    conn: &mut SqliteConnection,
    deal: &Deal,
) -> Result<(), sqlx::Error> {
    let chain = serde_json::to_string(&deal.approval_chain).unwrap_or_else(|_| "[]".to_string());
    sqlx::query(
        r#"
        INSERT INTO transactions (
            deal_number, source_account_id, category, amount, currency, txn_date,
            trade_date, value_date, description, counterparty_id, counterparty_type,
            transaction_type_id, price, yield_pct, portfolio, strategy, commission,
            brokerage, remarks, status, approval_status, current_approval_level,
            approval_chain, submitted_by, comment
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(deal.deal_number.as_str())
    .bind(deal.source_account_id)
    .bind(deal.category.as_deref())
    .bind(deal.amount.to_canonical_string())
    .bind(deal.currency.as_str())
    .bind(deal.txn_date.to_string())
    .bind(deal.trade_date.map(|d| d.to_string()))
    .bind(deal.value_date.map(|d| d.to_string()))
    .bind(deal.description.as_deref())
    .bind(deal.counterparty_id)
    .bind(deal.counterparty_type.as_deref())
    .bind(deal.transaction_type_id)
    .bind(deal.price.map(|v| v.to_canonical_string()))
    .bind(deal.yield_pct.map(|v| v.to_canonical_string()))
    .bind(deal.portfolio.as_deref())
    .bind(deal.strategy.as_deref())
    .bind(deal.commission.map(|v| v.to_canonical_string()))
    .bind(deal.brokerage.map(|v| v.to_canonical_string()))
    .bind(deal.remarks.as_deref())
    .bind(deal.status.as_str())
    .bind(deal.approval_status.as_str())
    .bind(deal.current_approval_level.as_str())
    .bind(chain)
    .bind(deal.submitted_by.as_str())
    .bind(deal.comment.as_deref())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Read a generic transaction inside an open transaction.
pub async fn get_transaction_tx(
    conn: &mut SqliteConnection,
    deal_number: &str,
) -> Result<Option<Deal>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM transactions WHERE deal_number = ?")
        .bind(deal_number)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(|r| map_transaction_row(&r)))
}

/// Overwrite a generic transaction's business fields inside an open
/// transaction. Workflow columns are written too: field edits reset them.
pub async fn update_transaction_fields_tx(
    conn: &mut SqliteConnection,
    deal: &Deal,
) -> Result<(), sqlx::Error> {
    let chain = serde_json::to_string(&deal.approval_chain).unwrap_or_else(|_| "[]".to_string());
    sqlx::query(
        r#"
        UPDATE transactions SET
            source_account_id = ?, category = ?, amount = ?, currency = ?, txn_date = ?,
            trade_date = ?, value_date = ?, description = ?, counterparty_id = ?,
            counterparty_type = ?, transaction_type_id = ?, price = ?, yield_pct = ?,
            portfolio = ?, strategy = ?, commission = ?, brokerage = ?, remarks = ?,
            status = ?, approval_status = ?, current_approval_level = ?, approval_chain = ?,
            comment = ?, updated_at = CURRENT_TIMESTAMP
        WHERE deal_number = ?
        "#,
    )
    .bind(deal.source_account_id)
    .bind(deal.category.as_deref())
    .bind(deal.amount.to_canonical_string())
    .bind(deal.currency.as_str())
    .bind(deal.txn_date.to_string())
    .bind(deal.trade_date.map(|d| d.to_string()))
    .bind(deal.value_date.map(|d| d.to_string()))
    .bind(deal.description.as_deref())
    .bind(deal.counterparty_id)
    .bind(deal.counterparty_type.as_deref())
    .bind(deal.transaction_type_id)
    .bind(deal.price.map(|v| v.to_canonical_string()))
    .bind(deal.yield_pct.map(|v| v.to_canonical_string()))
    .bind(deal.portfolio.as_deref())
    .bind(deal.strategy.as_deref())
    .bind(deal.commission.map(|v| v.to_canonical_string()))
    .bind(deal.brokerage.map(|v| v.to_canonical_string()))
    .bind(deal.remarks.as_deref())
    .bind(deal.status.as_str())
    .bind(deal.approval_status.as_str())
    .bind(deal.current_approval_level.as_str())
    .bind(chain)
    .bind(deal.comment.as_deref())
    .bind(deal.deal_number.as_str())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Apply a workflow transition to a generic transaction.
#[allow(clippy::too_many_arguments)]
pub async fn update_transaction_workflow_tx(
    conn: &mut SqliteConnection,
    deal_number: &str,
    status: DealStatus,
    approval_status: DealStatus,
    level: ApprovalLevel,
    approval_chain: &[ApprovalStep],
    comment: Option<&str>,
) -> Result<(), sqlx::Error> {
    let chain = serde_json::to_string(approval_chain).unwrap_or_else(|_| "[]".to_string());
    sqlx::query(
        r#"
        UPDATE transactions SET
            status = ?, approval_status = ?, current_approval_level = ?,
            approval_chain = ?, comment = COALESCE(?, comment),
            updated_at = CURRENT_TIMESTAMP
        WHERE deal_number = ?
        "#,
    )
    .bind(status.as_str())
    .bind(approval_status.as_str())
    .bind(level.as_str())
    .bind(chain)
    .bind(comment)
    .bind(deal_number)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Delete a generic transaction row inside an open transaction.
pub async fn delete_transaction_tx(
    conn: &mut SqliteConnection,
    deal_number: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM transactions WHERE deal_number = ?")
        .bind(deal_number)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Insert a GSec deal row inside an open transaction.
pub async fn insert_gsec_tx(
    conn: &mut SqliteConnection,
    deal: &GsecDeal,
) -> Result<(), sqlx::Error> {
    let chain = serde_json::to_string(&deal.approval_chain).unwrap_or_else(|_| "[]".to_string());
    sqlx::query(
        r#"
        INSERT INTO gsec_deals (
            deal_number, trade_type, counterparty_id, counterparty_type, isin,
            face_value, value_date, last_coupon_date, next_coupon_date,
            accrued_interest, coupon_interest, clean_price, dirty_price,
            settlement_amount, settlement_bank_code, issue_date, maturity_date,
            per_day_accrual, yield_pct, brokerage, currency, portfolio, strategy,
            broker, status, approval_status, current_approval_level, approval_chain,
            submitted_by, comment
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(deal.deal_number.as_str())
    .bind(deal.trade_type.as_str())
    .bind(deal.counterparty_id)
    .bind(deal.counterparty_type.as_deref())
    .bind(deal.isin.as_str())
    .bind(deal.face_value.to_canonical_string())
    .bind(deal.value_date.to_string())
    .bind(deal.last_coupon_date.map(|d| d.to_string()))
    .bind(deal.next_coupon_date.map(|d| d.to_string()))
    .bind(deal.accrued_interest.map(|v| v.to_canonical_string()))
    .bind(deal.coupon_interest.map(|v| v.to_canonical_string()))
    .bind(deal.clean_price.map(|v| v.to_canonical_string()))
    .bind(deal.dirty_price.map(|v| v.to_canonical_string()))
    .bind(deal.settlement_amount.map(|v| v.to_canonical_string()))
    .bind(deal.settlement_bank_code.as_deref())
    .bind(deal.issue_date.map(|d| d.to_string()))
    .bind(deal.maturity_date.to_string())
    .bind(deal.per_day_accrual.map(|v| v.to_canonical_string()))
    .bind(deal.yield_pct.map(|v| v.to_canonical_string()))
    .bind(deal.brokerage.map(|v| v.to_canonical_string()))
    .bind(deal.currency.as_str())
    .bind(deal.portfolio.as_deref())
    .bind(deal.strategy.as_deref())
    .bind(deal.broker.as_deref())
    .bind(deal.status.as_str())
    .bind(deal.approval_status.as_str())
    .bind(deal.current_approval_level.as_str())
    .bind(chain)
    .bind(deal.submitted_by.as_str())
    .bind(deal.comment.as_deref())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Read a GSec deal inside an open transaction.
pub async fn get_gsec_tx(
    conn: &mut SqliteConnection,
    deal_number: &str,
) -> Result<Option<GsecDeal>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM gsec_deals WHERE deal_number = ?")
        .bind(deal_number)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(|r| map_gsec_row(&r)))
}

/// Apply a workflow transition to a GSec deal.
#[allow(clippy::too_many_arguments)]
pub async fn update_gsec_workflow_tx(
    conn: &mut SqliteConnection,
    deal_number: &str,
    status: DealStatus,
    approval_status: DealStatus,
    level: ApprovalLevel,
    approval_chain: &[ApprovalStep],
    comment: Option<&str>,
) -> Result<(), sqlx::Error> {
    let chain = serde_json::to_string(approval_chain).unwrap_or_else(|_| "[]".to_string());
    sqlx::query(
        r#"
        UPDATE gsec_deals SET
            status = ?, approval_status = ?, current_approval_level = ?,
            approval_chain = ?, comment = COALESCE(?, comment),
            updated_at = CURRENT_TIMESTAMP
        WHERE deal_number = ?
        "#,
    )
    .bind(status.as_str())
    .bind(approval_status.as_str())
    .bind(level.as_str())
    .bind(chain)
    .bind(comment)
    .bind(deal_number)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Insert a money-market deal row inside an open transaction.
pub async fn insert_money_market_tx(
    conn: &mut SqliteConnection,
    deal: &MoneyMarketDeal,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO money_market_deals (
            deal_number, trade_date, value_date, maturity_date, counterparty_id,
            counterparty_type, product_code, deal_type, currency, principal_amount,
            interest_rate, tenor, interest_amount, maturity_value, per_day_interest,
            settlement_bank_code, status
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(deal.deal_number.as_str())
    .bind(deal.trade_date.to_string())
    .bind(deal.value_date.to_string())
    .bind(deal.maturity_date.to_string())
    .bind(deal.counterparty_id)
    .bind(deal.counterparty_type.as_deref())
    .bind(deal.product_code.as_str())
    .bind(deal.deal_type.as_str())
    .bind(deal.currency.as_str())
    .bind(deal.principal_amount.to_canonical_string())
    .bind(deal.interest_rate.to_canonical_string())
    .bind(deal.tenor)
    .bind(deal.interest_amount.map(|v| v.to_canonical_string()))
    .bind(deal.maturity_value.map(|v| v.to_canonical_string()))
    .bind(deal.per_day_interest.map(|v| v.to_canonical_string()))
    .bind(deal.settlement_bank_code.as_deref())
    .bind(deal.status.as_str())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Highest sequence already issued for a trade date + product code, read
/// inside the same transaction as the subsequent insert.
pub async fn max_money_market_sequence_tx(
    conn: &mut SqliteConnection,
    trade_date: NaiveDate,
    product_code: &str,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT deal_number FROM money_market_deals
        WHERE trade_date = ? AND product_code = ?
        ORDER BY deal_number DESC
        LIMIT 1
        "#,
    )
    .bind(trade_date.to_string())
    .bind(product_code)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row
        .and_then(|r| {
            let deal_number: String = r.get("deal_number");
            let tail = deal_number
                .len()
                .checked_sub(4)
                .map(|start| &deal_number[start..])?;
            tail.parse::<i64>().ok()
        })
        .unwrap_or(0))
}

/// Record that a deal's accrual was posted for a business day.
///
/// Returns false when the (deal, day) pair is already recorded, which makes
/// the EOD batch idempotent per deal per day.
pub async fn record_eod_posting_tx(
    conn: &mut SqliteConnection,
    deal_number: &str,
    system_date: NaiveDate,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO eod_postings (deal_number, system_date)
        VALUES (?, ?)
        ON CONFLICT(deal_number, system_date) DO NOTHING
        "#,
    )
    .bind(deal_number)
    .bind(system_date.to_string())
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

impl Repository {
    /// Fetch a generic transaction by deal number.
    pub async fn get_transaction(&self, deal_number: &str) -> Result<Option<Deal>, sqlx::Error> {
        let mut conn = self.pool().acquire().await?;
        get_transaction_tx(&mut conn, deal_number).await
    }

    /// Most recently captured generic transactions.
    pub async fn recent_transactions(&self, limit: i64) -> Result<Vec<Deal>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT * FROM transactions ORDER BY txn_date DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.iter().map(map_transaction_row).collect())
    }

    /// Fetch a GSec deal by deal number.
    pub async fn get_gsec(&self, deal_number: &str) -> Result<Option<GsecDeal>, sqlx::Error> {
        let mut conn = self.pool().acquire().await?;
        get_gsec_tx(&mut conn, deal_number).await
    }

    /// Most recently captured GSec deals.
    pub async fn recent_gsec(&self, limit: i64) -> Result<Vec<GsecDeal>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM gsec_deals ORDER BY id DESC LIMIT ?")
            .bind(limit)
            .fetch_all(self.pool())
            .await?;
        Ok(rows.iter().map(map_gsec_row).collect())
    }

    /// Fetch a money-market deal by deal number.
    pub async fn get_money_market(
        &self,
        deal_number: &str,
    ) -> Result<Option<MoneyMarketDeal>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM money_market_deals WHERE deal_number = ?")
            .bind(deal_number)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(|r| map_money_market_row(&r)))
    }

    /// Money-market deals still open on the given business day.
    pub async fn money_market_deals_for_accrual(
        &self,
        system_day: NaiveDate,
    ) -> Result<Vec<MoneyMarketAccrualRow>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT deal_number, deal_type, per_day_interest, currency
            FROM money_market_deals
            WHERE maturity_date >= ?
            ORDER BY id ASC
            "#,
        )
        .bind(system_day.to_string())
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| MoneyMarketAccrualRow {
                deal_number: row.get("deal_number"),
                deal_type: row.get("deal_type"),
                per_day_interest: row.get("per_day_interest"),
                currency: row.get("currency"),
            })
            .collect())
    }

    /// GSec deals with an accrual field that have not matured.
    pub async fn gsec_deals_for_accrual(
        &self,
        system_day: NaiveDate,
    ) -> Result<Vec<GsecAccrualRow>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT deal_number, per_day_accrual, maturity_date, currency
            FROM gsec_deals
            WHERE per_day_accrual IS NOT NULL AND maturity_date >= ?
            ORDER BY id ASC
            "#,
        )
        .bind(system_day.to_string())
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| GsecAccrualRow {
                deal_number: row.get("deal_number"),
                per_day_accrual: row.get("per_day_accrual"),
                maturity_date: super::get_date_opt(row, "maturity_date"),
                currency: row.get("currency"),
            })
            .collect())
    }
}
