//! Chart-of-accounts lookups, ledger postings, and financial reports.
//!
//! Report sums are folded in Rust over fetched rows; SQL SUM over REAL would
//! lose decimal precision.

use super::{get_date, get_decimal, Repository};
use crate::domain::{AccountCategory, AccountCode, Currency, DealNumber, Decimal, LedgerEntry};
use crate::engine::{LedgerLine, PostingRule};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;
use std::collections::BTreeMap;

/// Filters for the general-ledger listing.
#[derive(Debug, Clone, Default)]
pub struct LedgerFilters {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub account_id: Option<i64>,
    pub deal_number: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Per-account balance line in a statement section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub account_code: String,
    pub name: String,
    pub balance: Decimal,
}

/// Profit-and-loss statement for a period.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitAndLoss {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub revenue: Vec<AccountBalance>,
    pub total_revenue: Decimal,
    pub expenses: Vec<AccountBalance>,
    pub total_expenses: Decimal,
    pub net_profit: Decimal,
}

/// Balance sheet as of a date.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSheet {
    pub as_of_date: NaiveDate,
    pub assets: Vec<AccountBalance>,
    pub total_assets: Decimal,
    pub liabilities: Vec<AccountBalance>,
    pub total_liabilities: Decimal,
    pub equity: Vec<AccountBalance>,
    pub retained_earnings: Decimal,
    pub total_equity: Decimal,
    pub total_liabilities_and_equity: Decimal,
}

/// Resolve an active account's id from its code.
pub async fn account_id_by_code_tx(
    conn: &mut SqliteConnection,
    account_code: &str,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        "SELECT id FROM chart_of_accounts WHERE account_code = ? AND is_active = 1 LIMIT 1",
    )
    .bind(account_code)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(sqlx::Error::RowNotFound)?;
    Ok(row.get("id"))
}

/// Resolve a configured posting rule.
pub async fn posting_rule_tx(
    conn: &mut SqliteConnection,
    rule_key: &str,
) -> Result<PostingRule, sqlx::Error> {
    let row = sqlx::query(
        "SELECT debit_account_code, credit_account_code FROM posting_rules WHERE rule_key = ?",
    )
    .bind(rule_key)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(sqlx::Error::RowNotFound)?;
    Ok(PostingRule {
        debit_account: AccountCode::new(row.get("debit_account_code")),
        credit_account: AccountCode::new(row.get("credit_account_code")),
    })
}

/// Resolve a settlement bank code to its chart-of-accounts code, if mapped.
pub async fn settlement_account_code_tx(
    conn: &mut SqliteConnection,
    bank_code: &str,
) -> Result<Option<AccountCode>, sqlx::Error> {
    let row = sqlx::query("SELECT coa_account_code FROM settlement_accounts WHERE bank_code = ?")
        .bind(bank_code)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(|r| AccountCode::new(r.get("coa_account_code"))))
}

/// Insert prepared ledger lines for one deal inside an open transaction.
///
/// Callers verify the double-entry balance with `engine::check_balanced`
/// before calling; an unknown account code surfaces as RowNotFound and rolls
/// the enclosing transaction back.
pub async fn insert_ledger_lines_tx(
    conn: &mut SqliteConnection,
    deal_number: &str,
    lines: &[LedgerLine],
) -> Result<(), sqlx::Error> {
    for line in lines {
        let account_id = account_id_by_code_tx(conn, line.account_code.as_str()).await?;
        sqlx::query(
            r#"
            INSERT INTO ledger_entries
                (deal_number, account_id, entry_date, debit_amount, credit_amount, currency, description)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(deal_number)
        .bind(account_id)
        .bind(line.entry_date.to_string())
        .bind(line.debit_amount.to_canonical_string())
        .bind(line.credit_amount.to_canonical_string())
        .bind(line.currency.as_str())
        .bind(line.description.as_str())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Remove every ledger row tied to a deal number.
pub async fn delete_ledger_entries_for_deal_tx(
    conn: &mut SqliteConnection,
    deal_number: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM ledger_entries WHERE deal_number = ?")
        .bind(deal_number)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

fn map_entry_row(row: &sqlx::sqlite::SqliteRow) -> LedgerEntry {
    LedgerEntry {
        id: row.get("id"),
        deal_number: DealNumber::new(row.get("deal_number")),
        account_id: row.get("account_id"),
        account_code: row
            .get::<Option<String>, _>("account_code")
            .map(AccountCode::new),
        account_name: row.get("account_name"),
        entry_date: get_date(row, "entry_date"),
        debit_amount: get_decimal(row, "debit_amount"),
        credit_amount: get_decimal(row, "credit_amount"),
        currency: Currency::new(row.get("currency")),
        description: row.get("description"),
    }
}

impl Repository {
    /// All ledger rows for one deal, oldest first.
    pub async fn ledger_entries_for_deal(
        &self,
        deal_number: &str,
    ) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT le.id, le.deal_number, le.account_id, le.entry_date,
                   le.debit_amount, le.credit_amount, le.currency, le.description,
                   coa.account_code AS account_code, coa.name AS account_name
            FROM ledger_entries le
            JOIN chart_of_accounts coa ON coa.id = le.account_id
            WHERE le.deal_number = ?
            ORDER BY le.id ASC
            "#,
        )
        .bind(deal_number)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.iter().map(map_entry_row).collect())
    }

    /// Filtered general-ledger listing, newest first.
    pub async fn general_ledger(
        &self,
        filters: &LedgerFilters,
    ) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        let mut sql = String::from(
            r#"
            SELECT le.id, le.deal_number, le.account_id, le.entry_date,
                   le.debit_amount, le.credit_amount, le.currency, le.description,
                   coa.account_code AS account_code, coa.name AS account_name
            FROM ledger_entries le
            JOIN chart_of_accounts coa ON coa.id = le.account_id
            WHERE 1=1
            "#,
        );
        if filters.start_date.is_some() {
            sql.push_str(" AND le.entry_date >= ?");
        }
        if filters.end_date.is_some() {
            sql.push_str(" AND le.entry_date <= ?");
        }
        if filters.account_id.is_some() {
            sql.push_str(" AND le.account_id = ?");
        }
        if filters.deal_number.is_some() {
            sql.push_str(" AND le.deal_number = ?");
        }
        sql.push_str(" ORDER BY le.entry_date DESC, le.id DESC");
        if filters.limit.is_some() {
            sql.push_str(" LIMIT ?");
            if filters.offset.is_some() {
                sql.push_str(" OFFSET ?");
            }
        }

        let mut query = sqlx::query(&sql);
        if let Some(start) = filters.start_date {
            query = query.bind(start.to_string());
        }
        if let Some(end) = filters.end_date {
            query = query.bind(end.to_string());
        }
        if let Some(account_id) = filters.account_id {
            query = query.bind(account_id);
        }
        if let Some(deal_number) = &filters.deal_number {
            query = query.bind(deal_number.as_str());
        }
        if let Some(limit) = filters.limit {
            query = query.bind(limit);
            if let Some(offset) = filters.offset {
                query = query.bind(offset);
            }
        }

        let rows = query.fetch_all(self.pool()).await?;
        Ok(rows.iter().map(map_entry_row).collect())
    }

    /// Per-account balances for one category within an optional date window.
    ///
    /// Balances are signed by the category's normal side: debit-normal
    /// categories report debit - credit, the rest credit - debit. Accounts
    /// with no entries in the window appear with a zero balance.
    pub async fn category_balances(
        &self,
        category: AccountCategory,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<AccountBalance>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT coa.account_code AS account_code, coa.name AS account_name,
                   le.debit_amount AS debit_amount, le.credit_amount AS credit_amount,
                   le.entry_date AS entry_date
            FROM chart_of_accounts coa
            JOIN account_types at ON at.id = coa.account_type_id
            LEFT JOIN ledger_entries le ON le.account_id = coa.id
            WHERE at.category = ?
            ORDER BY coa.account_code, le.id
            "#,
        )
        .bind(category.as_str())
        .fetch_all(self.pool())
        .await?;

        let mut balances: BTreeMap<String, (String, Decimal)> = BTreeMap::new();
        for row in &rows {
            let code: String = row.get("account_code");
            let name: String = row.get("account_name");
            let slot = balances.entry(code).or_insert((name, Decimal::zero()));

            let Some(debit_raw) = row.get::<Option<String>, _>("debit_amount") else {
                continue;
            };
            let entry_date = super::get_date_opt(row, "entry_date");
            let in_window = match (entry_date, start_date, end_date) {
                (None, _, _) => false,
                (Some(d), Some(start), _) if d < start => false,
                (Some(d), _, Some(end)) if d > end => false,
                _ => true,
            };
            if !in_window {
                continue;
            }

            let debit = super::parse_decimal_lenient(debit_raw, "ledger_entries.debit_amount");
            let credit = get_decimal(row, "credit_amount");
            let signed = if category.is_debit_normal() {
                debit - credit
            } else {
                credit - debit
            };
            slot.1 = slot.1 + signed;
        }

        Ok(balances
            .into_iter()
            .map(|(account_code, (name, balance))| AccountBalance {
                account_code,
                name,
                balance,
            })
            .collect())
    }

    /// Total signed balance for a category (sum over its accounts).
    pub async fn category_total(
        &self,
        category: AccountCategory,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Decimal, sqlx::Error> {
        let balances = self.category_balances(category, start_date, end_date).await?;
        let mut total = Decimal::zero();
        for account in &balances {
            total = total + account.balance;
        }
        Ok(total)
    }

    /// Profit-and-loss statement over a period.
    pub async fn profit_and_loss(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<ProfitAndLoss, sqlx::Error> {
        let revenue = self
            .category_balances(AccountCategory::Revenue, Some(start_date), Some(end_date))
            .await?;
        let expenses = self
            .category_balances(AccountCategory::Expense, Some(start_date), Some(end_date))
            .await?;

        let mut total_revenue = Decimal::zero();
        for account in &revenue {
            total_revenue = total_revenue + account.balance;
        }
        let mut total_expenses = Decimal::zero();
        for account in &expenses {
            total_expenses = total_expenses + account.balance;
        }

        Ok(ProfitAndLoss {
            start_date,
            end_date,
            revenue,
            total_revenue,
            expenses,
            total_expenses,
            net_profit: total_revenue - total_expenses,
        })
    }

    /// Balance sheet as of a date, with retained earnings (all-time net
    /// profit up to the date) folded into equity. The five category sweeps
    /// run concurrently against the pool.
    pub async fn balance_sheet(&self, as_of_date: NaiveDate) -> Result<BalanceSheet, sqlx::Error> {
        let (assets, liabilities, equity, revenue_total, expense_total) = futures::try_join!(
            self.category_balances(AccountCategory::Asset, None, Some(as_of_date)),
            self.category_balances(AccountCategory::Liability, None, Some(as_of_date)),
            self.category_balances(AccountCategory::Equity, None, Some(as_of_date)),
            self.category_total(AccountCategory::Revenue, None, Some(as_of_date)),
            self.category_total(AccountCategory::Expense, None, Some(as_of_date)),
        )?;

        let mut total_assets = Decimal::zero();
        for account in &assets {
            total_assets = total_assets + account.balance;
        }
        let mut total_liabilities = Decimal::zero();
        for account in &liabilities {
            total_liabilities = total_liabilities + account.balance;
        }
        let mut equity_balance = Decimal::zero();
        for account in &equity {
            equity_balance = equity_balance + account.balance;
        }

        let retained_earnings = revenue_total - expense_total;
        let total_equity = equity_balance + retained_earnings;

        Ok(BalanceSheet {
            as_of_date,
            assets,
            total_assets,
            liabilities,
            total_liabilities,
            equity,
            retained_earnings,
            total_equity,
            total_liabilities_and_equity: total_liabilities + total_equity,
        })
    }

    /// Debit and credit totals across one deal's ledger rows.
    pub async fn deal_posting_totals(
        &self,
        deal_number: &str,
    ) -> Result<(Decimal, Decimal), sqlx::Error> {
        let entries = self.ledger_entries_for_deal(deal_number).await?;
        let mut debits = Decimal::zero();
        let mut credits = Decimal::zero();
        for entry in &entries {
            debits = debits + entry.debit_amount;
            credits = credits + entry.credit_amount;
        }
        Ok((debits, credits))
    }
}
