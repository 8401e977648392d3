//! End-of-day batch: daily accrual postings plus the business-date advance.
//!
//! The batch is single-flight (a second concurrent run fails fast), posts
//! with one transaction per deal so a failure never forces a full retry, and
//! is idempotent per (deal, business day) through the `eod_postings` unique
//! constraint.

use crate::db::repo::{
    insert_ledger_lines_tx, posting_rule_tx, record_eod_posting_tx, GsecAccrualRow,
    MoneyMarketAccrualRow,
};
use crate::db::Repository;
use crate::domain::{Currency, Decimal, MoneyMarketSide};
use crate::engine::{check_balanced, PostingPair};
use crate::error::AppError;
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Outcome of one EOD run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EodResult {
    pub posted_money_market: u32,
    pub posted_gsec: u32,
    pub skipped: u32,
    pub next_system_day: NaiveDate,
}

/// Runs the EOD batch and owns the business-date write lock.
pub struct EodRunner {
    repo: Arc<Repository>,
    day_lock: Mutex<()>,
}

impl EodRunner {
    pub fn new(repo: Arc<Repository>) -> Self {
        EodRunner {
            repo,
            day_lock: Mutex::new(()),
        }
    }

    /// Set the business date explicitly, serialized with any running batch.
    pub async fn set_system_day(&self, date: NaiveDate) -> Result<(), AppError> {
        let _guard = self.day_lock.lock().await;
        self.repo.set_system_day(date).await?;
        info!(system_day = %date, "System day set");
        Ok(())
    }

    /// Run the batch: accruals for open money-market and GSec deals, then
    /// advance the system day by one calendar day.
    pub async fn run(&self) -> Result<EodResult, AppError> {
        let Ok(_guard) = self.day_lock.try_lock() else {
            return Err(AppError::Conflict("EOD batch already running".to_string()));
        };

        let system_day = self
            .repo
            .get_system_day()
            .await?
            .ok_or_else(|| AppError::Validation("system day is not set".to_string()))?;

        let mut posted_money_market = 0u32;
        let mut posted_gsec = 0u32;
        let mut skipped = 0u32;

        let mm_deals = self.repo.money_market_deals_for_accrual(system_day).await?;
        info!(count = mm_deals.len(), system_day = %system_day, "EOD money-market pass");
        for deal in &mm_deals {
            match self.post_money_market_accrual(deal, system_day).await {
                Ok(true) => posted_money_market += 1,
                Ok(false) => skipped += 1,
                Err(e) => {
                    // One bad deal never fails the batch.
                    warn!(deal_number = %deal.deal_number, error = %e, "EOD money-market posting failed");
                    skipped += 1;
                }
            }
        }

        let gsec_deals = self.repo.gsec_deals_for_accrual(system_day).await?;
        info!(count = gsec_deals.len(), system_day = %system_day, "EOD GSec pass");
        for deal in &gsec_deals {
            match self.post_gsec_accrual(deal, system_day).await {
                Ok(true) => posted_gsec += 1,
                Ok(false) => skipped += 1,
                Err(e) => {
                    warn!(deal_number = %deal.deal_number, error = %e, "EOD GSec posting failed");
                    skipped += 1;
                }
            }
        }

        let next_system_day = system_day
            .checked_add_days(Days::new(1))
            .ok_or_else(|| AppError::Internal("system day overflow".to_string()))?;
        self.repo.set_system_day(next_system_day).await?;

        info!(
            posted_money_market,
            posted_gsec,
            skipped,
            next_system_day = %next_system_day,
            "EOD complete"
        );

        Ok(EodResult {
            posted_money_market,
            posted_gsec,
            skipped,
            next_system_day,
        })
    }

    /// Post one day's interest for a money-market deal. Returns false when
    /// the deal is skipped (unparseable fields or already posted today).
    async fn post_money_market_accrual(
        &self,
        deal: &MoneyMarketAccrualRow,
        system_day: NaiveDate,
    ) -> Result<bool, AppError> {
        let Some(amount) = parse_accrual_amount(deal.per_day_interest.as_deref()) else {
            warn!(
                deal_number = %deal.deal_number,
                per_day_interest = ?deal.per_day_interest,
                "Skipping deal with missing or non-numeric per-day interest"
            );
            return Ok(false);
        };

        let side = deal.deal_type.as_deref().and_then(MoneyMarketSide::parse);
        let Some(side) = side else {
            warn!(
                deal_number = %deal.deal_number,
                deal_type = ?deal.deal_type,
                "Skipping deal with unrecognized deal type"
            );
            return Ok(false);
        };

        let (rule_key, description) = match side {
            MoneyMarketSide::Lending => ("mm_lending_accrual", "Daily lending interest EOD"),
            MoneyMarketSide::Borrowing => ("mm_borrowing_accrual", "Daily borrowing interest EOD"),
        };

        self.post_accrual_pair(&deal.deal_number, &deal.currency, rule_key, amount, system_day, description)
            .await
    }

    /// Post one day's accrual for a GSec deal. Only positive accruals post.
    async fn post_gsec_accrual(
        &self,
        deal: &GsecAccrualRow,
        system_day: NaiveDate,
    ) -> Result<bool, AppError> {
        let Some(amount) = parse_accrual_amount(deal.per_day_accrual.as_deref()) else {
            warn!(
                deal_number = %deal.deal_number,
                per_day_accrual = ?deal.per_day_accrual,
                "Skipping GSec deal with missing or non-numeric per-day accrual"
            );
            return Ok(false);
        };
        if !amount.is_positive() {
            return Ok(false);
        }

        let description = format!("GSec Daily Accrual for Deal {}", deal.deal_number);
        self.post_accrual_pair(
            &deal.deal_number,
            &deal.currency,
            "gsec_accrual",
            amount,
            system_day,
            &description,
        )
        .await
    }

    /// One deal's accrual posting in its own transaction, guarded by the
    /// per-(deal, day) idempotency row.
    async fn post_accrual_pair(
        &self,
        deal_number: &str,
        currency: &str,
        rule_key: &str,
        amount: Decimal,
        system_day: NaiveDate,
        description: &str,
    ) -> Result<bool, AppError> {
        let mut tx = self.repo.pool().begin().await?;

        if !record_eod_posting_tx(&mut tx, deal_number, system_day).await? {
            info!(deal_number, system_day = %system_day, "Accrual already posted for this day, skipping");
            return Ok(false);
        }

        let rule = posting_rule_tx(&mut tx, rule_key).await?;
        let pair = PostingPair::new(
            &rule,
            amount,
            system_day,
            &Currency::new(currency.to_string()),
            description.to_string(),
            description.to_string(),
        );
        let lines = [pair.debit.clone(), pair.credit.clone()];
        check_balanced(&lines).map_err(|(debits, credits)| AppError::LedgerImbalance {
            deal_number: deal_number.to_string(),
            debits: debits.to_canonical_string(),
            credits: credits.to_canonical_string(),
        })?;
        insert_ledger_lines_tx(&mut tx, deal_number, &lines).await?;

        tx.commit().await?;
        Ok(true)
    }
}

fn parse_accrual_amount(raw: Option<&str>) -> Option<Decimal> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw).ok()
}
