//! The deal lifecycle manager.
//!
//! Every mutation runs inside one sqlx transaction: normalization, limit
//! check, numbering, the deal row, balance adjustments, and the ledger pair
//! commit together or not at all.

use crate::config::Config;
use crate::db::repo::{
    self, adjust_account_balance_tx, delete_ledger_entries_for_deal_tx, exposure_snapshot_tx,
    get_counterparty_limits_tx, insert_ledger_lines_tx, posting_rule_tx,
    settlement_account_code_tx, transaction_product_type_tx,
};
use crate::db::Repository;
use crate::domain::{
    ApprovalLevel, CounterpartyType, Currency, Deal, DealStatus, Decimal, GsecDeal, Isin,
    MoneyMarketDeal, MoneyMarketSide, Principal, ProductType, TradeType,
};
use crate::engine::{
    self, check_balanced, evaluate_limits, pair_for_transaction, LimitDecision, PostingPair,
    SettlementSide,
};
use crate::error::AppError;
use crate::lifecycle::numbering::{generate_deal_number, generate_money_market_number};
use crate::lifecycle::workflow::{
    decide_workflow, validate_field_edit, WorkflowContext, WorkflowOutcome, WorkflowRequest,
};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::sqlite::SqliteConnection;
use std::sync::Arc;
use tracing::info;

/// Payload for creating a generic transaction.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub source_account_id: Option<i64>,
    pub category: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub txn_date: Option<NaiveDate>,
    pub trade_date: Option<NaiveDate>,
    pub value_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub counterparty_id: Option<i64>,
    pub counterparty_type: Option<String>,
    pub transaction_type_id: Option<i64>,
    pub price: Option<Decimal>,
    #[serde(rename = "yield")]
    pub yield_pct: Option<Decimal>,
    pub portfolio: Option<String>,
    pub strategy: Option<String>,
    pub commission: Option<Decimal>,
    pub brokerage: Option<Decimal>,
    pub remarks: Option<String>,
}

/// Patch applied to a generic transaction: a pure workflow decision, an
/// authorizer escalation, or a business-field edit.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatch {
    pub status: Option<String>,
    pub comment: Option<String>,
    pub approval_status: Option<String>,
    pub current_approval_level: Option<String>,
    pub source_account_id: Option<i64>,
    pub category: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub txn_date: Option<NaiveDate>,
    pub trade_date: Option<NaiveDate>,
    pub value_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub counterparty_id: Option<i64>,
    pub counterparty_type: Option<String>,
    pub transaction_type_id: Option<i64>,
    pub price: Option<Decimal>,
    #[serde(rename = "yield")]
    pub yield_pct: Option<Decimal>,
    pub portfolio: Option<String>,
    pub strategy: Option<String>,
    pub commission: Option<Decimal>,
    pub brokerage: Option<Decimal>,
    pub remarks: Option<String>,
}

impl TransactionPatch {
    fn has_business_fields(&self) -> bool {
        self.source_account_id.is_some()
            || self.category.is_some()
            || self.amount.is_some()
            || self.currency.is_some()
            || self.txn_date.is_some()
            || self.trade_date.is_some()
            || self.value_date.is_some()
            || self.description.is_some()
            || self.counterparty_id.is_some()
            || self.counterparty_type.is_some()
            || self.transaction_type_id.is_some()
            || self.price.is_some()
            || self.yield_pct.is_some()
            || self.portfolio.is_some()
            || self.strategy.is_some()
            || self.commission.is_some()
            || self.brokerage.is_some()
            || self.remarks.is_some()
    }

    fn is_decision(&self) -> bool {
        self.status.is_some() && !self.has_business_fields()
    }

    fn is_escalation(&self) -> bool {
        self.status.is_none()
            && (self.approval_status.is_some() || self.current_approval_level.is_some())
            && !self.has_business_fields()
    }
}

/// Payload for capturing a GSec deal.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewGsecDeal {
    pub trade_type: Option<String>,
    pub counterparty_id: Option<i64>,
    pub counterparty_type: Option<String>,
    pub isin: Option<String>,
    pub face_value: Option<Decimal>,
    pub value_date: Option<NaiveDate>,
    pub last_coupon_date: Option<NaiveDate>,
    pub next_coupon_date: Option<NaiveDate>,
    pub accrued_interest: Option<Decimal>,
    pub coupon_interest: Option<Decimal>,
    pub clean_price: Option<Decimal>,
    pub settlement_amount: Option<Decimal>,
    pub settlement_bank_code: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub maturity_date: Option<NaiveDate>,
    pub per_day_accrual: Option<Decimal>,
    #[serde(rename = "yield")]
    pub yield_pct: Option<Decimal>,
    pub brokerage: Option<Decimal>,
    pub currency: Option<String>,
    pub portfolio: Option<String>,
    pub strategy: Option<String>,
    pub broker: Option<String>,
}

/// Workflow-only patch for a GSec deal.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GsecStatusPatch {
    pub status: Option<String>,
    pub comment: Option<String>,
    pub approval_status: Option<String>,
    pub current_approval_level: Option<String>,
}

/// Payload for capturing a money-market deal.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewMoneyMarketDeal {
    pub trade_date: Option<NaiveDate>,
    pub value_date: Option<NaiveDate>,
    pub maturity_date: Option<NaiveDate>,
    pub counterparty_id: Option<i64>,
    pub counterparty_type: Option<String>,
    pub product_code: Option<String>,
    pub deal_type: Option<String>,
    pub currency: Option<String>,
    pub principal_amount: Option<Decimal>,
    pub interest_rate: Option<Decimal>,
    pub tenor: Option<i64>,
    pub interest_amount: Option<Decimal>,
    pub maturity_value: Option<Decimal>,
    pub per_day_interest: Option<Decimal>,
    pub settlement_bank_code: Option<String>,
}

/// Orchestrates deal creation, update, and deletion.
///
/// Deal mutations are read-then-write transactions (limit check, numbering,
/// insert); SQLite has no row-level `SELECT ... FOR UPDATE`, so the service
/// serializes its own writers through `write_lock` to close the
/// check-then-act races. The deal-number UNIQUE constraints remain the
/// backstop against any writer outside this process.
pub struct DealService {
    repo: Arc<Repository>,
    default_currency: Currency,
    write_lock: tokio::sync::Mutex<()>,
}

fn require<T>(value: Option<T>, field: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

fn parse_status(value: &str) -> Result<DealStatus, AppError> {
    DealStatus::parse(value)
        .ok_or_else(|| AppError::Validation(format!("invalid status: {}", value)))
}

fn parse_level(value: &str) -> Result<ApprovalLevel, AppError> {
    ApprovalLevel::parse(value)
        .ok_or_else(|| AppError::Validation(format!("invalid approval level: {}", value)))
}

fn parse_counterparty_type(value: Option<&str>) -> Result<CounterpartyType, AppError> {
    match value {
        None => Ok(CounterpartyType::Individual),
        Some(raw) => CounterpartyType::parse(raw)
            .ok_or_else(|| AppError::Validation(format!("invalid counterparty type: {}", raw))),
    }
}

impl DealService {
    pub fn new(repo: Arc<Repository>, config: &Config) -> Self {
        DealService {
            repo,
            default_currency: Currency::new(config.default_currency.clone()),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn currency_or_default(&self, currency: Option<&str>) -> Currency {
        currency
            .filter(|c| !c.trim().is_empty())
            .map(|c| Currency::new(c.to_string()))
            .unwrap_or_else(|| self.default_currency.clone())
    }

    /// Enforce the exposure limit inside the deal's transaction.
    async fn enforce_limit(
        &self,
        conn: &mut SqliteConnection,
        counterparty_id: i64,
        counterparty_type: CounterpartyType,
        product: ProductType,
        currency: &Currency,
        amount: Decimal,
    ) -> Result<(), AppError> {
        let limits =
            get_counterparty_limits_tx(conn, counterparty_id, counterparty_type, currency).await?;
        let exposure = exposure_snapshot_tx(conn, counterparty_id, product, currency).await?;
        match evaluate_limits(limits.as_ref(), product, currency, &exposure, amount) {
            LimitDecision::Allowed => Ok(()),
            LimitDecision::Denied(breach) => Err(AppError::LimitExceeded(breach)),
        }
    }

    /// Assert the double-entry invariant and persist the pair.
    async fn post_pair(
        &self,
        conn: &mut SqliteConnection,
        deal_number: &str,
        pair: &PostingPair,
    ) -> Result<(), AppError> {
        let lines = [pair.debit.clone(), pair.credit.clone()];
        check_balanced(&lines).map_err(|(debits, credits)| AppError::LedgerImbalance {
            deal_number: deal_number.to_string(),
            debits: debits.to_canonical_string(),
            credits: credits.to_canonical_string(),
        })?;
        insert_ledger_lines_tx(conn, deal_number, &lines).await?;
        Ok(())
    }

    // =========================================================================
    // Generic transactions
    // =========================================================================

    /// Create a generic transaction: limit check, numbering, deal row,
    /// balance adjustment, and ledger pair in one atomic transaction.
    pub async fn create_transaction(
        &self,
        input: NewTransaction,
        principal: &Principal,
    ) -> Result<Deal, AppError> {
        let amount = require(input.amount, "amount")?;
        if amount.is_zero() {
            return Err(AppError::Validation("amount is required".to_string()));
        }
        let currency = self.currency_or_default(input.currency.as_deref());
        let txn_date = input
            .txn_date
            .unwrap_or_else(|| chrono::Utc::now().date_naive());

        let _write = self.write_lock.lock().await;
        let mut tx = self.repo.pool().begin().await?;

        if let Some(counterparty_id) = input.counterparty_id {
            let counterparty_type = parse_counterparty_type(input.counterparty_type.as_deref())?;
            let product = match input.transaction_type_id {
                Some(type_id) => transaction_product_type_tx(&mut tx, type_id)
                    .await?
                    .unwrap_or(ProductType::Transaction),
                None => ProductType::Transaction,
            };
            self.enforce_limit(
                &mut tx,
                counterparty_id,
                counterparty_type,
                product,
                &currency,
                amount,
            )
            .await?;
        }

        let deal_number = generate_deal_number(&mut tx, txn_date).await?;

        let deal = Deal {
            deal_number: deal_number.clone(),
            source_account_id: input.source_account_id,
            category: input.category,
            amount,
            currency: currency.clone(),
            txn_date,
            trade_date: input.trade_date,
            value_date: input.value_date,
            description: input.description,
            counterparty_id: input.counterparty_id,
            counterparty_type: input.counterparty_type,
            transaction_type_id: input.transaction_type_id,
            price: input.price,
            yield_pct: input.yield_pct,
            portfolio: input.portfolio,
            strategy: input.strategy,
            commission: input.commission,
            brokerage: input.brokerage,
            remarks: input.remarks,
            status: DealStatus::Pending,
            approval_status: DealStatus::Pending,
            current_approval_level: ApprovalLevel::FrontOffice,
            approval_chain: Vec::new(),
            submitted_by: principal.username.clone(),
            comment: None,
        };
        repo::insert_transaction_tx(&mut tx, &deal).await?;

        if let Some(account_id) = deal.source_account_id {
            adjust_account_balance_tx(&mut tx, account_id, amount).await?;
        }

        let inflow = posting_rule_tx(&mut tx, "transaction_inflow").await?;
        let outflow = posting_rule_tx(&mut tx, "transaction_outflow").await?;
        let description = deal
            .description
            .clone()
            .unwrap_or_else(|| format!("Transaction {}", deal_number));
        let pair = pair_for_transaction(
            amount,
            txn_date,
            &currency,
            &description,
            &inflow,
            &outflow,
        );
        self.post_pair(&mut tx, deal_number.as_str(), &pair).await?;

        tx.commit().await?;
        info!(deal_number = %deal_number, amount = %amount, "Transaction created");

        self.repo
            .get_transaction(deal_number.as_str())
            .await?
            .ok_or_else(|| AppError::Internal("created deal not found".to_string()))
    }

    /// Update a generic transaction: a workflow decision, an authorizer
    /// escalation, or a business-field edit.
    pub async fn update_transaction(
        &self,
        deal_number: &str,
        patch: TransactionPatch,
        principal: &Principal,
    ) -> Result<Deal, AppError> {
        let _write = self.write_lock.lock().await;
        let mut tx = self.repo.pool().begin().await?;

        let deal = repo::get_transaction_tx(&mut tx, deal_number)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("transaction {} not found", deal_number))
            })?;

        if patch.is_decision() || patch.is_escalation() {
            let request = if patch.is_decision() {
                WorkflowRequest::Decision {
                    status: parse_status(patch.status.as_deref().unwrap_or_default())?,
                    comment: patch.comment.clone(),
                }
            } else {
                WorkflowRequest::Escalation {
                    approval_status: patch
                        .approval_status
                        .as_deref()
                        .map(parse_status)
                        .transpose()?,
                    current_approval_level: patch
                        .current_approval_level
                        .as_deref()
                        .map(parse_level)
                        .transpose()?,
                }
            };

            let ctx = WorkflowContext {
                principal,
                status: deal.status,
                current_level: deal.current_approval_level,
                submitted_by: &deal.submitted_by,
            };
            let outcome = decide_workflow(&ctx, &request)?;
            self.apply_transaction_workflow(&mut tx, deal_number, &deal, outcome)
                .await?;
        } else {
            let effect = validate_field_edit(principal, deal.status, &deal.submitted_by)?;
            let amount = patch
                .amount
                .ok_or_else(|| AppError::Validation("amount is required".to_string()))?;

            let mut updated = Deal {
                source_account_id: patch.source_account_id.or(deal.source_account_id),
                category: patch.category.clone().or(deal.category.clone()),
                amount,
                currency: patch
                    .currency
                    .as_deref()
                    .map(|c| Currency::new(c.to_string()))
                    .unwrap_or_else(|| deal.currency.clone()),
                txn_date: patch.txn_date.unwrap_or(deal.txn_date),
                trade_date: patch.trade_date.or(deal.trade_date),
                value_date: patch.value_date.or(deal.value_date),
                description: patch.description.clone().or(deal.description.clone()),
                counterparty_id: patch.counterparty_id.or(deal.counterparty_id),
                counterparty_type: patch
                    .counterparty_type
                    .clone()
                    .or(deal.counterparty_type.clone()),
                transaction_type_id: patch.transaction_type_id.or(deal.transaction_type_id),
                price: patch.price.or(deal.price),
                yield_pct: patch.yield_pct.or(deal.yield_pct),
                portfolio: patch.portfolio.clone().or(deal.portfolio.clone()),
                strategy: patch.strategy.clone().or(deal.strategy.clone()),
                commission: patch.commission.or(deal.commission),
                brokerage: patch.brokerage.or(deal.brokerage),
                remarks: patch.remarks.clone().or(deal.remarks.clone()),
                ..deal.clone()
            };
            if effect.reset_to_pending {
                updated.status = DealStatus::Pending;
                updated.approval_status = DealStatus::Pending;
            }
            if let Some(comment) = patch.comment.clone() {
                updated.comment = Some(comment);
            }

            self.rebalance_and_repost(&mut tx, &deal, &updated).await?;
            repo::update_transaction_fields_tx(&mut tx, &updated).await?;
        }

        tx.commit().await?;

        self.repo
            .get_transaction(deal_number)
            .await?
            .ok_or_else(|| AppError::Internal("updated deal not found".to_string()))
    }

    async fn apply_transaction_workflow(
        &self,
        conn: &mut SqliteConnection,
        deal_number: &str,
        deal: &Deal,
        outcome: WorkflowOutcome,
    ) -> Result<(), AppError> {
        let mut chain = deal.approval_chain.clone();
        if let Some(step) = outcome.step {
            chain.push(step);
        }
        repo::update_transaction_workflow_tx(
            conn,
            deal_number,
            outcome.status,
            outcome.approval_status,
            outcome.current_approval_level,
            &chain,
            outcome.comment.as_deref(),
        )
        .await?;
        Ok(())
    }

    /// Re-apply balance adjustments and re-post the ledger pair after a
    /// business-field edit changed amount, account, or dates.
    async fn rebalance_and_repost(
        &self,
        conn: &mut SqliteConnection,
        old: &Deal,
        new: &Deal,
    ) -> Result<(), AppError> {
        let amount_changed = old.amount != new.amount;
        let account_changed = old.source_account_id != new.source_account_id;

        if amount_changed || account_changed {
            match (old.source_account_id, new.source_account_id) {
                (Some(old_account), Some(new_account)) if old_account == new_account => {
                    adjust_account_balance_tx(conn, old_account, new.amount - old.amount).await?;
                }
                (old_account, new_account) => {
                    if let Some(account) = old_account {
                        adjust_account_balance_tx(conn, account, -old.amount).await?;
                    }
                    if let Some(account) = new_account {
                        adjust_account_balance_tx(conn, account, new.amount).await?;
                    }
                }
            }
        }

        delete_ledger_entries_for_deal_tx(conn, old.deal_number.as_str()).await?;
        let inflow = posting_rule_tx(conn, "transaction_inflow").await?;
        let outflow = posting_rule_tx(conn, "transaction_outflow").await?;
        let description = new
            .description
            .clone()
            .unwrap_or_else(|| format!("Transaction {}", new.deal_number));
        let pair = pair_for_transaction(
            new.amount,
            new.txn_date,
            &new.currency,
            &description,
            &inflow,
            &outflow,
        );
        self.post_pair(conn, old.deal_number.as_str(), &pair).await
    }

    /// Delete a transaction: reverse its balance adjustment and remove its
    /// ledger entries before the deal row itself, atomically.
    pub async fn delete_transaction(&self, deal_number: &str) -> Result<(), AppError> {
        let _write = self.write_lock.lock().await;
        let mut tx = self.repo.pool().begin().await?;

        let deal = repo::get_transaction_tx(&mut tx, deal_number)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("transaction {} not found", deal_number))
            })?;

        if let Some(account_id) = deal.source_account_id {
            adjust_account_balance_tx(&mut tx, account_id, -deal.amount).await?;
        }
        delete_ledger_entries_for_deal_tx(&mut tx, deal_number).await?;
        repo::delete_transaction_tx(&mut tx, deal_number).await?;

        tx.commit().await?;
        info!(deal_number, "Transaction deleted");
        Ok(())
    }

    // =========================================================================
    // GSec deals
    // =========================================================================

    /// Capture a GSec deal: truncation-normalize prices, check the GSec
    /// limit, allocate a number, and post the settlement pair atomically.
    pub async fn create_gsec(
        &self,
        input: NewGsecDeal,
        principal: &Principal,
    ) -> Result<GsecDeal, AppError> {
        let trade_type_raw = require(input.trade_type, "tradeType")?;
        let trade_type = TradeType::parse(&trade_type_raw)
            .ok_or_else(|| AppError::Validation(format!("invalid trade type: {}", trade_type_raw)))?;
        let counterparty_id = require(input.counterparty_id, "counterpartyId")?;
        let isin = Isin::new(require(input.isin, "isin")?);
        let face_value = require(input.face_value, "faceValue")?;
        let value_date = require(input.value_date, "valueDate")?;
        let maturity_date = require(input.maturity_date, "maturityDate")?;
        let currency = self.currency_or_default(input.currency.as_deref());

        // Truncate, never round, to 4 decimals before anything is stored.
        let accrued_interest = input.accrued_interest.map(engine::truncate4);
        let clean_price = input.clean_price.map(engine::truncate4);
        let dirty_price = match (clean_price, accrued_interest) {
            (Some(clean), Some(accrued)) => Some(clean + accrued),
            _ => None,
        };

        // Fill coupon-window and accrual fields from the ISIN master when
        // the caller left them out.
        let isin_record = self.repo.get_isin(isin.as_str()).await?;
        let schedule = self.repo.coupon_schedule(isin.as_str()).await?;
        let window = engine::prev_and_next_coupon_date(&schedule, value_date);
        let last_coupon_date = input.last_coupon_date.or(window.map(|w| w.previous));
        let next_coupon_date = input.next_coupon_date.or(window.map(|w| w.next));
        let per_day_accrual = input.per_day_accrual.or_else(|| {
            isin_record
                .as_ref()
                .map(|r| engine::per_day_accrual(face_value, r.coupon_rate, r.day_basis))
        });
        let accrued_interest = accrued_interest.or_else(|| {
            let record = isin_record.as_ref()?;
            let window = window?;
            // Only a real bracketing window gives meaningful day counts; the
            // schedule-boundary fallbacks do not.
            if window.previous > value_date || value_date > window.next {
                return None;
            }
            let days_accrued = (value_date - window.previous).num_days();
            let days_in_period = (window.next - window.previous).num_days();
            Some(engine::truncate4(engine::accrued_interest(
                face_value,
                record.coupon_rate,
                days_accrued,
                days_in_period,
            )))
        });
        let dirty_price = dirty_price.or(match (clean_price, accrued_interest) {
            (Some(clean), Some(accrued)) => Some(clean + accrued),
            _ => None,
        });

        let _write = self.write_lock.lock().await;
        let mut tx = self.repo.pool().begin().await?;

        let counterparty_type = parse_counterparty_type(input.counterparty_type.as_deref())?;
        self.enforce_limit(
            &mut tx,
            counterparty_id,
            counterparty_type,
            ProductType::Gsec,
            &currency,
            face_value,
        )
        .await?;

        let deal_number = generate_deal_number(&mut tx, value_date).await?;

        let deal = GsecDeal {
            deal_number: deal_number.clone(),
            trade_type,
            counterparty_id,
            counterparty_type: input.counterparty_type,
            isin,
            face_value,
            value_date,
            last_coupon_date,
            next_coupon_date,
            accrued_interest,
            coupon_interest: input.coupon_interest,
            clean_price,
            dirty_price,
            settlement_amount: input.settlement_amount,
            settlement_bank_code: input.settlement_bank_code,
            issue_date: input.issue_date.or(isin_record.as_ref().map(|r| r.issue_date)),
            maturity_date,
            per_day_accrual,
            yield_pct: input.yield_pct,
            brokerage: input.brokerage,
            currency: currency.clone(),
            portfolio: input.portfolio,
            strategy: input.strategy,
            broker: input.broker,
            status: DealStatus::Pending,
            approval_status: DealStatus::Pending,
            current_approval_level: ApprovalLevel::FrontOffice,
            approval_chain: Vec::new(),
            submitted_by: principal.username.clone(),
            comment: None,
        };
        repo::insert_gsec_tx(&mut tx, &deal).await?;

        // Settlement posting: the control account comes from the rule, the
        // cash side from the deal's settlement instruction when mapped.
        let (rule_key, cash_side) = match trade_type {
            TradeType::Buy => ("gsec_buy_settlement", SettlementSide::Credit),
            TradeType::Sell => ("gsec_sell_settlement", SettlementSide::Debit),
        };
        let rule = posting_rule_tx(&mut tx, rule_key).await?;
        let settlement = match &deal.settlement_bank_code {
            Some(bank_code) => settlement_account_code_tx(&mut tx, bank_code).await?,
            None => None,
        };
        let rule = rule.with_settlement(settlement.as_ref(), cash_side);
        let amount = deal.settlement_amount.unwrap_or(face_value);
        let pair = PostingPair::new(
            &rule,
            amount,
            value_date,
            &currency,
            format!("GSec {} settlement - {}", trade_type.as_str(), deal_number),
            format!("GSec {} settlement - {}", trade_type.as_str(), deal_number),
        );
        self.post_pair(&mut tx, deal_number.as_str(), &pair).await?;

        tx.commit().await?;
        info!(deal_number = %deal_number, face_value = %face_value, "GSec deal created");

        self.repo
            .get_gsec(deal_number.as_str())
            .await?
            .ok_or_else(|| AppError::Internal("created deal not found".to_string()))
    }

    /// Move a GSec deal through the approval workflow.
    pub async fn update_gsec_status(
        &self,
        deal_number: &str,
        patch: GsecStatusPatch,
        principal: &Principal,
    ) -> Result<GsecDeal, AppError> {
        let _write = self.write_lock.lock().await;
        let mut tx = self.repo.pool().begin().await?;

        let deal = repo::get_gsec_tx(&mut tx, deal_number)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("GSec deal {} not found", deal_number)))?;

        let request = match &patch.status {
            Some(status) => WorkflowRequest::Decision {
                status: parse_status(status)?,
                comment: patch.comment.clone(),
            },
            None => WorkflowRequest::Escalation {
                approval_status: patch
                    .approval_status
                    .as_deref()
                    .map(parse_status)
                    .transpose()?,
                current_approval_level: patch
                    .current_approval_level
                    .as_deref()
                    .map(parse_level)
                    .transpose()?,
            },
        };

        let ctx = WorkflowContext {
            principal,
            status: deal.status,
            current_level: deal.current_approval_level,
            submitted_by: &deal.submitted_by,
        };
        let outcome = decide_workflow(&ctx, &request)?;

        let mut chain = deal.approval_chain.clone();
        if let Some(step) = outcome.step {
            chain.push(step);
        }
        repo::update_gsec_workflow_tx(
            &mut tx,
            deal_number,
            outcome.status,
            outcome.approval_status,
            outcome.current_approval_level,
            &chain,
            outcome.comment.as_deref(),
        )
        .await?;

        tx.commit().await?;

        self.repo
            .get_gsec(deal_number)
            .await?
            .ok_or_else(|| AppError::Internal("updated deal not found".to_string()))
    }

    // =========================================================================
    // Money-market deals
    // =========================================================================

    /// Capture a money-market deal with a product-scoped sequential number
    /// and post its settlement pair.
    pub async fn create_money_market(
        &self,
        input: NewMoneyMarketDeal,
        principal: &Principal,
    ) -> Result<MoneyMarketDeal, AppError> {
        let trade_date = require(input.trade_date, "tradeDate")?;
        let value_date = require(input.value_date, "valueDate")?;
        let maturity_date = require(input.maturity_date, "maturityDate")?;
        let counterparty_id = require(input.counterparty_id, "counterpartyId")?;
        let product_code = require(input.product_code, "productCode")?;
        let deal_type_raw = require(input.deal_type, "dealType")?;
        let deal_type = MoneyMarketSide::parse(&deal_type_raw)
            .ok_or_else(|| AppError::Validation(format!("invalid deal type: {}", deal_type_raw)))?;
        let principal_amount = require(input.principal_amount, "principalAmount")?;
        let interest_rate = require(input.interest_rate, "interestRate")?;
        let tenor = require(input.tenor, "tenor")?;
        let currency = self.currency_or_default(input.currency.as_deref());

        let year_basis = Decimal::from_i64(365);
        let annual_interest = principal_amount * interest_rate / Decimal::hundred();
        let interest_amount = input
            .interest_amount
            .unwrap_or_else(|| annual_interest * Decimal::from_i64(tenor) / year_basis);
        let maturity_value = input
            .maturity_value
            .unwrap_or_else(|| principal_amount + interest_amount);
        let per_day_interest = input
            .per_day_interest
            .unwrap_or_else(|| annual_interest / year_basis);

        let _write = self.write_lock.lock().await;
        let mut tx = self.repo.pool().begin().await?;

        let deal_number = generate_money_market_number(&mut tx, trade_date, &product_code).await?;

        let deal = MoneyMarketDeal {
            deal_number: deal_number.clone(),
            trade_date,
            value_date,
            maturity_date,
            counterparty_id,
            counterparty_type: input.counterparty_type,
            product_code,
            deal_type,
            currency: currency.clone(),
            principal_amount,
            interest_rate,
            tenor,
            interest_amount: Some(interest_amount),
            maturity_value: Some(maturity_value),
            per_day_interest: Some(per_day_interest),
            settlement_bank_code: input.settlement_bank_code,
            status: DealStatus::Pending,
        };
        repo::insert_money_market_tx(&mut tx, &deal).await?;

        let (rule_key, cash_side) = match deal_type {
            MoneyMarketSide::Lending => ("mm_lending_settlement", SettlementSide::Credit),
            MoneyMarketSide::Borrowing => ("mm_borrowing_settlement", SettlementSide::Debit),
        };
        let rule = posting_rule_tx(&mut tx, rule_key).await?;
        let settlement = match &deal.settlement_bank_code {
            Some(bank_code) => settlement_account_code_tx(&mut tx, bank_code).await?,
            None => None,
        };
        let rule = rule.with_settlement(settlement.as_ref(), cash_side);
        let description = format!(
            "Money market {} settlement - {}",
            deal.deal_type.as_str(),
            deal_number
        );
        let pair = PostingPair::new(
            &rule,
            principal_amount,
            value_date,
            &currency,
            description.clone(),
            description,
        );
        self.post_pair(&mut tx, deal_number.as_str(), &pair).await?;

        tx.commit().await?;
        info!(
            deal_number = %deal_number,
            principal_amount = %principal_amount,
            by = %principal.username,
            "Money-market deal created"
        );

        self.repo
            .get_money_market(deal_number.as_str())
            .await?
            .ok_or_else(|| AppError::Internal("created deal not found".to_string()))
    }
}
