//! Construction of balanced double-entry posting pairs.
//!
//! Account selection is driven by explicit posting rules (resolved from the
//! `posting_rules` table), not by account-code prefix conventions. Every deal
//! posts exactly one debit line and one credit line of equal amount; the
//! balance is re-checked against the built lines before they are committed.

use crate::domain::{AccountCode, Currency, Decimal};
use chrono::NaiveDate;

/// An account pair resolved from the posting-rules configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingRule {
    pub debit_account: AccountCode,
    pub credit_account: AccountCode,
}

/// Which side of a rule a resolved settlement account replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementSide {
    Debit,
    Credit,
}

impl PostingRule {
    /// Swap in a settlement account (bank code resolved to a COA code) for
    /// the cash side of the pair, keeping the control account fixed.
    pub fn with_settlement(
        &self,
        settlement: Option<&AccountCode>,
        side: SettlementSide,
    ) -> PostingRule {
        let Some(code) = settlement else {
            return self.clone();
        };
        match side {
            SettlementSide::Debit => PostingRule {
                debit_account: code.clone(),
                credit_account: self.credit_account.clone(),
            },
            SettlementSide::Credit => PostingRule {
                debit_account: self.debit_account.clone(),
                credit_account: code.clone(),
            },
        }
    }
}

/// One ledger row about to be inserted. Exactly one side is nonzero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerLine {
    pub account_code: AccountCode,
    pub entry_date: NaiveDate,
    pub debit_amount: Decimal,
    pub credit_amount: Decimal,
    pub currency: Currency,
    pub description: String,
}

/// A balanced debit/credit pair for one deal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingPair {
    pub debit: LedgerLine,
    pub credit: LedgerLine,
}

impl PostingPair {
    /// Build a pair posting `amount` (taken as magnitude) through `rule`.
    pub fn new(
        rule: &PostingRule,
        amount: Decimal,
        entry_date: NaiveDate,
        currency: &Currency,
        debit_description: String,
        credit_description: String,
    ) -> PostingPair {
        let magnitude = amount.abs();
        PostingPair {
            debit: LedgerLine {
                account_code: rule.debit_account.clone(),
                entry_date,
                debit_amount: magnitude,
                credit_amount: Decimal::zero(),
                currency: currency.clone(),
                description: debit_description,
            },
            credit: LedgerLine {
                account_code: rule.credit_account.clone(),
                entry_date,
                debit_amount: Decimal::zero(),
                credit_amount: magnitude,
                currency: currency.clone(),
                description: credit_description,
            },
        }
    }

    pub fn lines(&self) -> [&LedgerLine; 2] {
        [&self.debit, &self.credit]
    }
}

/// Classify a generic transaction by sign and build its posting pair.
///
/// Non-negative amounts recognize revenue (debit cash, credit revenue);
/// negative amounts recognize an expense (debit expense, credit cash).
pub fn pair_for_transaction(
    amount: Decimal,
    entry_date: NaiveDate,
    currency: &Currency,
    description: &str,
    inflow_rule: &PostingRule,
    outflow_rule: &PostingRule,
) -> PostingPair {
    if amount.is_negative() {
        PostingPair::new(
            outflow_rule,
            amount,
            entry_date,
            currency,
            format!("{} - Expense Recognition", description),
            format!("{} - Cash/Bank Decrease", description),
        )
    } else {
        PostingPair::new(
            inflow_rule,
            amount,
            entry_date,
            currency,
            format!("{} - Cash/Bank Increase", description),
            format!("{} - Revenue Recognition", description),
        )
    }
}

/// Verify the double-entry invariant over a set of lines.
///
/// Returns the (debit, credit) totals on imbalance so the caller can abort
/// the enclosing transaction with a diagnostic.
pub fn check_balanced(lines: &[LedgerLine]) -> Result<(), (Decimal, Decimal)> {
    let mut debits = Decimal::zero();
    let mut credits = Decimal::zero();
    for line in lines {
        debits = debits + line.debit_amount;
        credits = credits + line.credit_amount;
    }
    if debits == credits {
        Ok(())
    } else {
        Err((debits, credits))
    }
}
