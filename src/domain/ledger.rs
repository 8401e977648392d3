//! Ledger and chart-of-accounts types.

use crate::domain::{AccountCode, Currency, DealNumber, Decimal};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Top-level accounting category of an account type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountCategory {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountCategory::Asset => "asset",
            AccountCategory::Liability => "liability",
            AccountCategory::Equity => "equity",
            AccountCategory::Revenue => "revenue",
            AccountCategory::Expense => "expense",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asset" => Some(AccountCategory::Asset),
            "liability" => Some(AccountCategory::Liability),
            "equity" => Some(AccountCategory::Equity),
            "revenue" => Some(AccountCategory::Revenue),
            "expense" => Some(AccountCategory::Expense),
            _ => None,
        }
    }

    /// Debit-normal categories grow with debits; the rest grow with credits.
    pub fn is_debit_normal(&self) -> bool {
        matches!(self, AccountCategory::Asset | AccountCategory::Expense)
    }
}

impl std::fmt::Display for AccountCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable general-ledger row. Exactly one of debit/credit is nonzero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: i64,
    pub deal_number: DealNumber,
    pub account_id: i64,
    pub account_code: Option<AccountCode>,
    pub account_name: Option<String>,
    pub entry_date: NaiveDate,
    pub debit_amount: Decimal,
    pub credit_amount: Decimal,
    pub currency: Currency,
    pub description: Option<String>,
}

/// Coupon schedule row for one ISIN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponScheduleEntry {
    pub coupon_number: i64,
    pub coupon_date: NaiveDate,
    pub coupon_amount: Decimal,
    /// Nonzero only on the terminal (maturity) entry.
    pub principal: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        for cat in [
            AccountCategory::Asset,
            AccountCategory::Liability,
            AccountCategory::Equity,
            AccountCategory::Revenue,
            AccountCategory::Expense,
        ] {
            assert_eq!(AccountCategory::parse(cat.as_str()), Some(cat));
        }
        assert_eq!(AccountCategory::parse("contra"), None);
    }

    #[test]
    fn test_debit_normal_sides() {
        assert!(AccountCategory::Asset.is_debit_normal());
        assert!(AccountCategory::Expense.is_debit_normal());
        assert!(!AccountCategory::Liability.is_debit_normal());
        assert!(!AccountCategory::Revenue.is_debit_normal());
        assert!(!AccountCategory::Equity.is_debit_normal());
    }
}
