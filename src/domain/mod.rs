//! Domain types for the deal-lifecycle engine.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Domain primitives: DealNumber, Currency, AccountCode, Isin
//! - Deal, ledger, and workflow types
//! - Principals and the centralized capability check

pub mod deal;
pub mod decimal;
pub mod ledger;
pub mod primitives;
pub mod principal;

pub use deal::{
    ApprovalLevel, ApprovalStep, Deal, DealStatus, GsecDeal, MoneyMarketDeal, MoneyMarketSide,
    ProductType, TradeType,
};
pub use decimal::Decimal;
pub use ledger::{AccountCategory, CouponScheduleEntry, LedgerEntry};
pub use primitives::{AccountCode, CounterpartyType, Currency, DealNumber, Isin};
pub use principal::{Action, Principal, Role};
