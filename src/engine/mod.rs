//! Pure computation engines for deterministic financial logic.
//!
//! Nothing in this module performs I/O: arithmetic, coupon schedules, limit
//! decisions, and posting-pair construction all operate on values handed in
//! by the lifecycle layer, which owns the enclosing database transaction.

pub mod arith;
pub mod coupons;
pub mod limits;
pub mod posting;

pub use arith::{accrued_interest, dirty_price, per_day_accrual, truncate4};
pub use coupons::{generate_coupon_schedule, prev_and_next_coupon_date, CouponWindow};
pub use limits::{
    evaluate_limits, CounterpartyLimits, ExposureSnapshot, LimitBreach, LimitDecision,
};
pub use posting::{
    check_balanced, pair_for_transaction, LedgerLine, PostingPair, PostingRule, SettlementSide,
};
