//! Financial arithmetic: truncation-based rounding and price derivation.
//!
//! All functions are pure. Truncation is always toward zero; monetary values
//! never round up and never gain magnitude.

use crate::domain::Decimal;

/// Truncate (never round) to 4 decimal places.
pub fn truncate4(value: Decimal) -> Decimal {
    value.trunc_scale(4)
}

/// Dirty price = truncated clean price + truncated accrued interest.
pub fn dirty_price(clean_price: Decimal, accrued_interest: Decimal) -> Decimal {
    truncate4(clean_price) + truncate4(accrued_interest)
}

/// Interest accrued since the last coupon date for a semiannual-coupon bond:
/// one coupon period's interest scaled by elapsed days over period days.
///
/// Returns zero when the coupon period length is zero.
pub fn accrued_interest(
    face_value: Decimal,
    coupon_rate_pct: Decimal,
    days_accrued: i64,
    days_in_period: i64,
) -> Decimal {
    if days_in_period == 0 {
        return Decimal::zero();
    }
    let period_coupon = face_value * coupon_rate_pct / Decimal::from_i64(200);
    period_coupon * Decimal::from_i64(days_accrued) / Decimal::from_i64(days_in_period)
}

/// One day's interest accrual on a position, per the instrument's day basis.
pub fn per_day_accrual(face_value: Decimal, coupon_rate_pct: Decimal, day_basis: i64) -> Decimal {
    if day_basis == 0 {
        return Decimal::zero();
    }
    face_value * coupon_rate_pct / Decimal::hundred() / Decimal::from_i64(day_basis)
}
