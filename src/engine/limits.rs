//! Pure limit-evaluation logic.
//!
//! The repository resolves the configured limit row and computes current
//! exposures; this module makes the allow/deny decision. A ceiling of zero or
//! below means "not checked". No configured row at all means Allowed. The
//! fail-open behavior is deliberate policy carried from the source system and
//! is pinned by tests.

use crate::domain::{Currency, Decimal, ProductType};
use serde::{Deserialize, Serialize};

/// Configured ceilings for one (counterparty, counterparty type, currency) key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CounterpartyLimits {
    pub overall_exposure_limit: Decimal,
    pub product_transaction_limit: Decimal,
    pub product_money_market_limit: Decimal,
    pub product_fx_limit: Decimal,
    pub product_derivative_limit: Decimal,
    pub product_repo_limit: Decimal,
    pub product_reverse_repo_limit: Decimal,
    pub product_gsec_limit: Decimal,
    pub product_sell_and_buy_back_limit: Decimal,
    pub product_buy_and_sell_back_limit: Decimal,
}

impl CounterpartyLimits {
    /// Ceiling for one product dimension.
    pub fn product_limit(&self, product: ProductType) -> Decimal {
        match product {
            ProductType::Transaction => self.product_transaction_limit,
            ProductType::MoneyMarket => self.product_money_market_limit,
            ProductType::Fx => self.product_fx_limit,
            ProductType::Derivative => self.product_derivative_limit,
            ProductType::Repo => self.product_repo_limit,
            ProductType::ReverseRepo => self.product_reverse_repo_limit,
            ProductType::Gsec => self.product_gsec_limit,
            ProductType::SellAndBuyBack => self.product_sell_and_buy_back_limit,
            ProductType::BuyAndSellBack => self.product_buy_and_sell_back_limit,
        }
    }
}

/// Current exposure in both dimensions, before the candidate deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExposureSnapshot {
    pub product: Decimal,
    pub overall: Decimal,
}

/// Denial details surfaced to the caller, both dimensions included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitBreach {
    pub reason: String,
    pub product_type: ProductType,
    pub currency: Currency,
    pub current_product_exposure: Decimal,
    pub product_limit: Decimal,
    pub product_excess: Decimal,
    pub current_overall_exposure: Decimal,
    pub overall_limit: Decimal,
    pub overall_excess: Decimal,
}

/// Outcome of a limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitDecision {
    Allowed,
    Denied(Box<LimitBreach>),
}

impl LimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, LimitDecision::Allowed)
    }
}

/// Decide whether adding `amount` of `product` exposure stays within limits.
pub fn evaluate_limits(
    limits: Option<&CounterpartyLimits>,
    product: ProductType,
    currency: &Currency,
    exposure: &ExposureSnapshot,
    amount: Decimal,
) -> LimitDecision {
    // No configured row: unlimited (fail-open).
    let Some(limits) = limits else {
        return LimitDecision::Allowed;
    };

    let product_limit = limits.product_limit(product);
    let overall_limit = limits.overall_exposure_limit;

    let new_product = exposure.product + amount;
    let new_overall = exposure.overall + amount;

    let product_breached = product_limit.is_positive() && new_product > product_limit;
    let overall_breached = overall_limit.is_positive() && new_overall > overall_limit;

    if !product_breached && !overall_breached {
        return LimitDecision::Allowed;
    }

    let product_excess = if product_breached {
        new_product - product_limit
    } else {
        Decimal::zero()
    };
    let overall_excess = if overall_breached {
        new_overall - overall_limit
    } else {
        Decimal::zero()
    };

    let reason = match (product_breached, overall_breached) {
        (true, true) => format!(
            "deal exceeds {} limit ({} > {}) and overall limit ({} > {})",
            product, new_product, product_limit, new_overall, overall_limit
        ),
        (true, false) => format!(
            "deal exceeds {} limit ({} > {})",
            product, new_product, product_limit
        ),
        (false, true) => format!(
            "deal exceeds overall limit ({} > {})",
            new_overall, overall_limit
        ),
        (false, false) => unreachable!(),
    };

    LimitDecision::Denied(Box::new(LimitBreach {
        reason,
        product_type: product,
        currency: currency.clone(),
        current_product_exposure: exposure.product,
        product_limit,
        product_excess,
        current_overall_exposure: exposure.overall,
        overall_limit,
        overall_excess,
    }))
}
