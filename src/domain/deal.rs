//! Deal records and workflow state types.

use crate::domain::{Currency, DealNumber, Decimal, Isin};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Business lifecycle state of a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DealStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl DealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealStatus::Pending => "pending",
            DealStatus::Approved => "approved",
            DealStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DealStatus::Pending),
            "approved" => Some(DealStatus::Approved),
            "rejected" => Some(DealStatus::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for DealStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Position of a deal in the ordered approval ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalLevel {
    #[default]
    FrontOffice,
    BackOfficeVerifier,
    BackOfficeFinal,
}

impl ApprovalLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalLevel::FrontOffice => "front_office",
            ApprovalLevel::BackOfficeVerifier => "back_office_verifier",
            ApprovalLevel::BackOfficeFinal => "back_office_final",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "front_office" => Some(ApprovalLevel::FrontOffice),
            "back_office_verifier" => Some(ApprovalLevel::BackOfficeVerifier),
            "back_office_final" => Some(ApprovalLevel::BackOfficeFinal),
            _ => None,
        }
    }

    /// Next level in the ladder, or None at the final level.
    pub fn next(&self) -> Option<ApprovalLevel> {
        match self {
            ApprovalLevel::FrontOffice => Some(ApprovalLevel::BackOfficeVerifier),
            ApprovalLevel::BackOfficeVerifier => Some(ApprovalLevel::BackOfficeFinal),
            ApprovalLevel::BackOfficeFinal => None,
        }
    }

    /// Back-office levels send rejected deals back to the start of the ladder.
    pub fn is_back_office(&self) -> bool {
        matches!(
            self,
            ApprovalLevel::BackOfficeVerifier | ApprovalLevel::BackOfficeFinal
        )
    }
}

impl std::fmt::Display for ApprovalLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One completed workflow step, appended to a deal's approval chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStep {
    pub level: ApprovalLevel,
    pub decision: DealStatus,
    pub by: String,
    pub comment: Option<String>,
}

/// Product dimension used by the limit engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Transaction,
    MoneyMarket,
    Fx,
    Derivative,
    Repo,
    ReverseRepo,
    Gsec,
    SellAndBuyBack,
    BuyAndSellBack,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Transaction => "transaction",
            ProductType::MoneyMarket => "money_market",
            ProductType::Fx => "fx",
            ProductType::Derivative => "derivative",
            ProductType::Repo => "repo",
            ProductType::ReverseRepo => "reverse_repo",
            ProductType::Gsec => "gsec",
            ProductType::SellAndBuyBack => "sell_and_buy_back",
            ProductType::BuyAndSellBack => "buy_and_sell_back",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "transaction" => Some(ProductType::Transaction),
            "money_market" => Some(ProductType::MoneyMarket),
            "fx" => Some(ProductType::Fx),
            "derivative" => Some(ProductType::Derivative),
            "repo" => Some(ProductType::Repo),
            "reverse_repo" => Some(ProductType::ReverseRepo),
            "gsec" => Some(ProductType::Gsec),
            "sell_and_buy_back" => Some(ProductType::SellAndBuyBack),
            "buy_and_sell_back" => Some(ProductType::BuyAndSellBack),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction of a money-market deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoneyMarketSide {
    Lending,
    Borrowing,
}

impl MoneyMarketSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoneyMarketSide::Lending => "lending",
            MoneyMarketSide::Borrowing => "borrowing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        // Legacy rows carry mixed case.
        match s.to_ascii_lowercase().as_str() {
            "lending" => Some(MoneyMarketSide::Lending),
            "borrowing" => Some(MoneyMarketSide::Borrowing),
            _ => None,
        }
    }
}

/// Direction of a GSec trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Buy,
    Sell,
}

impl TradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Buy => "buy",
            TradeType::Sell => "sell",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Some(TradeType::Buy),
            "sell" => Some(TradeType::Sell),
            _ => None,
        }
    }
}

/// A generic treasury transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub deal_number: DealNumber,
    pub source_account_id: Option<i64>,
    pub category: Option<String>,
    pub amount: Decimal,
    pub currency: Currency,
    pub txn_date: NaiveDate,
    pub trade_date: Option<NaiveDate>,
    pub value_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub counterparty_id: Option<i64>,
    pub counterparty_type: Option<String>,
    pub transaction_type_id: Option<i64>,
    pub price: Option<Decimal>,
    pub yield_pct: Option<Decimal>,
    pub portfolio: Option<String>,
    pub strategy: Option<String>,
    pub commission: Option<Decimal>,
    pub brokerage: Option<Decimal>,
    pub remarks: Option<String>,
    pub status: DealStatus,
    pub approval_status: DealStatus,
    pub current_approval_level: ApprovalLevel,
    pub approval_chain: Vec<ApprovalStep>,
    pub submitted_by: String,
    pub comment: Option<String>,
}

/// A government-securities deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GsecDeal {
    pub deal_number: DealNumber,
    pub trade_type: TradeType,
    pub counterparty_id: i64,
    pub counterparty_type: Option<String>,
    pub isin: Isin,
    pub face_value: Decimal,
    pub value_date: NaiveDate,
    pub last_coupon_date: Option<NaiveDate>,
    pub next_coupon_date: Option<NaiveDate>,
    pub accrued_interest: Option<Decimal>,
    pub coupon_interest: Option<Decimal>,
    pub clean_price: Option<Decimal>,
    pub dirty_price: Option<Decimal>,
    pub settlement_amount: Option<Decimal>,
    pub settlement_bank_code: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub maturity_date: NaiveDate,
    pub per_day_accrual: Option<Decimal>,
    pub yield_pct: Option<Decimal>,
    pub brokerage: Option<Decimal>,
    pub currency: Currency,
    pub portfolio: Option<String>,
    pub strategy: Option<String>,
    pub broker: Option<String>,
    pub status: DealStatus,
    pub approval_status: DealStatus,
    pub current_approval_level: ApprovalLevel,
    pub approval_chain: Vec<ApprovalStep>,
    pub submitted_by: String,
    pub comment: Option<String>,
}

/// A money-market deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyMarketDeal {
    pub deal_number: DealNumber,
    pub trade_date: NaiveDate,
    pub value_date: NaiveDate,
    pub maturity_date: NaiveDate,
    pub counterparty_id: i64,
    pub counterparty_type: Option<String>,
    pub product_code: String,
    pub deal_type: MoneyMarketSide,
    pub currency: Currency,
    pub principal_amount: Decimal,
    pub interest_rate: Decimal,
    pub tenor: i64,
    pub interest_amount: Option<Decimal>,
    pub maturity_value: Option<Decimal>,
    pub per_day_interest: Option<Decimal>,
    pub settlement_bank_code: Option<String>,
    pub status: DealStatus,
}
