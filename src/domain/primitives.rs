//! Domain primitives: DealNumber, Currency, AccountCode, Isin.

use serde::{Deserialize, Serialize};

/// Externally visible unique identifier for one deal, immutable once assigned.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DealNumber(pub String);

impl DealNumber {
    /// Create a DealNumber from a string.
    pub fn new(number: String) -> Self {
        DealNumber(number)
    }

    /// Get the deal number as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DealNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque currency tag (e.g. "LKR", "USD"). Compared for equality only;
/// no conversion is ever performed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Currency(pub String);

impl Currency {
    /// Create a Currency from a string.
    pub fn new(code: String) -> Self {
        Currency(code)
    }

    /// Get the currency code as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chart-of-accounts account code (e.g. "1001", "1-201-01-01-01").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountCode(pub String);

impl AccountCode {
    /// Create an AccountCode from a string.
    pub fn new(code: String) -> Self {
        AccountCode(code)
    }

    /// Get the account code as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISIN of a government security.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Isin(pub String);

impl Isin {
    /// Create an Isin from a string.
    pub fn new(isin: String) -> Self {
        Isin(isin)
    }

    /// Get the ISIN as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Isin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which counterparty master a counterparty id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterpartyType {
    Individual,
    Joint,
}

impl CounterpartyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterpartyType::Individual => "individual",
            CounterpartyType::Joint => "joint",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "individual" => Some(CounterpartyType::Individual),
            "joint" => Some(CounterpartyType::Joint),
            _ => None,
        }
    }
}

impl std::fmt::Display for CounterpartyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
