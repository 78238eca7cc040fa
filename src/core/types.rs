//! Core types - Strong typing for safety

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

use crate::core::Error;

/// Tradeable symbol pair (e.g., "BTC/USD")
///
/// Always upper-case `BASE/QUOTE` with both legs alphanumeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(pub(crate) String);

impl Symbol {
    pub fn new(base: &str, quote: &str) -> crate::core::Result<Self> {
        format!("{}/{}", base, quote).parse()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn base(&self) -> &str {
        self.0.split_once('/').map(|(b, _)| b).unwrap_or(&self.0)
    }

    pub fn quote(&self) -> &str {
        self.0.split_once('/').map(|(_, q)| q).unwrap_or("")
    }
}

impl FromStr for Symbol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        let valid_leg = |leg: &str| !leg.is_empty() && leg.chars().all(|c| c.is_ascii_alphanumeric());
        match upper.split_once('/') {
            Some((base, quote)) if valid_leg(base) && valid_leg(quote) => Ok(Self(upper)),
            _ => Err(Error::InvalidSymbol(s.to_string())),
        }
    }
}

impl TryFrom<String> for Symbol {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Symbol> for String {
    fn from(s: Symbol) -> Self {
        s.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque user identity as it appears in request paths
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> crate::core::Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidUser(id));
        }
        Ok(Self(id))
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Buy,
    Sell,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Buy => write!(f, "BUY"),
            TransactionType::Sell => write!(f, "SELL"),
        }
    }
}

/// Listed instrument with its latest price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub symbol: Symbol,
    pub name: String,
    pub price: Decimal,
    #[serde(skip)]
    pub rank: usize,
    pub updated_at: DateTime<Utc>,
}

/// Executed trade. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: UserId,
    #[serde(rename = "cryptoSymbol")]
    pub symbol: Symbol,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub quantity: Decimal,
    pub price: Decimal,
    pub total: Decimal,
    pub profit_loss: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn buy(user_id: UserId, symbol: Symbol, quantity: Decimal, price: Decimal, total: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            symbol,
            kind: TransactionType::Buy,
            quantity,
            price,
            total,
            profit_loss: Decimal::ZERO,
            timestamp: Utc::now(),
        }
    }

    pub fn sell(
        user_id: UserId,
        symbol: Symbol,
        quantity: Decimal,
        price: Decimal,
        total: Decimal,
        profit_loss: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            symbol,
            kind: TransactionType::Sell,
            quantity,
            price,
            total,
            profit_loss,
            timestamp: Utc::now(),
        }
    }
}

/// Account snapshot as served to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub user_id: UserId,
    pub balance: Decimal,
    pub holdings: BTreeMap<Symbol, Decimal>,
}

impl Account {
    pub fn holding(&self, symbol: &Symbol) -> Decimal {
        self.holdings.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }
}

/// One line of a portfolio valuation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingValue {
    pub symbol: Symbol,
    pub quantity: Decimal,
    /// None when the instrument has no live price
    pub price: Option<Decimal>,
    pub market_value: Decimal,
    pub cost_basis: Decimal,
    pub unrealized_pnl: Decimal,
}

/// Balance plus marked-to-market holdings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub user_id: UserId,
    pub balance: Decimal,
    pub holdings: Vec<HoldingValue>,
    pub holdings_value: Decimal,
    pub total_value: Decimal,
    pub realized_pnl: Decimal,
}
