//! Error handling - one hierarchy for the whole service

use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// cryptosim error hierarchy
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network/HTTP client errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// WebSocket errors
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Price feed protocol errors (unexpected payloads)
    #[error("Feed error: {0}")]
    Feed(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem errors (config, journal)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Empty or malformed user identity
    #[error("Invalid user id: {0:?}")]
    InvalidUser(String),

    /// Malformed symbol text
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Symbol not listed or not yet priced
    #[error("Cryptocurrency not found: {0}")]
    UnknownSymbol(String),

    /// Quantity missing, unparsable or not strictly positive
    #[error("Quantity must be greater than zero")]
    InvalidQuantity,

    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientFunds { available: Decimal, required: Decimal },

    #[error("Insufficient holdings: available {available}, requested {requested}")]
    InsufficientHoldings { available: Decimal, requested: Decimal },

    /// Quantity or order value not representable without rounding
    #[error("Precision exceeded: {0}")]
    Precision(String),

    /// Configured per-order notional limits
    #[error("Order limit: {0}")]
    OrderLimit(String),

    /// Invalid state
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl Error {
    /// True for errors caused by the request itself rather than the service.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::InvalidUser(_)
                | Error::InvalidSymbol(_)
                | Error::UnknownSymbol(_)
                | Error::InvalidQuantity
                | Error::InsufficientFunds { .. }
                | Error::InsufficientHoldings { .. }
                | Error::Precision(_)
                | Error::OrderLimit(_)
        )
    }
}
