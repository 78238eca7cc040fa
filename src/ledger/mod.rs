//! Account store and transaction ledger

pub mod accounts;
pub mod cost_basis;
pub mod journal;
pub mod transactions;

pub use accounts::{AccountStore, UserBook};
pub use cost_basis::{Lot, Position};
pub use journal::Journal;
pub use transactions::TransactionLog;
