//! Append-only per-user transaction log

use rust_decimal::Decimal;

use crate::core::{Transaction, TransactionType};

#[derive(Debug, Clone, Default)]
pub struct TransactionLog {
    entries: Vec<Transaction>,
}

impl TransactionLog {
    pub fn append(&mut self, tx: Transaction) {
        self.entries.push(tx);
    }

    /// Entries in display order: most recent first
    pub fn newest_first(&self) -> Vec<Transaction> {
        self.entries.iter().rev().cloned().collect()
    }

    /// Sum of realized P/L over all SELLs still in the log, None on overflow
    pub fn realized_pnl(&self) -> Option<Decimal> {
        self.entries
            .iter()
            .filter(|t| t.kind == TransactionType::Sell)
            .try_fold(Decimal::ZERO, |sum, t| sum.checked_add(t.profit_loss))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
