//! Account store - one book (balance, positions, ledger) per user.
//!
//! Each book sits behind its own mutex. Everything a trade touches lives in
//! the book, so holding that one lock makes the trade all-or-nothing.

use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::core::config::CostBasisMethod;
use crate::core::{Account, Error, Result, Symbol, Transaction, UserId};
use crate::ledger::cost_basis::Position;
use crate::ledger::transactions::TransactionLog;
use crate::risk::exact_notional;

#[derive(Debug, Clone)]
pub struct UserBook {
    user_id: UserId,
    balance: Decimal,
    positions: BTreeMap<Symbol, Position>,
    ledger: TransactionLog,
}

impl UserBook {
    pub fn new(user_id: UserId, starting_balance: Decimal) -> Self {
        Self {
            user_id,
            balance: starting_balance,
            positions: BTreeMap::new(),
            ledger: TransactionLog::default(),
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn holding(&self, symbol: &Symbol) -> Decimal {
        self.positions.get(symbol).map(Position::quantity).unwrap_or(Decimal::ZERO)
    }

    pub fn positions(&self) -> impl Iterator<Item = (&Symbol, &Position)> {
        self.positions.iter()
    }

    pub fn ledger(&self) -> &TransactionLog {
        &self.ledger
    }

    /// Client-facing snapshot
    pub fn account(&self) -> Account {
        Account {
            user_id: self.user_id.clone(),
            balance: self.balance,
            holdings: self
                .positions
                .iter()
                .map(|(symbol, position)| (symbol.clone(), position.quantity()))
                .collect(),
        }
    }

    /// Debit `quantity * price`, credit the holding and record the BUY.
    /// Nothing changes when the balance does not cover the cost.
    pub fn apply_buy(&mut self, symbol: &Symbol, quantity: Decimal, price: Decimal) -> Result<Transaction> {
        if quantity <= Decimal::ZERO {
            return Err(Error::InvalidQuantity);
        }
        let total = exact_notional(quantity, price)?;
        if total > self.balance {
            return Err(Error::InsufficientFunds {
                available: self.balance,
                required: total,
            });
        }

        self.balance -= total;
        self.positions.entry(symbol.clone()).or_default().buy(quantity, price);

        let tx = Transaction::buy(self.user_id.clone(), symbol.clone(), quantity, price, total);
        self.ledger.append(tx.clone());
        Ok(tx)
    }

    /// Reduce the holding, credit the proceeds and record the SELL with
    /// its realized P/L. Nothing changes when the holding is too small.
    pub fn apply_sell(
        &mut self,
        symbol: &Symbol,
        quantity: Decimal,
        price: Decimal,
        method: CostBasisMethod,
    ) -> Result<Transaction> {
        if quantity <= Decimal::ZERO {
            return Err(Error::InvalidQuantity);
        }
        let available = self.holding(symbol);
        if quantity > available {
            return Err(Error::InsufficientHoldings {
                available,
                requested: quantity,
            });
        }
        let total = exact_notional(quantity, price)?;
        let balance = self
            .balance
            .checked_add(total)
            .ok_or_else(|| Error::OrderLimit(format!("balance out of range after selling {} {}", quantity, symbol)))?;

        let position = self
            .positions
            .get_mut(symbol)
            .ok_or_else(|| Error::InvalidState(format!("no position for {}", symbol)))?;
        let sold_cost = position.sell(quantity, method)?;
        if position.is_empty() {
            self.positions.remove(symbol);
        }

        self.balance = balance;

        let tx = Transaction::sell(
            self.user_id.clone(),
            symbol.clone(),
            quantity,
            price,
            total,
            total - sold_cost,
        );
        self.ledger.append(tx.clone());
        Ok(tx)
    }

    /// Back to a fresh account; history is dropped only if asked.
    pub fn reset(&mut self, starting_balance: Decimal, clear_history: bool) {
        self.balance = starting_balance;
        self.positions.clear();
        if clear_history {
            self.ledger.clear();
        }
    }
}

/// Lazily populated map of user books
pub struct AccountStore {
    books: RwLock<HashMap<UserId, Arc<Mutex<UserBook>>>>,
    starting_balance: Decimal,
}

impl AccountStore {
    pub fn new(starting_balance: Decimal) -> Self {
        Self {
            books: RwLock::new(HashMap::new()),
            starting_balance,
        }
    }

    /// The user's book, created with the starting balance on first access
    pub fn book(&self, user_id: &UserId) -> Arc<Mutex<UserBook>> {
        if let Some(book) = self.books.read().get(user_id) {
            return book.clone();
        }

        self.books
            .write()
            .entry(user_id.clone())
            .or_insert_with(|| {
                debug!("Opening account for {}", user_id);
                Arc::new(Mutex::new(UserBook::new(user_id.clone(), self.starting_balance)))
            })
            .clone()
    }

    /// Run `f` with the user's book locked
    pub fn with_book<R>(&self, user_id: &UserId, f: impl FnOnce(&mut UserBook) -> R) -> R {
        let book = self.book(user_id);
        let mut guard = book.lock();
        f(&mut guard)
    }

    #[cfg(test)]
    pub fn user_count(&self) -> usize {
        self.books.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn btc() -> Symbol {
        "BTC/USD".parse().unwrap()
    }

    fn book() -> UserBook {
        UserBook::new(UserId::new("alice").unwrap(), d("10000"))
    }

    #[test]
    fn test_buy_moves_cash_into_holding() {
        let mut b = book();
        let tx = b.apply_buy(&btc(), d("0.1"), d("50000")).unwrap();

        assert_eq!(tx.total, d("5000"));
        assert_eq!(b.balance(), d("5000"));
        assert_eq!(b.holding(&btc()), d("0.1"));
        assert_eq!(b.ledger().len(), 1);
    }

    #[test]
    fn test_buy_beyond_balance_changes_nothing() {
        let mut b = book();
        let err = b.apply_buy(&btc(), d("1"), d("10000.01")).unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { .. }));
        assert_eq!(b.balance(), d("10000"));
        assert_eq!(b.holding(&btc()), Decimal::ZERO);
        assert!(b.ledger().is_empty());
    }

    #[test]
    fn test_buy_entire_balance() {
        let mut b = book();
        b.apply_buy(&btc(), d("0.2"), d("50000")).unwrap();
        assert_eq!(b.balance(), Decimal::ZERO);
    }

    #[test]
    fn test_sell_realizes_pnl_and_removes_empty_holding() {
        let mut b = book();
        b.apply_buy(&btc(), d("0.1"), d("50000")).unwrap();
        let tx = b.apply_sell(&btc(), d("0.1"), d("60000"), CostBasisMethod::Average).unwrap();

        assert_eq!(tx.total, d("6000"));
        assert_eq!(tx.profit_loss, d("1000"));
        assert_eq!(b.balance(), d("11000"));
        assert!(b.account().holdings.is_empty());
    }

    #[test]
    fn test_sell_more_than_held_changes_nothing() {
        let mut b = book();
        b.apply_buy(&btc(), d("0.1"), d("50000")).unwrap();
        let err = b.apply_sell(&btc(), d("0.2"), d("60000"), CostBasisMethod::Fifo).unwrap_err();

        assert!(matches!(err, Error::InsufficientHoldings { .. }));
        assert_eq!(b.holding(&btc()), d("0.1"));
        assert_eq!(b.balance(), d("5000"));
        assert_eq!(b.ledger().len(), 1);

        let eth: Symbol = "ETH/USD".parse().unwrap();
        assert!(b.apply_sell(&eth, d("1"), d("3000"), CostBasisMethod::Fifo).is_err());
    }

    #[test]
    fn test_inexact_buy_changes_nothing() {
        let mut b = book();
        let err = b
            .apply_buy(&btc(), d("0.0123456789012345678901234567"), d("50000.55"))
            .unwrap_err();
        assert!(matches!(err, Error::Precision(_)));
        assert_eq!(b.balance(), d("10000"));
        assert!(b.ledger().is_empty());
    }

    #[test]
    fn test_sell_credit_overflow_changes_nothing() {
        let mut b = UserBook::new(UserId::new("whale").unwrap(), Decimal::MAX);
        b.apply_buy(&btc(), d("1"), d("50000")).unwrap();

        let err = b.apply_sell(&btc(), d("1"), d("60000"), CostBasisMethod::Average).unwrap_err();
        assert!(matches!(err, Error::OrderLimit(_)));
        assert_eq!(b.balance(), Decimal::MAX - d("50000"));
        assert_eq!(b.holding(&btc()), d("1"));
        assert_eq!(b.ledger().len(), 1);
    }

    #[test]
    fn test_reset() {
        let mut b = book();
        b.apply_buy(&btc(), d("0.1"), d("50000")).unwrap();

        b.reset(d("10000"), false);
        assert_eq!(b.balance(), d("10000"));
        assert!(b.account().holdings.is_empty());
        assert_eq!(b.ledger().len(), 1);

        b.reset(d("10000"), true);
        assert!(b.ledger().is_empty());
    }

    #[test]
    fn test_store_creates_lazily_once() {
        let store = AccountStore::new(d("10000"));
        let alice = UserId::new("alice").unwrap();

        let first = store.book(&alice);
        let second = store.book(&alice);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.user_count(), 1);

        let balance = store.with_book(&alice, |b| b.balance());
        assert_eq!(balance, d("10000"));
    }
}
