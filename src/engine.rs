//! Trade engine - executes buy/sell/reset against live prices.
//!
//! Order of checks on a trade: instrument priced, order-level limits,
//! then funds or holdings under the user's lock. A rejected trade leaves
//! the account untouched.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::config::AccountConfig;
use crate::core::{Account, Error, HoldingValue, Portfolio, Result, Symbol, Transaction, TransactionType, UserId};
use crate::ledger::{AccountStore, Journal};
use crate::market::PriceBook;
use crate::risk::TradeGuard;

pub struct TradeEngine {
    prices: Arc<PriceBook>,
    accounts: AccountStore,
    guard: TradeGuard,
    config: AccountConfig,
    journal: Option<Journal>,
}

impl TradeEngine {
    pub fn new(prices: Arc<PriceBook>, config: AccountConfig, guard: TradeGuard) -> Self {
        Self {
            prices,
            accounts: AccountStore::new(config.starting_balance),
            guard,
            config,
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn prices(&self) -> &Arc<PriceBook> {
        &self.prices
    }

    fn quote(&self, symbol: &Symbol) -> Result<Decimal> {
        self.prices
            .price(symbol)
            .ok_or_else(|| Error::UnknownSymbol(symbol.to_string()))
    }

    fn journal(&self, tx: &Transaction) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.record(tx) {
                warn!("Failed to journal transaction {}: {}", tx.id, e);
            }
        }
    }

    /// Execute a market buy. The journal entry is written while the
    /// user's book is still locked, so it follows execution order.
    pub fn buy(&self, user_id: &UserId, symbol: &Symbol, quantity: Decimal) -> Result<Transaction> {
        let quantity = quantity.normalize();
        let price = self.quote(symbol)?;
        self.guard.check_order(TransactionType::Buy, quantity, price)?;

        let tx = self.accounts.with_book(user_id, |book| -> Result<Transaction> {
            let tx = book.apply_buy(symbol, quantity, price)?;
            self.journal(&tx);
            Ok(tx)
        })?;

        info!("{} BUY {} {} @ {} (total {})", user_id, quantity, symbol, price, tx.total);
        Ok(tx)
    }

    pub fn sell(&self, user_id: &UserId, symbol: &Symbol, quantity: Decimal) -> Result<Transaction> {
        let quantity = quantity.normalize();
        let price = self.quote(symbol)?;
        self.guard.check_order(TransactionType::Sell, quantity, price)?;

        let method = self.config.cost_basis;
        let tx = self.accounts.with_book(user_id, |book| -> Result<Transaction> {
            let tx = book.apply_sell(symbol, quantity, price, method)?;
            self.journal(&tx);
            Ok(tx)
        })?;

        info!(
            "{} SELL {} {} @ {} (total {}, pnl {})",
            user_id, quantity, symbol, price, tx.total, tx.profit_loss
        );
        Ok(tx)
    }

    pub fn reset(&self, user_id: &UserId) {
        let starting = self.config.starting_balance;
        let clear = self.config.clear_history_on_reset;
        self.accounts.with_book(user_id, |book| book.reset(starting, clear));
        info!("{} account reset to {}", user_id, starting);
    }

    pub fn account(&self, user_id: &UserId) -> Account {
        self.accounts.with_book(user_id, |book| book.account())
    }

    /// Newest first
    pub fn transactions(&self, user_id: &UserId) -> Vec<Transaction> {
        self.accounts.with_book(user_id, |book| book.ledger().newest_first())
    }

    /// Mark holdings to the current prices. Holdings without a live price
    /// count at zero market value.
    pub fn portfolio(&self, user_id: &UserId) -> Result<Portfolio> {
        let out_of_range = || Error::InvalidState(format!("portfolio value out of range for {}", user_id));

        self.accounts.with_book(user_id, |book| -> Result<Portfolio> {
            let holdings = book
                .positions()
                .map(|(symbol, position)| -> Result<HoldingValue> {
                    let price = self.prices.price(symbol);
                    let (market_value, unrealized_pnl) = match price {
                        Some(p) => {
                            let value = p.checked_mul(position.quantity()).ok_or_else(out_of_range)?;
                            let pnl = value.checked_sub(position.cost()).ok_or_else(out_of_range)?;
                            (value, pnl)
                        }
                        None => (Decimal::ZERO, Decimal::ZERO),
                    };
                    Ok(HoldingValue {
                        symbol: symbol.clone(),
                        quantity: position.quantity(),
                        price,
                        market_value,
                        cost_basis: position.cost(),
                        unrealized_pnl,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let holdings_value = holdings
                .iter()
                .try_fold(Decimal::ZERO, |sum, h| sum.checked_add(h.market_value))
                .ok_or_else(out_of_range)?;
            let total_value = book.balance().checked_add(holdings_value).ok_or_else(out_of_range)?;

            Ok(Portfolio {
                user_id: book.user_id().clone(),
                balance: book.balance(),
                holdings_value,
                total_value,
                realized_pnl: book.ledger().realized_pnl().ok_or_else(out_of_range)?,
                holdings,
            })
        })
    }
}
