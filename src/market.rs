//! Price book - latest price per listed instrument.
//!
//! Written by whichever feed is running, read by the trade engine and the
//! HTTP handlers. Only catalogue instruments are ever stored.

use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;

use crate::core::config::InstrumentSpec;
use crate::core::{Instrument, Symbol};

/// Catalogue metadata for one listed symbol
#[derive(Debug, Clone)]
struct Listing {
    rank: usize,
    name: String,
}

pub struct PriceBook {
    listings: HashMap<Symbol, Listing>,
    prices: RwLock<HashMap<Symbol, Instrument>>,
}

impl PriceBook {
    /// Build an empty book for the given catalogue. Rank is catalogue order.
    pub fn new(catalogue: &[InstrumentSpec]) -> Self {
        let listings = catalogue
            .iter()
            .enumerate()
            .map(|(rank, spec)| {
                (
                    spec.symbol.clone(),
                    Listing {
                        rank,
                        name: spec.name.clone(),
                    },
                )
            })
            .collect();

        Self {
            listings,
            prices: RwLock::new(HashMap::new()),
        }
    }

    /// Listed symbols in rank order
    pub fn catalogue(&self) -> Vec<Symbol> {
        let mut symbols: Vec<_> = self.listings.iter().collect();
        symbols.sort_by_key(|(_, l)| l.rank);
        symbols.into_iter().map(|(s, _)| s.clone()).collect()
    }

    fn instrument(&self, symbol: &Symbol, price: Decimal) -> Option<Instrument> {
        if price <= Decimal::ZERO {
            return None;
        }
        let listing = self.listings.get(symbol)?;
        Some(Instrument {
            symbol: symbol.clone(),
            name: listing.name.clone(),
            price,
            rank: listing.rank,
            updated_at: Utc::now(),
        })
    }

    /// Streaming update for one symbol. Returns false when the tick was
    /// dropped (unlisted symbol or non-positive price).
    pub fn apply_tick(&self, symbol: &Symbol, price: Decimal) -> bool {
        match self.instrument(symbol, price) {
            Some(instrument) => {
                self.prices.write().insert(symbol.clone(), instrument);
                true
            }
            None => {
                debug!("Ignoring tick {} @ {}", symbol, price);
                false
            }
        }
    }

    /// Wholesale refresh: the book afterwards holds exactly the valid
    /// entries of `snapshot`. Returns how many were kept.
    pub fn replace_all(&self, snapshot: impl IntoIterator<Item = (Symbol, Decimal)>) -> usize {
        let fresh: HashMap<Symbol, Instrument> = snapshot
            .into_iter()
            .filter_map(|(symbol, price)| {
                let instrument = self.instrument(&symbol, price)?;
                Some((symbol, instrument))
            })
            .collect();

        let kept = fresh.len();
        *self.prices.write() = fresh;
        kept
    }

    pub fn get(&self, symbol: &Symbol) -> Option<Instrument> {
        self.prices.read().get(symbol).cloned()
    }

    pub fn price(&self, symbol: &Symbol) -> Option<Decimal> {
        self.prices.read().get(symbol).map(|i| i.price)
    }

    /// Priced instruments by rank, at most `n` of them
    pub fn top(&self, n: usize) -> Vec<Instrument> {
        let mut instruments: Vec<Instrument> = self.prices.read().values().cloned().collect();
        instruments.sort_by_key(|i| i.rank);
        instruments.truncate(n);
        instruments
    }

    /// Number of priced instruments
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.prices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.read().is_empty()
    }
}
