//! Offline price source: a bounded random walk over seed prices.

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::config::InstrumentSpec;
use crate::core::{PriceSource, Result, Symbol};
use crate::market::PriceBook;

/// Decimal places kept on simulated prices
const PRICE_DP: u32 = 8;

pub struct SimulatedFeed {
    name: String,
    prices: Mutex<Vec<(Symbol, Decimal)>>,
    interval: Duration,
    volatility: f64,
}

impl SimulatedFeed {
    /// Instruments without a `seed_price` are not simulated.
    pub fn new(catalogue: &[InstrumentSpec], interval: Duration, volatility: f64) -> Self {
        let prices = catalogue
            .iter()
            .filter_map(|spec| match spec.seed_price {
                Some(p) => Some((spec.symbol.clone(), p)),
                None => {
                    warn!("No seed price for {}, not simulated", spec.symbol);
                    None
                }
            })
            .collect();

        Self {
            name: "simulated".to_string(),
            prices: Mutex::new(prices),
            interval,
            volatility,
        }
    }

    /// Advance every price by one random step and return the new snapshot.
    pub fn step(&self) -> Vec<(Symbol, Decimal)> {
        let mut rng = rand::rng();
        let mut prices = self.prices.lock();

        for (_, price) in prices.iter_mut() {
            let change = if self.volatility > 0.0 {
                rng.random_range(-self.volatility..self.volatility)
            } else {
                0.0
            };
            let factor = Decimal::try_from(1.0 + change).unwrap_or(Decimal::ONE);
            let next = (*price * factor).round_dp(PRICE_DP);
            // never walk to zero
            if next > Decimal::ZERO {
                *price = next;
            }
        }

        prices.clone()
    }
}

#[async_trait]
impl PriceSource for SimulatedFeed {
    async fn run(&self, book: Arc<PriceBook>) -> Result<()> {
        info!("Simulating {} instruments every {:?}", self.prices.lock().len(), self.interval);

        book.replace_all(self.prices.lock().clone());

        let mut ticker = tokio::time::interval(self.interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let snapshot = self.step();
            book.replace_all(snapshot);
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;

    #[test]
    fn test_step_stays_within_band() {
        let catalogue = Config::default().feed.instruments;
        let feed = SimulatedFeed::new(&catalogue, Duration::from_millis(10), 0.01);
        let before = feed.prices.lock().clone();

        let after = feed.step();
        assert_eq!(after.len(), before.len());

        for ((s0, p0), (s1, p1)) in before.iter().zip(after.iter()) {
            assert_eq!(s0, s1);
            assert!(*p1 > Decimal::ZERO);
            let lo = *p0 * Decimal::new(98, 2);
            let hi = *p0 * Decimal::new(102, 2);
            assert!(*p1 >= lo && *p1 <= hi, "{} moved from {} to {}", s0, p0, p1);
        }
    }

    #[test]
    fn test_zero_volatility_is_flat() {
        let catalogue = Config::default().feed.instruments;
        let feed = SimulatedFeed::new(&catalogue, Duration::from_millis(10), 0.0);
        let before = feed.prices.lock().clone();
        assert_eq!(feed.step(), before);
    }

    #[test]
    fn test_unseeded_instruments_skipped() {
        let mut catalogue = Config::default().feed.instruments;
        catalogue[0].seed_price = None;
        let feed = SimulatedFeed::new(&catalogue, Duration::from_millis(10), 0.01);
        assert_eq!(feed.step().len(), catalogue.len() - 1);
    }

    #[tokio::test]
    async fn test_run_populates_book() {
        let catalogue = Config::default().feed.instruments;
        let book = Arc::new(PriceBook::new(&catalogue));
        let feed = Arc::new(SimulatedFeed::new(&catalogue, Duration::from_millis(5), 0.01));

        let handle = {
            let book = book.clone();
            let feed = feed.clone();
            tokio::spawn(async move { feed.run(book).await })
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.abort();

        assert_eq!(book.len(), catalogue.len());
        assert_eq!(book.top(20).len(), 20);
    }
}
