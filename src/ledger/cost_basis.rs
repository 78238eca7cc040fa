//! Per-symbol position with the bookkeeping needed for realized P/L.

use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::VecDeque;

use crate::core::config::CostBasisMethod;
use crate::core::{Error, Result};

/// Precision of average prices
pub const AVERAGE_PRICE_DP: u32 = 8;

/// One purchase still (partly) held
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lot {
    pub quantity: Decimal,
    pub price: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Position {
    quantity: Decimal,
    /// Carried cost of the open quantity under the active method
    cost: Decimal,
    /// Open purchases, oldest first
    lots: VecDeque<Lot>,
    last_buy_price: Decimal,
}

impl Position {
    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn cost(&self) -> Decimal {
        self.cost
    }

    #[cfg(test)]
    pub fn lots(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.quantity.is_zero()
    }

    /// Weighted average price of the open quantity, 8 dp half-up
    pub fn average_price(&self) -> Decimal {
        if self.quantity.is_zero() {
            return Decimal::ZERO;
        }
        (self.cost / self.quantity).round_dp_with_strategy(AVERAGE_PRICE_DP, RoundingStrategy::MidpointAwayFromZero)
    }

    pub fn buy(&mut self, quantity: Decimal, price: Decimal) {
        self.quantity += quantity;
        self.cost += quantity * price;
        self.lots.push_back(Lot { quantity, price });
        self.last_buy_price = price;
    }

    /// Remove `quantity` from the position and return the cost of the
    /// units sold under `method`.
    pub fn sell(&mut self, quantity: Decimal, method: CostBasisMethod) -> Result<Decimal> {
        if quantity <= Decimal::ZERO {
            return Err(Error::InvalidQuantity);
        }
        if quantity > self.quantity {
            return Err(Error::InsufficientHoldings {
                available: self.quantity,
                requested: quantity,
            });
        }

        let average_cost = if quantity == self.quantity {
            self.cost
        } else {
            self.average_price() * quantity
        };
        let fifo_cost = self.consume_lots(quantity);

        let sold_cost = match method {
            CostBasisMethod::Average => average_cost,
            CostBasisMethod::Fifo => fifo_cost,
            CostBasisMethod::LastBuy => self.last_buy_price * quantity,
        };

        self.quantity -= quantity;
        self.cost -= match method {
            CostBasisMethod::Fifo => fifo_cost,
            CostBasisMethod::Average | CostBasisMethod::LastBuy => average_cost,
        };

        if self.quantity.is_zero() {
            self.cost = Decimal::ZERO;
            self.lots.clear();
        }

        Ok(sold_cost)
    }

    /// Take `quantity` off the oldest lots, returning their purchase cost
    fn consume_lots(&mut self, quantity: Decimal) -> Decimal {
        let mut remaining = quantity;
        let mut cost = Decimal::ZERO;

        while remaining > Decimal::ZERO {
            let Some(lot) = self.lots.front_mut() else { break };
            let take = remaining.min(lot.quantity);
            cost += take * lot.price;
            lot.quantity -= take;
            remaining -= take;
            if lot.quantity.is_zero() {
                self.lots.pop_front();
            }
        }

        cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn two_lots() -> Position {
        let mut p = Position::default();
        p.buy(d("1"), d("100"));
        p.buy(d("1"), d("200"));
        p
    }

    #[test]
    fn test_average_cost() {
        let mut p = two_lots();
        assert_eq!(p.average_price(), d("150"));

        let cost = p.sell(d("1"), CostBasisMethod::Average).unwrap();
        assert_eq!(cost, d("150"));
        assert_eq!(p.quantity(), d("1"));
        assert_eq!(p.average_price(), d("150"));
    }

    #[test]
    fn test_fifo_cost() {
        let mut p = two_lots();
        assert_eq!(p.sell(d("1.5"), CostBasisMethod::Fifo).unwrap(), d("200"));
        assert_eq!(p.quantity(), d("0.5"));
        assert_eq!(p.cost(), d("100"));
        assert_eq!(p.lots().count(), 1);
    }

    #[test]
    fn test_last_buy_cost() {
        let mut p = two_lots();
        assert_eq!(p.sell(d("0.5"), CostBasisMethod::LastBuy).unwrap(), d("100"));
        assert_eq!(p.quantity(), d("1.5"));
    }

    #[test]
    fn test_full_close_resets_cost() {
        let mut p = Position::default();
        p.buy(d("3"), d("10"));
        p.buy(d("0.1"), d("7"));
        let cost = p.sell(d("3.1"), CostBasisMethod::Average).unwrap();
        assert_eq!(cost, d("30.7"));
        assert!(p.is_empty());
        assert_eq!(p.cost(), Decimal::ZERO);
        assert_eq!(p.lots().count(), 0);
    }

    #[test]
    fn test_average_rounding_half_up() {
        let mut p = Position::default();
        p.buy(d("3"), d("1"));
        p.buy(d("3"), d("1.000000005"));
        // 6.000000015 / 6 = 1.0000000025 -> 1.00000000
        assert_eq!(p.average_price(), d("1.00000000"));

        let mut q = Position::default();
        q.buy(d("2"), d("0.000000015"));
        // 0.00000003 / 2 = 0.000000015 -> 0.00000002
        assert_eq!(q.average_price(), d("0.00000002"));
    }

    #[test]
    fn test_oversell_rejected() {
        let mut p = two_lots();
        assert!(matches!(
            p.sell(d("2.5"), CostBasisMethod::Fifo),
            Err(Error::InsufficientHoldings { .. })
        ));
        assert_eq!(p.quantity(), d("2"));
        assert!(p.sell(Decimal::ZERO, CostBasisMethod::Fifo).is_err());
    }
}
