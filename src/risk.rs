//! Trade guard - request-level checks run before an account is locked.
//!
//! Funds and holdings sufficiency depend on the account and are checked
//! inside the user's book; this gate only looks at the order itself.

use rust_decimal::Decimal;

use crate::core::config::RiskConfig;
use crate::core::{Error, Result, TransactionType};

/// Finest quantity step accepted from clients
pub const MAX_QUANTITY_DECIMALS: u32 = 8;

/// `quantity * price` with no rounding. Fails when the product overflows
/// or would have to drop digits to fit a `Decimal`.
pub fn exact_notional(quantity: Decimal, price: Decimal) -> Result<Decimal> {
    let product = quantity
        .checked_mul(price)
        .ok_or_else(|| Error::OrderLimit("order value out of range".to_string()))?;
    if product.scale() != quantity.scale() + price.scale() {
        return Err(Error::Precision(format!(
            "{} x {} cannot be represented exactly",
            quantity, price
        )));
    }
    Ok(product)
}

#[derive(Debug, Clone, Default)]
pub struct TradeGuard {
    config: RiskConfig,
}

impl TradeGuard {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn check_quantity(&self, quantity: Decimal) -> Result<()> {
        if quantity <= Decimal::ZERO {
            return Err(Error::InvalidQuantity);
        }
        if quantity.normalize().scale() > MAX_QUANTITY_DECIMALS {
            return Err(Error::Precision(format!(
                "quantity {} has more than {} decimal places",
                quantity, MAX_QUANTITY_DECIMALS
            )));
        }
        Ok(())
    }

    /// Check an order's size against the configured notional limits.
    pub fn check_order(&self, kind: TransactionType, quantity: Decimal, price: Decimal) -> Result<Decimal> {
        self.check_quantity(quantity)?;

        let notional = exact_notional(quantity, price)?;

        if let Some(max) = self.config.max_order_value {
            if notional > max {
                return Err(Error::OrderLimit(format!("{} value {} exceeds max {}", kind, notional, max)));
            }
        }
        if let Some(min) = self.config.min_order_value {
            if notional < min {
                return Err(Error::OrderLimit(format!("{} value {} below min {}", kind, notional, min)));
            }
        }

        Ok(notional)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_too_large() {
        let gate = TradeGuard::new(RiskConfig {
            max_order_value: Some(Decimal::from(50_000)),
            min_order_value: None,
        });

        // 10 * 50000 = $500k > $50k limit
        let result = gate.check_order(TransactionType::Buy, Decimal::from(10), Decimal::from(50000));
        assert!(matches!(result, Err(Error::OrderLimit(_))));

        let ok = gate.check_order(TransactionType::Buy, Decimal::ONE, Decimal::from(50000));
        assert_eq!(ok.unwrap(), Decimal::from(50000));
    }

    #[test]
    fn test_dust_order() {
        let gate = TradeGuard::new(RiskConfig {
            max_order_value: None,
            min_order_value: Some(Decimal::from(10)),
        });
        assert!(gate.check_order(TransactionType::Sell, Decimal::new(1, 3), Decimal::from(100)).is_err());
    }

    #[test]
    fn test_non_positive_quantity() {
        let gate = TradeGuard::default();
        assert!(matches!(gate.check_quantity(Decimal::ZERO), Err(Error::InvalidQuantity)));
        assert!(matches!(
            gate.check_order(TransactionType::Buy, Decimal::from(-1), Decimal::ONE),
            Err(Error::InvalidQuantity)
        ));
        assert!(gate.check_order(TransactionType::Buy, Decimal::ONE, Decimal::ONE).is_ok());
    }

    #[test]
    fn test_quantity_decimal_places() {
        let gate = TradeGuard::default();
        assert!(gate.check_quantity("0.12345678".parse().unwrap()).is_ok());
        // trailing zeros do not count
        assert!(gate.check_quantity("0.1234567800".parse().unwrap()).is_ok());
        assert!(matches!(
            gate.check_quantity("0.0123456789012345678901234567".parse().unwrap()),
            Err(Error::Precision(_))
        ));
    }

    #[test]
    fn test_exact_notional() {
        let q: Decimal = "123456.12345678".parse().unwrap();
        let p: Decimal = "0.00001812345678".parse().unwrap();
        assert_eq!(exact_notional(q, p).unwrap(), "2.2374517176952965279684".parse::<Decimal>().unwrap());

        // 28 + 2 decimal places cannot be held without rounding
        let fine: Decimal = "0.0123456789012345678901234567".parse().unwrap();
        assert!(matches!(
            exact_notional(fine, "50000.55".parse().unwrap()),
            Err(Error::Precision(_))
        ));
        assert!(matches!(
            exact_notional(Decimal::MAX, Decimal::from(2)),
            Err(Error::OrderLimit(_))
        ));
    }
}
