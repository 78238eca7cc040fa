//! REST client for price snapshots (start-up seed)

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::{Error, Result, Symbol};

/// Kraken public REST `Ticker` endpoint
pub struct KrakenRest {
    base_url: String,
    client: reqwest::Client,
}

impl KrakenRest {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into(),
            client: reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?,
        })
    }

    /// REST pair name: "BTC/USD" -> "BTCUSD"
    pub fn pair_name(symbol: &Symbol) -> String {
        format!("{}{}", symbol.base(), symbol.quote())
    }

    /// Current ask for one symbol
    pub async fn fetch_price(&self, symbol: &Symbol) -> Result<Decimal> {
        let url = format!("{}/Ticker?pair={}", self.base_url, Self::pair_name(symbol));
        let resp = self.client.get(&url).send().await?.error_for_status()?;
        let body = resp.json::<Value>().await?;
        parse_ticker_response(&body)
    }

    /// Best-effort snapshot: symbols that fail are logged and left out
    pub async fn snapshot(&self, symbols: &[Symbol]) -> Vec<(Symbol, Decimal)> {
        let mut prices = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            match self.fetch_price(symbol).await {
                Ok(price) => {
                    debug!("REST price for {}: {}", symbol, price);
                    prices.push((symbol.clone(), price));
                }
                Err(e) => warn!("REST snapshot failed for {}: {}", symbol, e),
            }
        }
        prices
    }
}

/// Pull the ask out of `{"error":[],"result":{"<pair>":{"a":["price",..]}}}`
pub fn parse_ticker_response(body: &Value) -> Result<Decimal> {
    if let Some(errors) = body["error"].as_array() {
        if !errors.is_empty() {
            let joined: Vec<String> = errors.iter().map(|e| e.as_str().unwrap_or_default().to_string()).collect();
            return Err(Error::Feed(joined.join(", ")));
        }
    }

    let ticker = body["result"]
        .as_object()
        .and_then(|m| m.values().next())
        .ok_or_else(|| Error::Feed("empty ticker result".to_string()))?;

    let ask = ticker["a"][0]
        .as_str()
        .ok_or_else(|| Error::Feed("ticker has no ask".to_string()))?;

    Decimal::from_str(ask).map_err(|e| Error::Feed(format!("bad ask '{}': {}", ask, e)))
}
