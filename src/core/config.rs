//! Configuration - Type-safe, validated config
//!
//! Loads from `cryptosim.toml` (or the file named by `CRYPTOSIM_CONFIG`).
//! Every section has defaults, so a partial file is fine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::{Error, Result, Symbol};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "CRYPTOSIM_CONFIG";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener
    pub server: ServerConfig,

    /// Account defaults and cost basis
    pub account: AccountConfig,

    /// Price feed source and instrument catalogue
    pub feed: FeedConfig,

    /// Pre-trade limits
    pub risk: RiskConfig,

    /// Transaction journal
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. "0.0.0.0:8080"
    pub bind: String,

    /// Path prefix for every route
    pub base_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            base_path: "/api".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostBasisMethod {
    /// Moving weighted average of open purchases
    #[default]
    Average,
    /// Oldest open lots are sold first
    Fifo,
    /// Price of the most recent BUY of the symbol
    LastBuy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Balance of a fresh or reset account
    pub starting_balance: Decimal,

    /// How realized P/L is measured on sells
    pub cost_basis: CostBasisMethod,

    /// Whether reset also drops the transaction history
    pub clear_history_on_reset: bool,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            starting_balance: Decimal::new(1_000_000, 2),
            cost_basis: CostBasisMethod::Average,
            clear_history_on_reset: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    /// Kraken public ticker stream
    Kraken,
    /// Random walk, no network
    Simulated,
}

/// One catalogue entry. Catalogue order is the ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentSpec {
    pub symbol: Symbol,
    pub name: String,
    /// Starting price for the simulated source
    #[serde(default)]
    pub seed_price: Option<Decimal>,
}

impl InstrumentSpec {
    fn new(symbol: &str, name: &str, seed_price: Decimal) -> Self {
        Self {
            symbol: Symbol(symbol.to_string()),
            name: name.to_string(),
            seed_price: Some(seed_price),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub source: FeedSource,

    /// Kraken v2 WebSocket endpoint
    pub ws_url: String,

    /// Kraken REST base, used to seed prices before the stream delivers
    pub rest_url: String,

    /// Fetch a REST snapshot on start-up
    pub rest_seed: bool,

    /// Seconds to wait before reconnecting a dropped stream
    pub reconnect_delay_secs: u64,

    /// Milliseconds between simulated snapshots
    pub simulated_interval_ms: u64,

    /// Max relative move per simulated tick (0.01 = 1%)
    pub simulated_volatility: f64,

    /// Size of the ranked listing
    pub top_n: usize,

    /// Tracked instruments, best rank first
    pub instruments: Vec<InstrumentSpec>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            source: FeedSource::Kraken,
            ws_url: "wss://ws.kraken.com/v2".to_string(),
            rest_url: "https://api.kraken.com/0/public".to_string(),
            rest_seed: true,
            reconnect_delay_secs: 5,
            simulated_interval_ms: 2000,
            simulated_volatility: 0.01,
            top_n: 20,
            instruments: default_catalogue(),
        }
    }
}

fn default_catalogue() -> Vec<InstrumentSpec> {
    vec![
        InstrumentSpec::new("BTC/USD", "Bitcoin", Decimal::from(65_000)),
        InstrumentSpec::new("ETH/USD", "Ethereum", Decimal::from(3_200)),
        InstrumentSpec::new("SOL/USD", "Solana", Decimal::from(150)),
        InstrumentSpec::new("XRP/USD", "Ripple", Decimal::new(55, 2)),
        InstrumentSpec::new("ADA/USD", "Cardano", Decimal::new(45, 2)),
        InstrumentSpec::new("DOT/USD", "Polkadot", Decimal::new(65, 1)),
        InstrumentSpec::new("DOGE/USD", "Dogecoin", Decimal::new(12, 2)),
        InstrumentSpec::new("SHIB/USD", "Shiba Inu", Decimal::new(18, 6)),
        InstrumentSpec::new("MATIC/USD", "Polygon", Decimal::new(55, 2)),
        InstrumentSpec::new("LINK/USD", "Chainlink", Decimal::from(14)),
        InstrumentSpec::new("AVAX/USD", "Avalanche", Decimal::from(28)),
        InstrumentSpec::new("UNI/USD", "Uniswap", Decimal::new(75, 1)),
        InstrumentSpec::new("LTC/USD", "Litecoin", Decimal::from(70)),
        InstrumentSpec::new("ALGO/USD", "Algorand", Decimal::new(15, 2)),
        InstrumentSpec::new("ATOM/USD", "Cosmos", Decimal::new(68, 1)),
        InstrumentSpec::new("XTZ/USD", "Tezos", Decimal::new(75, 2)),
        InstrumentSpec::new("EOS/USD", "EOS", Decimal::new(60, 2)),
        InstrumentSpec::new("BCH/USD", "Bitcoin Cash", Decimal::from(350)),
        InstrumentSpec::new("XLM/USD", "Stellar", Decimal::new(10, 2)),
        InstrumentSpec::new("TRX/USD", "TRON", Decimal::new(13, 2)),
    ]
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Largest allowed notional per order
    pub max_order_value: Option<Decimal>,

    /// Smallest allowed notional per order (dust filter)
    pub min_order_value: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Append every executed transaction here as JSON lines
    pub journal_path: Option<PathBuf>,
}

impl Config {
    /// Load from TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config {}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `CRYPTOSIM_CONFIG`, else the default locations, else defaults.
    ///
    /// A file that exists but fails to parse or validate is an error; a
    /// missing file is not.
    pub fn load_default() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let cfg = Self::load(Path::new(&path))?;
            tracing::info!("📋 Loaded config from {}", path);
            return Ok(cfg);
        }

        let candidates = [
            "cryptosim.toml",
            concat!(env!("CARGO_MANIFEST_DIR"), "/cryptosim.toml"),
        ];

        for path in &candidates {
            let path = Path::new(path);
            if path.exists() {
                let cfg = Self::load(path)?;
                tracing::info!("📋 Loaded config from {}", path.display());
                return Ok(cfg);
            }
        }

        tracing::warn!("⚠️ No cryptosim.toml found, using defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        if self.account.starting_balance <= Decimal::ZERO {
            return Err(Error::Config("account.starting_balance must be positive".to_string()));
        }
        if self.feed.instruments.is_empty() {
            return Err(Error::Config("feed.instruments must not be empty".to_string()));
        }
        if self.feed.top_n == 0 {
            return Err(Error::Config("feed.top_n must be at least 1".to_string()));
        }
        if !(0.0..1.0).contains(&self.feed.simulated_volatility) {
            return Err(Error::Config("feed.simulated_volatility must be in [0, 1)".to_string()));
        }
        if self.feed.simulated_interval_ms == 0 {
            return Err(Error::Config("feed.simulated_interval_ms must be positive".to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        for spec in &self.feed.instruments {
            if !seen.insert(&spec.symbol) {
                return Err(Error::Config(format!("duplicate instrument {}", spec.symbol)));
            }
            if matches!(spec.seed_price, Some(p) if p <= Decimal::ZERO) {
                return Err(Error::Config(format!("seed_price for {} must be positive", spec.symbol)));
            }
        }

        if let (Some(min), Some(max)) = (self.risk.min_order_value, self.risk.max_order_value) {
            if min > max {
                return Err(Error::Config("risk.min_order_value exceeds risk.max_order_value".to_string()));
            }
        }
        if matches!(self.risk.max_order_value, Some(v) if v <= Decimal::ZERO) {
            return Err(Error::Config("risk.max_order_value must be positive".to_string()));
        }

        if !self.server.base_path.is_empty() && !self.server.base_path.starts_with('/') {
            return Err(Error::Config("server.base_path must start with '/'".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = Config::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.account.starting_balance, Decimal::new(1_000_000, 2));
        assert_eq!(cfg.feed.instruments.len(), 20);
        assert_eq!(cfg.feed.instruments[0].symbol.as_str(), "BTC/USD");
    }

    #[test]
    fn test_partial_toml() {
        let cfg = Config::from_toml(
            r#"
            [account]
            starting_balance = 500
            cost_basis = "fifo"

            [feed]
            source = "simulated"
            top_n = 5
            "#,
        )
        .unwrap();

        assert_eq!(cfg.account.starting_balance, Decimal::from(500));
        assert_eq!(cfg.account.cost_basis, CostBasisMethod::Fifo);
        assert!(cfg.account.clear_history_on_reset);
        assert_eq!(cfg.feed.source, FeedSource::Simulated);
        assert_eq!(cfg.feed.top_n, 5);
        assert_eq!(cfg.server.base_path, "/api");
    }

    #[test]
    fn test_custom_catalogue() {
        let cfg = Config::from_toml(
            r#"
            [[feed.instruments]]
            symbol = "eth/usd"
            name = "Ethereum"
            seed_price = 3000
            "#,
        )
        .unwrap();

        assert_eq!(cfg.feed.instruments.len(), 1);
        assert_eq!(cfg.feed.instruments[0].symbol.as_str(), "ETH/USD");
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(Config::from_toml("[account]\nstarting_balance = 0").is_err());
        assert!(Config::from_toml("[feed]\ninstruments = []").is_err());
        assert!(Config::from_toml("[risk]\nmin_order_value = 10\nmax_order_value = 5").is_err());

        let bad_symbol = r#"
            [[feed.instruments]]
            symbol = "BTCUSD"
            name = "Bitcoin"
        "#;
        assert!(Config::from_toml(bad_symbol).is_err());

        let duplicate = r#"
            [[feed.instruments]]
            symbol = "BTC/USD"
            name = "Bitcoin"

            [[feed.instruments]]
            symbol = "btc/usd"
            name = "Bitcoin again"
        "#;
        assert!(Config::from_toml(duplicate).is_err());
    }
}
