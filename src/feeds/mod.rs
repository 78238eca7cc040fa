//! Market data feeds - WebSocket stream, REST seed, offline simulator

pub mod rest_client;
pub mod simulated;
pub mod ws_client;

pub use rest_client::KrakenRest;
pub use simulated::SimulatedFeed;
pub use ws_client::KrakenFeed;

use std::sync::Arc;
use std::time::Duration;

use crate::core::config::{FeedConfig, FeedSource};
use crate::core::{PriceSource, Result};

/// Build the configured price source
pub fn from_config(config: &FeedConfig) -> Result<Arc<dyn PriceSource>> {
    let source: Arc<dyn PriceSource> = match config.source {
        FeedSource::Kraken => {
            let mut feed = KrakenFeed::new(&config.ws_url, Duration::from_secs(config.reconnect_delay_secs));
            if config.rest_seed {
                feed = feed.with_rest_seed(KrakenRest::new(&config.rest_url)?);
            }
            Arc::new(feed)
        }
        FeedSource::Simulated => Arc::new(SimulatedFeed::new(
            &config.instruments,
            Duration::from_millis(config.simulated_interval_ms),
            config.simulated_volatility,
        )),
    };
    Ok(source)
}
