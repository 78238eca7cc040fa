//! Kraken v2 WebSocket ticker feed

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::core::{Error, PriceSource, Result, Symbol};
use crate::feeds::rest_client::KrakenRest;
use crate::market::PriceBook;

/// Decoded frame from the ticker stream
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// Prices from a `ticker` snapshot or update
    Ticks(Vec<(Symbol, Decimal)>),
    /// Response to a method call such as `subscribe`
    Ack {
        method: String,
        success: bool,
        error: Option<String>,
    },
    Heartbeat,
    /// Anything else (status frames, other channels)
    Other,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    channel: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    data: Vec<serde_json::Value>,
    method: Option<String>,
    success: Option<bool>,
    error: Option<String>,
}

/// `ask` arrives either as a bare number or as `[price, qty, ...]`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AskField {
    Level(Vec<Decimal>),
    Price(Decimal),
}

#[derive(Debug, Deserialize)]
struct TickerData {
    symbol: String,
    ask: AskField,
}

impl TickerData {
    fn ask_price(&self) -> Option<Decimal> {
        match &self.ask {
            AskField::Level(level) => level.first().copied(),
            AskField::Price(price) => Some(*price),
        }
    }
}

/// Decode one text frame. Ticker entries that fail to parse are skipped,
/// the rest of the frame is still used.
pub fn parse_message(text: &str) -> Result<FeedMessage> {
    let envelope: Envelope = serde_json::from_str(text)?;

    if let Some(method) = envelope.method {
        return Ok(FeedMessage::Ack {
            method,
            success: envelope.success.unwrap_or(false),
            error: envelope.error,
        });
    }

    match (envelope.channel.as_deref(), envelope.kind.as_deref()) {
        (Some("heartbeat"), _) => Ok(FeedMessage::Heartbeat),
        (Some("ticker"), Some("snapshot" | "update" | "ticker")) => {
            let ticks = envelope
                .data
                .into_iter()
                .filter_map(|entry| match serde_json::from_value::<TickerData>(entry) {
                    Ok(ticker) => {
                        let symbol = ticker.symbol.parse::<Symbol>().ok()?;
                        Some((symbol, ticker.ask_price()?))
                    }
                    Err(e) => {
                        debug!("Skipping malformed ticker entry: {}", e);
                        None
                    }
                })
                .collect();
            Ok(FeedMessage::Ticks(ticks))
        }
        _ => Ok(FeedMessage::Other),
    }
}

/// Subscription request for the ticker channel
pub fn subscribe_message(symbols: &[Symbol]) -> String {
    serde_json::json!({
        "method": "subscribe",
        "params": {
            "channel": "ticker",
            "symbol": symbols.iter().map(Symbol::as_str).collect::<Vec<_>>(),
        }
    })
    .to_string()
}

/// Streams Kraken ticker asks into the price book, reconnecting forever
pub struct KrakenFeed {
    name: String,
    ws_url: String,
    reconnect_delay: Duration,
    seed: Option<KrakenRest>,
}

impl KrakenFeed {
    pub fn new(ws_url: impl Into<String>, reconnect_delay: Duration) -> Self {
        Self {
            name: "kraken".to_string(),
            ws_url: ws_url.into(),
            reconnect_delay,
            seed: None,
        }
    }

    /// Seed the book from a REST snapshot before each connection attempt
    /// while the book is still empty.
    pub fn with_rest_seed(mut self, rest: KrakenRest) -> Self {
        self.seed = Some(rest);
        self
    }

    async fn seed_if_empty(&self, book: &PriceBook) {
        let Some(rest) = &self.seed else { return };
        if !book.is_empty() {
            return;
        }
        let snapshot = rest.snapshot(&book.catalogue()).await;
        if !snapshot.is_empty() {
            let kept = book.replace_all(snapshot);
            info!("Seeded {} prices from REST snapshot", kept);
        }
    }

    /// One connection lifetime: connect, subscribe, pump frames until close.
    async fn session(&self, book: &PriceBook) -> Result<()> {
        let url = Url::parse(&self.ws_url).map_err(|e| Error::Config(format!("bad ws_url: {}", e)))?;

        info!("Connecting to WebSocket: {}", url);

        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| Error::WebSocket(e.to_string()))?;

        info!("Connected to WebSocket: {}", self.name);

        let (mut write, mut read) = ws_stream.split();

        let subscribe = subscribe_message(&book.catalogue());
        debug!("Sending subscription message: {}", subscribe);
        write
            .send(Message::Text(subscribe))
            .await
            .map_err(|e| Error::WebSocket(e.to_string()))?;

        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => self.handle_text(book, &text),
                Ok(Message::Ping(data)) => {
                    write
                        .send(Message::Pong(data))
                        .await
                        .map_err(|e| Error::WebSocket(e.to_string()))?;
                }
                Ok(Message::Close(_)) => {
                    info!("WebSocket closed");
                    break;
                }
                Ok(_) => {}
                Err(e) => return Err(Error::WebSocket(e.to_string())),
            }
        }

        Ok(())
    }

    fn handle_text(&self, book: &PriceBook, text: &str) {
        match parse_message(text) {
            Ok(FeedMessage::Ticks(ticks)) => {
                for (symbol, price) in ticks {
                    if book.apply_tick(&symbol, price) {
                        debug!("Updated price for {}: {}", symbol, price);
                    }
                }
            }
            Ok(FeedMessage::Ack { method, success, error }) => {
                if success {
                    info!("Received response for method '{}'", method);
                } else {
                    warn!("Method '{}' failed: {}", method, error.unwrap_or_default());
                }
            }
            Ok(FeedMessage::Heartbeat) | Ok(FeedMessage::Other) => {}
            Err(e) => warn!("Failed to handle message: {}", e),
        }
    }
}

#[async_trait]
impl PriceSource for KrakenFeed {
    async fn run(&self, book: Arc<PriceBook>) -> Result<()> {
        loop {
            self.seed_if_empty(&book).await;

            match self.session(&book).await {
                Ok(()) => warn!("WebSocket connection lost, reconnecting..."),
                Err(e) => error!("WebSocket error: {}", e),
            }

            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
