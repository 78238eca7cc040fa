//! Core traits - seams between the feed, the price book and the engine

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::Result;
use crate::market::PriceBook;

/// A source of market prices that keeps a [`PriceBook`] current.
///
/// `run` owns the source's loop and returns only on a fatal error or when
/// the source is exhausted. Reconnection is the source's business.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Drive the source, writing into `book`
    async fn run(&self, book: Arc<PriceBook>) -> Result<()>;

    /// Source name for logs
    fn name(&self) -> &str;
}
