use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

use cryptosim::api::{self, AppState};
use cryptosim::engine::TradeEngine;
use cryptosim::feeds;
use cryptosim::ledger::Journal;
use cryptosim::market::PriceBook;
use cryptosim::risk::TradeGuard;
use cryptosim::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // 1. Logger
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,cryptosim=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    tracing::info!("🦀 cryptosim starting...");

    // 2. Configuration
    let config = Config::load_default()?;

    // 3. Price book and trade engine
    let book = Arc::new(PriceBook::new(&config.feed.instruments));
    tracing::info!("📈 Listed {} instruments", book.catalogue().len());

    let mut engine = TradeEngine::new(book.clone(), config.account.clone(), TradeGuard::new(config.risk.clone()));
    if let Some(path) = &config.ledger.journal_path {
        let journal = Journal::open(path)?;
        tracing::info!("📒 Journaling transactions to {}", journal.path().display());
        engine = engine.with_journal(journal);
    }
    let engine = Arc::new(engine);

    // 4. Price feed
    let source = feeds::from_config(&config.feed)?;
    tracing::info!("📡 Starting price feed: {}", source.name());
    let feed_book = book.clone();
    tokio::spawn(async move {
        if let Err(e) = source.run(feed_book).await {
            tracing::error!("Price feed {} stopped: {}", source.name(), e);
        }
    });

    // 5. HTTP server
    let app = api::router(
        AppState {
            engine,
            top_n: config.feed.top_n,
        },
        &config.server.base_path,
    );

    let listener = TcpListener::bind(&config.server.bind).await?;
    tracing::info!("🚀 Listening on {}{}", listener.local_addr()?, config.server.base_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("🛑 Shutdown signal received");
        })
        .await?;

    Ok(())
}
