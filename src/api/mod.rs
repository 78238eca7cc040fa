//! HTTP API - axum router over the trade engine

pub mod error;
pub mod handlers;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::engine::TradeEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TradeEngine>,
    /// Length of the ranked instrument listing
    pub top_n: usize,
}

/// Routes relative to the base path
fn routes() -> Router<AppState> {
    Router::new()
        .route("/crypto/ping", get(handlers::ping))
        .route("/crypto/top20", get(handlers::top_instruments))
        .route("/crypto/ticker/:base/:quote", get(handlers::ticker))
        .route("/user/:id/account", get(handlers::account))
        .route("/user/:id/transactions", get(handlers::transactions))
        .route("/user/:id/get-portfolio", get(handlers::portfolio))
        .route("/user/:id/buy", post(handlers::buy))
        .route("/user/:id/sell", post(handlers::sell))
        .route("/user/:id/reset", post(handlers::reset))
}

/// Full application router mounted under `base_path` ("" or "/" for root)
pub fn router(state: AppState, base_path: &str) -> Router {
    let base = base_path.trim_end_matches('/');
    let app = if base.is_empty() {
        routes()
    } else {
        Router::new().nest(base, routes())
    };

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
