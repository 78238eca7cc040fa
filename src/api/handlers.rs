//! Route handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::core::{Account, Instrument, Portfolio, Symbol, Transaction, UserId};

/// Body of `buy` and `sell`
#[derive(Debug, Deserialize)]
pub struct TradeRequest {
    pub symbol: String,
    #[serde(deserialize_with = "deserialize_quantity")]
    pub quantity: Decimal,
}

/// Clients send the quantity as a JSON number or a decimal string.
/// Numbers keep their literal digits, so no float rounding happens here.
fn deserialize_quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
    let raw = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        other => return Err(serde::de::Error::custom(format!("invalid quantity {}", other))),
    };
    parse_decimal(raw.trim()).ok_or_else(|| serde::de::Error::custom(format!("invalid quantity '{}'", raw)))
}

pub fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s).or_else(|_| Decimal::from_scientific(s)).ok()
}

fn user(id: String) -> Result<UserId, ApiError> {
    Ok(UserId::new(id)?)
}

fn trade_body(body: Result<Json<TradeRequest>, JsonRejection>) -> Result<(Symbol, Decimal), ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let symbol = req.symbol.parse::<Symbol>()?;
    Ok((symbol, req.quantity))
}

pub async fn ping() -> &'static str {
    "pong"
}

pub async fn top_instruments(State(state): State<AppState>) -> Json<Vec<Instrument>> {
    Json(state.engine.prices().top(state.top_n))
}

pub async fn ticker(
    State(state): State<AppState>,
    Path((base, quote)): Path<(String, String)>,
) -> Result<Json<Instrument>, ApiError> {
    let symbol = Symbol::new(&base, &quote)?;
    state
        .engine
        .prices()
        .get(&symbol)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Cryptocurrency not found: {}", symbol)))
}

pub async fn account(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Account>, ApiError> {
    let user_id = user(id)?;
    Ok(Json(state.engine.account(&user_id)))
}

pub async fn transactions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let user_id = user(id)?;
    Ok(Json(state.engine.transactions(&user_id)))
}

pub async fn portfolio(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Portfolio>, ApiError> {
    let user_id = user(id)?;
    Ok(Json(state.engine.portfolio(&user_id)?))
}

pub async fn buy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<TradeRequest>, JsonRejection>,
) -> Result<Json<Transaction>, ApiError> {
    let user_id = user(id)?;
    let (symbol, quantity) = trade_body(body)?;
    Ok(Json(state.engine.buy(&user_id, &symbol, quantity)?))
}

pub async fn sell(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<TradeRequest>, JsonRejection>,
) -> Result<Json<Transaction>, ApiError> {
    let user_id = user(id)?;
    let (symbol, quantity) = trade_body(body)?;
    Ok(Json(state.engine.sell(&user_id, &symbol, quantity)?))
}

pub async fn reset(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    let user_id = user(id)?;
    state.engine.reset(&user_id);
    Ok(StatusCode::OK)
}
