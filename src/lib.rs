//! cryptosim - Core Library
//! Simulated crypto trading accounts priced from a live market feed

// Public modules
pub mod api;
pub mod core;
pub mod engine;
pub mod feeds;
pub mod ledger;
pub mod market;
pub mod risk;

// Re-exports
pub use core::{Config, Error, Result};
