//! Goldshop Core - Real-time pricing stream client.
//!
//! This crate provides:
//! - A per-SKU pricing cache fed by the gateway's server-sent event stream
//! - Automatic reconnection with exponential backoff and an attempt cap
//! - Point-in-time REST fallback with configurable offline strategies
//!   (freeze / surcharge / deny) for stale data
//! - Connection and cache health reporting for UI consumers

mod types;

pub mod cache;
pub mod client;
pub mod clients;
pub mod stream;

pub use client::{
    PricingClientConfig, PricingStreamClient, PricingUpdateKind, StreamError,
};
pub use types::*;
