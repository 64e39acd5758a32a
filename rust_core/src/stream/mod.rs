//! Server-push transport for the pricing event stream.

pub mod sse;
pub mod subscription;

pub use subscription::{
    PricingSubscription, ReconnectConfig, StreamSignal, StreamStats, MAX_RECONNECT_DELAY_MS,
};
