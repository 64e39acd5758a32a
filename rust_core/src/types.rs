//! Pricing domain types shared by the cache, transport, and client layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Validity window applied when the server payload omits `ttl_sec`.
pub const DEFAULT_TTL_SEC: i64 = 300;

/// Material a priced product is made of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Material {
    Gold,
    Silver,
}

/// Fallback policy applied when a cached quote is stale and the
/// point-in-time fetch fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfflineStrategy {
    Freeze,
    Surcharge,
    Deny,
}

impl OfflineStrategy {
    /// Parse a strategy name. Unrecognized names fall back to `Freeze`,
    /// matching the gateway's default.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "deny" => OfflineStrategy::Deny,
            "surcharge" => OfflineStrategy::Surcharge,
            _ => OfflineStrategy::Freeze,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OfflineStrategy::Freeze => "freeze",
            OfflineStrategy::Surcharge => "surcharge",
            OfflineStrategy::Deny => "deny",
        }
    }
}

impl Default for OfflineStrategy {
    fn default() -> Self {
        OfflineStrategy::Freeze
    }
}

/// Pricing fields as they appear on the wire, both in SSE payloads and in
/// REST pricing responses. Unknown fields are ignored so gateway-side
/// additions don't break older clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PricingFields {
    /// Final sale price after markup (VND).
    pub final_price: f64,
    /// When the price was computed server-side.
    pub as_of: DateTime<Utc>,
    /// Seconds after `as_of` during which the quote is fresh.
    #[serde(default = "default_ttl")]
    pub ttl_sec: i64,
    #[serde(default)]
    pub base_price: Option<f64>,
    #[serde(default)]
    pub rate_used: Option<f64>,
    #[serde(default)]
    pub weight_gram: Option<f64>,
    #[serde(default)]
    pub stone_weight: Option<f64>,
    #[serde(default)]
    pub labor_cost: Option<f64>,
    #[serde(default)]
    pub markup_percent: Option<f64>,
    #[serde(default)]
    pub material: Option<Material>,
    #[serde(default)]
    pub snapshot_version: Option<i64>,
}

fn default_ttl() -> i64 {
    DEFAULT_TTL_SEC
}

/// A cached pricing record for one SKU.
///
/// `cached_at` is stamped locally when the record enters the cache and is
/// diagnostic only; validity is always derived from the server-assigned
/// `as_of` and `ttl_sec`.
#[derive(Clone, Debug, Serialize)]
pub struct PriceQuote {
    pub sku: String,
    pub final_price: f64,
    pub as_of: DateTime<Utc>,
    pub ttl_sec: i64,
    pub cached_at: DateTime<Utc>,
    pub base_price: Option<f64>,
    pub rate_used: Option<f64>,
    pub weight_gram: Option<f64>,
    pub stone_weight: Option<f64>,
    pub labor_cost: Option<f64>,
    pub markup_percent: Option<f64>,
    pub material: Option<Material>,
    pub snapshot_version: Option<i64>,
}

impl PriceQuote {
    pub fn from_fields(
        sku: impl Into<String>,
        fields: PricingFields,
        cached_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sku: sku.into(),
            final_price: fields.final_price,
            as_of: fields.as_of,
            ttl_sec: fields.ttl_sec,
            cached_at,
            base_price: fields.base_price,
            rate_used: fields.rate_used,
            weight_gram: fields.weight_gram,
            stone_weight: fields.stone_weight,
            labor_cost: fields.labor_cost,
            markup_percent: fields.markup_percent,
            material: fields.material,
            snapshot_version: fields.snapshot_version,
        }
    }

    /// A quote is valid at `now` iff `now - as_of <= ttl_sec * 1000` ms.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        (now - self.as_of).num_milliseconds() <= self.ttl_sec * 1000
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Derived quote with the surcharge multiplier applied to the final
    /// price. The derived record is never written back into the cache.
    pub fn with_surcharge(&self, multiplier: f64) -> PriceQuote {
        let mut quote = self.clone();
        quote.final_price *= multiplier;
        quote
    }
}

/// Decoded server-push event. The transport layer turns raw SSE frames
/// into this union so the client only ever handles structured data.
#[derive(Clone, Debug)]
pub enum StreamEvent {
    /// Full pricing snapshot, always the first payload after a successful
    /// (re)connection.
    Initial {
        pricing: HashMap<String, PricingFields>,
    },
    /// Single-SKU overwrite.
    PricingUpdate { sku: String, pricing: PricingFields },
    /// Liveness marker; payload ignored.
    Keepalive,
}

/// Where a `PricingResult` came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Cache,
    Api,
    CacheExpired,
    CacheSurcharge,
    CacheFreeze,
    Error,
}

impl PriceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceSource::Cache => "cache",
            PriceSource::Api => "api",
            PriceSource::CacheExpired => "cache_expired",
            PriceSource::CacheSurcharge => "cache_surcharge",
            PriceSource::CacheFreeze => "cache_freeze",
            PriceSource::Error => "error",
        }
    }
}

/// Outcome of a pricing lookup. Failures are values, not panics or
/// `Err`s: offline, stale, and unreachable are all expected modes and the
/// caller decides how to present them.
#[derive(Clone, Debug, Serialize)]
pub struct PricingResult {
    pub success: bool,
    pub source: PriceSource,
    pub data: Option<PriceQuote>,
    pub error: Option<String>,
    pub strategy_applied: Option<OfflineStrategy>,
    pub is_expired: bool,
}

impl PricingResult {
    pub fn cache_hit(quote: PriceQuote) -> Self {
        Self {
            success: true,
            source: PriceSource::Cache,
            data: Some(quote),
            error: None,
            strategy_applied: None,
            is_expired: false,
        }
    }

    pub fn fetch_failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            source: PriceSource::Error,
            data: None,
            error: Some(message.into()),
            strategy_applied: None,
            is_expired: false,
        }
    }
}

/// Point-in-time view of the client's connection and cache health.
/// `valid_pricing_count` is recomputed on every call rather than cached.
#[derive(Clone, Debug, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub reconnect_attempts: u32,
    pub cache_size: usize,
    pub valid_pricing_count: usize,
}

/// Format an amount as Vietnamese đồng, e.g. `1.234.567 ₫`.
///
/// VND has no fractional unit; amounts are rounded to the whole đồng and
/// grouped with dots.
pub fn format_price(amount: f64) -> String {
    let negative = amount < 0.0;
    let digits = format!("{:.0}", amount.abs());
    let bytes = digits.as_bytes();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 4);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*b as char);
    }
    if negative {
        format!("-{} ₫", grouped)
    } else {
        format!("{} ₫", grouped)
    }
}
