//! Local pricing cache keyed by SKU.
//!
//! Unbounded: every SKU ever observed is retained until an explicit
//! `clear`. Each insert stamps `cached_at`; validity always derives from
//! the server-assigned `as_of` and `ttl_sec`, never from insertion time.

use crate::types::{PriceQuote, PricingFields};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct PriceCache {
    entries: HashMap<String, PriceQuote>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Insert or overwrite the quote for `sku`. Last write wins; no
    /// `as_of` comparison is made against an existing entry.
    pub fn insert(&mut self, sku: &str, fields: PricingFields) -> PriceQuote {
        let quote = PriceQuote::from_fields(sku, fields, Utc::now());
        self.entries.insert(sku.to_string(), quote.clone());
        quote
    }

    pub fn get(&self, sku: &str) -> Option<&PriceQuote> {
        self.entries.get(sku)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Clone of every entry, fresh and stale alike.
    pub fn snapshot(&self) -> HashMap<String, PriceQuote> {
        self.entries.clone()
    }

    /// Number of entries still valid at `now`.
    pub fn valid_count(&self, now: DateTime<Utc>) -> usize {
        self.entries.values().filter(|q| q.is_valid_at(now)).count()
    }
}
