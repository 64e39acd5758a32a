//! Real-time pricing client with SSE streaming and local caching.
//!
//! `PricingStreamClient` keeps a per-SKU quote cache fed by the gateway's
//! event stream, reconnects with exponential backoff when the stream
//! drops, and answers lookups from cache, then the REST endpoint, then a
//! caller-selected offline strategy, in that order.

use crate::cache::PriceCache;
use crate::clients::pricing_api::{PricingFetcher, RestPricingClient};
use crate::stream::subscription::{PricingSubscription, ReconnectConfig, StreamSignal, StreamStats};
use crate::types::{
    ConnectionStatus, OfflineStrategy, PriceQuote, PriceSource, PricingResult, StreamEvent,
};
use anyhow::Result;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use reqwest::Client;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const USER_AGENT: &str = "goldshop-pricing/1.0";

/// Transport-level and terminal failures surfaced through the error
/// callback. Lookup failures are reported through `PricingResult`, never
/// through this type.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("pricing stream transport error: {0}")]
    Transport(String),
    #[error("max reconnect attempts reached ({0})")]
    RetriesExhausted(u32),
}

/// Which kind of stream payload produced a pricing-update callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PricingUpdateKind {
    Initial,
    Update,
}

pub type PricingUpdateCallback =
    Box<dyn Fn(PricingUpdateKind, &HashMap<String, PriceQuote>) + Send + Sync>;
pub type ConnectionChangeCallback = Box<dyn Fn(bool) + Send + Sync>;
pub type ErrorCallback = Box<dyn Fn(&StreamError) + Send + Sync>;

#[derive(Default)]
struct Callbacks {
    on_pricing_update: RwLock<Option<PricingUpdateCallback>>,
    on_connection_change: RwLock<Option<ConnectionChangeCallback>>,
    on_error: RwLock<Option<ErrorCallback>>,
}

/// Client configuration.
///
/// `cache_expiry_ms` is informational for consumers that read it back;
/// quote validity always follows each record's own `ttl_sec`.
#[derive(Clone, Debug)]
pub struct PricingClientConfig {
    pub reconnect_interval_ms: u64,
    pub max_reconnect_attempts: u32,
    pub cache_expiry_ms: u64,
    pub surcharge_multiplier: f64,
    pub request_timeout_secs: u64,
}

impl Default for PricingClientConfig {
    fn default() -> Self {
        Self {
            reconnect_interval_ms: 5_000,
            max_reconnect_attempts: 10,
            cache_expiry_ms: 300_000,
            surcharge_multiplier: 1.05,
            request_timeout_secs: 30,
        }
    }
}

impl PricingClientConfig {
    /// Load overrides from `PRICING_*` environment variables, falling back
    /// to the defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            reconnect_interval_ms: parse_env(
                "PRICING_RECONNECT_INTERVAL_MS",
                defaults.reconnect_interval_ms,
            ),
            max_reconnect_attempts: parse_env(
                "PRICING_MAX_RECONNECT_ATTEMPTS",
                defaults.max_reconnect_attempts,
            ),
            cache_expiry_ms: parse_env("PRICING_CACHE_EXPIRY_MS", defaults.cache_expiry_ms),
            surcharge_multiplier: parse_env(
                "PRICING_SURCHARGE_MULTIPLIER",
                defaults.surcharge_multiplier,
            ),
            request_timeout_secs: parse_env(
                "PRICING_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            ),
        }
    }

    fn reconnect(&self) -> ReconnectConfig {
        ReconnectConfig {
            reconnect_interval_ms: self.reconnect_interval_ms,
            max_reconnect_attempts: self.max_reconnect_attempts,
        }
    }
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

struct ClientInner {
    base_url: String,
    config: PricingClientConfig,
    stream_http: Client,
    fetcher: Arc<dyn PricingFetcher>,
    cache: RwLock<PriceCache>,
    stats: Arc<StreamStats>,
    callbacks: Callbacks,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

/// Real-time pricing client. One instance per consumer; instances share
/// nothing, so independent clients can point at different gateways.
///
/// Must be created from within a Tokio runtime: construction opens the
/// event stream immediately.
pub struct PricingStreamClient {
    inner: Arc<ClientInner>,
}

impl PricingStreamClient {
    /// Create a client against `base_url` and immediately open the event
    /// stream.
    pub fn new(base_url: impl Into<String>, config: PricingClientConfig) -> Self {
        let base_url = base_url.into();
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to create HTTP client");
        // The stream stays open indefinitely, so its client only gets a
        // connect timeout rather than a whole-request timeout.
        let stream_http = Client::builder()
            .connect_timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to create HTTP client");
        let fetcher: Arc<dyn PricingFetcher> =
            Arc::new(RestPricingClient::new(base_url.clone(), http));

        let client = Self::build(base_url, config, stream_http, fetcher);
        client.connect();
        client
    }

    /// Assemble a client without opening the stream. Used by `new` and by
    /// tests that inject a fetcher.
    pub(crate) fn build(
        base_url: String,
        config: PricingClientConfig,
        stream_http: Client,
        fetcher: Arc<dyn PricingFetcher>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                base_url,
                config,
                stream_http,
                fetcher,
                cache: RwLock::new(PriceCache::new()),
                stats: Arc::new(StreamStats::default()),
                callbacks: Callbacks::default(),
                consumer: Mutex::new(None),
            }),
        }
    }

    /// (Re)open the event stream. Any previous subscription is torn down
    /// first, so repeated calls are safe; this is also how a consumer
    /// resumes after the reconnect budget ran out.
    pub fn connect(&self) {
        let mut consumer = self.inner.consumer.lock();
        if let Some(handle) = consumer.take() {
            handle.abort();
        }

        let subscription = PricingSubscription::new(
            self.inner.base_url.clone(),
            self.inner.stream_http.clone(),
            self.inner.config.reconnect(),
            self.inner.stats.clone(),
        );
        let mut signals = subscription.into_signal_stream();
        let inner = self.inner.clone();
        *consumer = Some(tokio::spawn(async move {
            while let Some(signal) = signals.recv().await {
                inner.handle_signal(signal);
            }
        }));
    }

    /// Close the subscription. The cache is left intact. Safe to call
    /// when already disconnected; the state updates still apply.
    pub fn disconnect(&self) {
        {
            let mut consumer = self.inner.consumer.lock();
            if let Some(handle) = consumer.take() {
                handle.abort();
            }
        }
        self.inner.stats.record_drop();
        self.inner.fire_connection_change(false);
    }

    /// Look up pricing for `sku` with the default `freeze` strategy.
    pub async fn get_pricing(&self, sku: &str) -> PricingResult {
        self.get_pricing_with(sku, OfflineStrategy::Freeze).await
    }

    /// Look up pricing for `sku`: fresh cache first, then the REST
    /// endpoint, then the offline strategy against whatever stale quote
    /// is on hand. Always returns a result; never panics or errors for
    /// the documented failure modes.
    pub async fn get_pricing_with(&self, sku: &str, strategy: OfflineStrategy) -> PricingResult {
        let cached = self.inner.cache.read().get(sku).cloned();
        if let Some(quote) = &cached {
            if quote.is_valid_at(Utc::now()) {
                return PricingResult::cache_hit(quote.clone());
            }
        }

        match self.inner.fetcher.fetch_pricing(sku, strategy).await {
            Ok(response) => {
                let quote = match response.data {
                    Some(fields) if response.success => {
                        Some(self.inner.cache.write().insert(sku, fields))
                    }
                    Some(fields) => Some(PriceQuote::from_fields(sku, fields, Utc::now())),
                    None => None,
                };
                PricingResult {
                    success: response.success,
                    source: PriceSource::Api,
                    data: quote,
                    error: response.error,
                    strategy_applied: response.strategy_applied,
                    is_expired: response.is_expired,
                }
            }
            Err(e) => {
                warn!("pricing fetch failed for {}: {:#}", sku, e);
                match cached {
                    Some(stale) => self.inner.apply_offline_strategy(sku, stale, strategy),
                    None => PricingResult::fetch_failed(e.to_string()),
                }
            }
        }
    }

    /// Snapshot of every cached quote, fresh and stale alike. Callers
    /// that need freshness can check `PriceQuote::is_valid_at` themselves.
    pub fn get_all_pricing(&self) -> HashMap<String, PriceQuote> {
        self.inner.cache.read().snapshot()
    }

    pub fn get_connection_status(&self) -> ConnectionStatus {
        let cache = self.inner.cache.read();
        ConnectionStatus {
            connected: self.inner.stats.is_connected(),
            reconnect_attempts: self.inner.stats.attempts(),
            cache_size: cache.len(),
            valid_pricing_count: cache.valid_count(Utc::now()),
        }
    }

    /// Empty the cache. Connection state is unaffected.
    pub fn clear_cache(&self) {
        self.inner.cache.write().clear();
        info!("pricing cache cleared");
    }

    /// Prime the cache from the gateway's get-all endpoint. Returns how
    /// many quotes were loaded.
    pub async fn warm_cache(&self) -> Result<usize> {
        let pricing = self.inner.fetcher.fetch_all_pricing().await?;
        let count = pricing.len();
        let mut cache = self.inner.cache.write();
        for (sku, fields) in pricing {
            cache.insert(&sku, fields);
        }
        Ok(count)
    }

    /// Ask the gateway to emit a synthetic pricing update. Manual and
    /// integration testing only.
    pub async fn trigger_test_update(&self) -> Result<String> {
        self.inner.fetcher.trigger_test_update().await
    }

    /// Register the pricing-update callback, invoked synchronously from
    /// the event path whenever stream data lands in the cache.
    pub fn set_on_pricing_update(
        &self,
        callback: impl Fn(PricingUpdateKind, &HashMap<String, PriceQuote>) + Send + Sync + 'static,
    ) {
        *self.inner.callbacks.on_pricing_update.write() = Some(Box::new(callback));
    }

    /// Register the connection-change callback, invoked with `true` on
    /// every successful open and `false` on every drop or disconnect.
    pub fn set_on_connection_change(&self, callback: impl Fn(bool) + Send + Sync + 'static) {
        *self.inner.callbacks.on_connection_change.write() = Some(Box::new(callback));
    }

    /// Register the error callback for transport and terminal failures.
    pub fn set_on_error(&self, callback: impl Fn(&StreamError) + Send + Sync + 'static) {
        *self.inner.callbacks.on_error.write() = Some(Box::new(callback));
    }
}

impl Drop for PricingStreamClient {
    fn drop(&mut self) {
        if let Some(handle) = self.inner.consumer.lock().take() {
            handle.abort();
        }
    }
}

impl ClientInner {
    fn handle_signal(&self, signal: StreamSignal) {
        match signal {
            StreamSignal::Opened => {
                self.fire_connection_change(true);
            }
            StreamSignal::Event(event) => self.apply_event(event),
            StreamSignal::TransportError(message) => {
                self.fire_connection_change(false);
                self.fire_error(&StreamError::Transport(message));
            }
            StreamSignal::RetriesExhausted(attempts) => {
                self.fire_error(&StreamError::RetriesExhausted(attempts));
            }
        }
    }

    fn apply_event(&self, event: StreamEvent) {
        match event {
            StreamEvent::Initial { pricing } => {
                let mut updated = HashMap::with_capacity(pricing.len());
                {
                    let mut cache = self.cache.write();
                    for (sku, fields) in pricing {
                        let quote = cache.insert(&sku, fields);
                        updated.insert(sku, quote);
                    }
                }
                info!("seeded pricing cache with {} quotes", updated.len());
                self.fire_pricing_update(PricingUpdateKind::Initial, &updated);
            }
            StreamEvent::PricingUpdate { sku, pricing } => {
                let quote = self.cache.write().insert(&sku, pricing);
                debug!("pricing update for {}", sku);
                let mut updated = HashMap::with_capacity(1);
                updated.insert(sku, quote);
                self.fire_pricing_update(PricingUpdateKind::Update, &updated);
            }
            StreamEvent::Keepalive => {
                debug!("pricing stream keepalive");
            }
        }
    }

    /// Resolve a stale quote according to the caller's offline strategy.
    fn apply_offline_strategy(
        &self,
        sku: &str,
        stale: PriceQuote,
        strategy: OfflineStrategy,
    ) -> PricingResult {
        match strategy {
            OfflineStrategy::Deny => PricingResult {
                success: false,
                source: PriceSource::CacheExpired,
                error: Some(format!("Pricing data expired for {}", sku)),
                data: Some(stale),
                strategy_applied: Some(OfflineStrategy::Deny),
                is_expired: true,
            },
            OfflineStrategy::Surcharge => PricingResult {
                success: true,
                source: PriceSource::CacheSurcharge,
                data: Some(stale.with_surcharge(self.config.surcharge_multiplier)),
                error: None,
                strategy_applied: Some(OfflineStrategy::Surcharge),
                is_expired: true,
            },
            OfflineStrategy::Freeze => PricingResult {
                success: true,
                source: PriceSource::CacheFreeze,
                data: Some(stale),
                error: None,
                strategy_applied: Some(OfflineStrategy::Freeze),
                is_expired: true,
            },
        }
    }

    fn fire_pricing_update(&self, kind: PricingUpdateKind, quotes: &HashMap<String, PriceQuote>) {
        if let Some(callback) = self.callbacks.on_pricing_update.read().as_ref() {
            callback(kind, quotes);
        }
    }

    fn fire_connection_change(&self, connected: bool) {
        if let Some(callback) = self.callbacks.on_connection_change.read().as_ref() {
            callback(connected);
        }
    }

    fn fire_error(&self, error: &StreamError) {
        if let Some(callback) = self.callbacks.on_error.read().as_ref() {
            callback(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::pricing_api::PricingApiResponse;
    use crate::types::PricingFields;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum MockReply {
        Quote(PricingFields),
        ApiFailure(String),
        NetworkError,
    }

    struct MockFetcher {
        reply: MockReply,
        calls: AtomicUsize,
    }

    impl MockFetcher {
        fn new(reply: MockReply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PricingFetcher for MockFetcher {
        async fn fetch_pricing(
            &self,
            _sku: &str,
            _strategy: OfflineStrategy,
        ) -> Result<PricingApiResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                MockReply::Quote(fields) => Ok(PricingApiResponse {
                    success: true,
                    data: Some(fields.clone()),
                    error: None,
                    is_expired: false,
                    strategy_applied: None,
                }),
                MockReply::ApiFailure(message) => Ok(PricingApiResponse {
                    success: false,
                    data: None,
                    error: Some(message.clone()),
                    is_expired: false,
                    strategy_applied: None,
                }),
                MockReply::NetworkError => Err(anyhow!("connection refused")),
            }
        }

        async fn fetch_all_pricing(&self) -> Result<HashMap<String, PricingFields>> {
            Ok(HashMap::new())
        }

        async fn trigger_test_update(&self) -> Result<String> {
            Ok("Test data publishing...".to_string())
        }
    }

    fn make_fields(price: f64, age_secs: i64, ttl_sec: i64) -> PricingFields {
        PricingFields {
            final_price: price,
            as_of: Utc::now() - ChronoDuration::seconds(age_secs),
            ttl_sec,
            base_price: None,
            rate_used: None,
            weight_gram: None,
            stone_weight: None,
            labor_cost: None,
            markup_percent: None,
            material: None,
            snapshot_version: None,
        }
    }

    fn offline_client(fetcher: Arc<MockFetcher>) -> PricingStreamClient {
        PricingStreamClient::build(
            "http://localhost:8000".to_string(),
            PricingClientConfig::default(),
            Client::new(),
            fetcher,
        )
    }

    #[tokio::test]
    async fn test_valid_cache_hit_skips_fetch() {
        let fetcher = MockFetcher::new(MockReply::NetworkError);
        let client = offline_client(fetcher.clone());
        client.inner.cache.write().insert("SKU1", make_fields(100.0, 0, 300));

        let result = client.get_pricing("SKU1").await;
        assert!(result.success);
        assert_eq!(result.source, PriceSource::Cache);
        assert_eq!(result.data.unwrap().final_price, 100.0);
        // Fast path: the fetcher must not have been touched
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_miss_fetches_and_populates() {
        let fetcher = MockFetcher::new(MockReply::Quote(make_fields(250.0, 0, 300)));
        let client = offline_client(fetcher.clone());

        let result = client.get_pricing("SKU2").await;
        assert!(result.success);
        assert_eq!(result.source, PriceSource::Api);
        assert_eq!(result.data.unwrap().final_price, 250.0);
        assert_eq!(fetcher.calls(), 1);

        let all = client.get_all_pricing();
        assert_eq!(all["SKU2"].final_price, 250.0);
    }

    #[tokio::test]
    async fn test_api_failure_response_is_passed_through() {
        let fetcher = MockFetcher::new(MockReply::ApiFailure(
            "No pricing data for SKU: SKU9".to_string(),
        ));
        let client = offline_client(fetcher);

        let result = client.get_pricing("SKU9").await;
        assert!(!result.success);
        assert_eq!(result.source, PriceSource::Api);
        assert!(result.data.is_none());
        assert_eq!(
            result.error.as_deref(),
            Some("No pricing data for SKU: SKU9")
        );
        assert!(client.get_all_pricing().is_empty());
    }

    #[tokio::test]
    async fn test_stale_cache_with_failing_fetch_deny() {
        let fetcher = MockFetcher::new(MockReply::NetworkError);
        let client = offline_client(fetcher);
        client.inner.cache.write().insert("SKU1", make_fields(100.0, 600, 300));

        let result = client
            .get_pricing_with("SKU1", OfflineStrategy::Deny)
            .await;
        assert!(!result.success);
        assert_eq!(result.source, PriceSource::CacheExpired);
        assert_eq!(result.strategy_applied, Some(OfflineStrategy::Deny));
        // The stale record stays attached for inspection
        assert_eq!(result.data.unwrap().final_price, 100.0);
    }

    #[tokio::test]
    async fn test_stale_cache_with_failing_fetch_surcharge() {
        let fetcher = MockFetcher::new(MockReply::NetworkError);
        let client = offline_client(fetcher);
        client.inner.cache.write().insert("SKU1", make_fields(100.0, 600, 300));

        let result = client
            .get_pricing_with("SKU1", OfflineStrategy::Surcharge)
            .await;
        assert!(result.success);
        assert_eq!(result.source, PriceSource::CacheSurcharge);
        assert!(result.is_expired);
        let quote = result.data.unwrap();
        assert!((quote.final_price - 105.0).abs() < 1e-9);
        // The derived record is not written back into the cache
        assert_eq!(
            client.get_all_pricing()["SKU1"].final_price,
            100.0
        );
    }

    #[tokio::test]
    async fn test_stale_cache_with_failing_fetch_freeze() {
        let fetcher = MockFetcher::new(MockReply::NetworkError);
        let client = offline_client(fetcher);
        client.inner.cache.write().insert("SKU1", make_fields(100.0, 600, 300));

        let result = client
            .get_pricing_with("SKU1", OfflineStrategy::Freeze)
            .await;
        assert!(result.success);
        assert_eq!(result.source, PriceSource::CacheFreeze);
        assert!(result.is_expired);
        assert_eq!(result.data.unwrap().final_price, 100.0);
    }

    #[tokio::test]
    async fn test_failing_fetch_with_no_cache_is_an_error_result() {
        let fetcher = MockFetcher::new(MockReply::NetworkError);
        let client = offline_client(fetcher);

        let result = client.get_pricing("GHOST").await;
        assert!(!result.success);
        assert_eq!(result.source, PriceSource::Error);
        assert!(result.data.is_none());
        assert!(result.error.unwrap().contains("connection refused"));
    }

    #[test]
    fn test_initial_event_seeds_cache() {
        let fetcher = MockFetcher::new(MockReply::NetworkError);
        let client = offline_client(fetcher);

        let kinds: Arc<Mutex<Vec<PricingUpdateKind>>> = Arc::new(Mutex::new(Vec::new()));
        let seen = kinds.clone();
        client.set_on_pricing_update(move |kind, _quotes| seen.lock().push(kind));

        let mut pricing = HashMap::new();
        pricing.insert("SKU1".to_string(), make_fields(100.0, 0, 300));
        client
            .inner
            .handle_signal(StreamSignal::Event(StreamEvent::Initial { pricing }));

        let all = client.get_all_pricing();
        assert_eq!(all.len(), 1);
        assert_eq!(all["SKU1"].final_price, 100.0);
        assert_eq!(*kinds.lock(), vec![PricingUpdateKind::Initial]);
    }

    #[test]
    fn test_pricing_update_overwrites_initial() {
        let fetcher = MockFetcher::new(MockReply::NetworkError);
        let client = offline_client(fetcher);

        let mut pricing = HashMap::new();
        pricing.insert("SKU1".to_string(), make_fields(100.0, 0, 300));
        client
            .inner
            .handle_signal(StreamSignal::Event(StreamEvent::Initial { pricing }));
        client
            .inner
            .handle_signal(StreamSignal::Event(StreamEvent::PricingUpdate {
                sku: "SKU1".to_string(),
                pricing: make_fields(120.0, 0, 300),
            }));

        let all = client.get_all_pricing();
        assert_eq!(all.len(), 1);
        assert_eq!(all["SKU1"].final_price, 120.0);
    }

    #[test]
    fn test_keepalive_changes_nothing() {
        let fetcher = MockFetcher::new(MockReply::NetworkError);
        let client = offline_client(fetcher);

        let updates = Arc::new(AtomicUsize::new(0));
        let seen = updates.clone();
        client.set_on_pricing_update(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        client
            .inner
            .handle_signal(StreamSignal::Event(StreamEvent::Keepalive));
        assert!(client.get_all_pricing().is_empty());
        assert_eq!(updates.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_connection_callbacks_follow_signals() {
        let fetcher = MockFetcher::new(MockReply::NetworkError);
        let client = offline_client(fetcher);

        let changes: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));
        let errors: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_changes = changes.clone();
        let seen_errors = errors.clone();
        client.set_on_connection_change(move |connected| seen_changes.lock().push(connected));
        client.set_on_error(move |e| seen_errors.lock().push(e.to_string()));

        client.inner.handle_signal(StreamSignal::Opened);
        client
            .inner
            .handle_signal(StreamSignal::TransportError("stream ended".to_string()));
        client.inner.handle_signal(StreamSignal::RetriesExhausted(10));

        assert_eq!(*changes.lock(), vec![true, false]);
        let errors = errors.lock();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("stream ended"));
        assert!(errors[1].contains("max reconnect attempts reached (10)"));
    }

    #[test]
    fn test_disconnect_keeps_cache() {
        let fetcher = MockFetcher::new(MockReply::NetworkError);
        let client = offline_client(fetcher);
        client.inner.cache.write().insert("SKU1", make_fields(100.0, 0, 300));
        client.inner.stats.record_open();
        assert!(client.get_connection_status().connected);

        client.disconnect();

        let status = client.get_connection_status();
        assert!(!status.connected);
        assert_eq!(status.cache_size, 1);
        assert_eq!(status.valid_pricing_count, 1);
    }

    #[test]
    fn test_clear_cache_ignores_connection_state() {
        let fetcher = MockFetcher::new(MockReply::NetworkError);
        let client = offline_client(fetcher);
        client.inner.cache.write().insert("SKU1", make_fields(100.0, 0, 300));
        client.inner.stats.record_open();

        client.clear_cache();

        let status = client.get_connection_status();
        assert!(status.connected);
        assert_eq!(status.cache_size, 0);
        assert_eq!(status.valid_pricing_count, 0);
        assert!(client.get_all_pricing().is_empty());
    }

    #[test]
    fn test_status_counts_only_valid_quotes() {
        let fetcher = MockFetcher::new(MockReply::NetworkError);
        let client = offline_client(fetcher);
        client.inner.cache.write().insert("FRESH", make_fields(100.0, 0, 300));
        client.inner.cache.write().insert("STALE", make_fields(200.0, 600, 300));

        let status = client.get_connection_status();
        assert_eq!(status.cache_size, 2);
        assert_eq!(status.valid_pricing_count, 1);
    }

    #[test]
    fn test_two_clients_do_not_share_state() {
        let first = offline_client(MockFetcher::new(MockReply::NetworkError));
        let second = offline_client(MockFetcher::new(MockReply::NetworkError));

        first
            .inner
            .cache
            .write()
            .insert("SKU1", make_fields(100.0, 0, 300));
        first.inner.stats.record_open();

        assert!(second.get_all_pricing().is_empty());
        assert!(!second.get_connection_status().connected);
        assert_eq!(first.get_connection_status().cache_size, 1);
    }

    #[test]
    fn test_config_defaults() {
        let config = PricingClientConfig::default();
        assert_eq!(config.reconnect_interval_ms, 5_000);
        assert_eq!(config.max_reconnect_attempts, 10);
        assert_eq!(config.cache_expiry_ms, 300_000);
        assert!((config.surcharge_multiplier - 1.05).abs() < f64::EPSILON);

        let reconnect = config.reconnect();
        assert_eq!(reconnect.reconnect_interval_ms, 5_000);
        assert_eq!(reconnect.max_reconnect_attempts, 10);
    }
}
