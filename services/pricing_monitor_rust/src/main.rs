//! Pricing Monitor Service - Follows the gateway's pricing stream and logs
//! cache and connection health.
//!
//! This is the reference consumer for `PricingStreamClient`: it registers
//! all three callbacks, warms the cache from the REST endpoint at startup,
//! and reports status on a fixed interval. With PRICING_TEST_PUBLISH=true
//! it also asks the gateway for a synthetic update each cycle, which is
//! handy against a dev gateway.

use anyhow::Result;
use dotenv::dotenv;
use goldshop_rust_core::{
    format_price, OfflineStrategy, PricingClientConfig, PricingStreamClient, PricingUpdateKind,
};
use std::env;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn parse_bool_env(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting Pricing Monitor Service...");

    let base_url =
        env::var("PRICING_GATEWAY_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
    let status_interval_secs: u64 = env::var("PRICING_STATUS_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30);
    let test_publish = parse_bool_env("PRICING_TEST_PUBLISH", false);
    let watch_skus: Vec<String> = env::var("PRICING_WATCH_SKUS")
        .map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let config = PricingClientConfig::from_env();
    info!("Connecting to pricing gateway at {}", base_url);
    let client = PricingStreamClient::new(base_url, config);

    client.set_on_pricing_update(|kind, quotes| {
        for (sku, quote) in quotes {
            match kind {
                PricingUpdateKind::Initial => {
                    info!("initial quote {} = {}", sku, format_price(quote.final_price));
                }
                PricingUpdateKind::Update => {
                    info!("updated quote {} = {}", sku, format_price(quote.final_price));
                }
            }
        }
    });
    client.set_on_connection_change(|connected| {
        if connected {
            info!("pricing stream connected");
        } else {
            warn!("pricing stream disconnected");
        }
    });
    client.set_on_error(|e| error!("pricing stream error: {}", e));

    match client.warm_cache().await {
        Ok(count) => info!("warmed cache with {} quotes", count),
        Err(e) => warn!("cache warm-up failed: {:#}", e),
    }

    loop {
        tokio::time::sleep(Duration::from_secs(status_interval_secs)).await;

        let status = client.get_connection_status();
        info!(
            "status: connected={} attempts={} cached={} valid={}",
            status.connected, status.reconnect_attempts, status.cache_size, status.valid_pricing_count
        );

        for sku in &watch_skus {
            let result = client.get_pricing_with(sku, OfflineStrategy::Freeze).await;
            match &result.data {
                Some(quote) if result.success => info!(
                    "{}: {} (source: {}{})",
                    sku,
                    format_price(quote.final_price),
                    result.source.as_str(),
                    if result.is_expired { ", expired" } else { "" }
                ),
                _ => warn!(
                    "{}: no pricing available ({})",
                    sku,
                    result.error.unwrap_or_else(|| "unknown".to_string())
                ),
            }
        }

        if test_publish {
            if let Err(e) = client.trigger_test_update().await {
                warn!("test publish failed: {:#}", e);
            }
        }
    }
}
