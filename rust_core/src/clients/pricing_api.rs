//! REST pricing endpoint client.
//!
//! Point-in-time fallback for `get_pricing`, the get-all warm-up call,
//! and the gateway's synthetic publish trigger used in manual testing.

use crate::types::{OfflineStrategy, PricingFields};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Wire response from `GET /api/pricing/{sku}`.
#[derive(Clone, Debug, Deserialize)]
pub struct PricingApiResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<PricingFields>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub is_expired: bool,
    #[serde(default)]
    pub strategy_applied: Option<OfflineStrategy>,
}

/// Wire response from `GET /api/pricing`.
#[derive(Debug, Deserialize)]
struct AllPricingResponse {
    success: bool,
    #[serde(default)]
    data: HashMap<String, PricingFields>,
    #[serde(default)]
    error: Option<String>,
}

/// Wire response from `POST /test/publish`.
#[derive(Debug, Deserialize)]
struct PublishResponse {
    message: String,
}

/// Point-in-time pricing operations, behind a trait so the client can be
/// exercised without a live gateway.
#[async_trait]
pub trait PricingFetcher: Send + Sync {
    /// `GET /api/pricing/{sku}?strategy=...`
    async fn fetch_pricing(
        &self,
        sku: &str,
        strategy: OfflineStrategy,
    ) -> Result<PricingApiResponse>;

    /// `GET /api/pricing`: every quote the gateway currently holds.
    async fn fetch_all_pricing(&self) -> Result<HashMap<String, PricingFields>>;

    /// `POST /test/publish`: ask the gateway to emit a synthetic update.
    async fn trigger_test_update(&self) -> Result<String>;
}

/// reqwest-backed implementation against the pricing gateway.
pub struct RestPricingClient {
    http: Client,
    base_url: String,
}

impl RestPricingClient {
    pub fn new(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl PricingFetcher for RestPricingClient {
    async fn fetch_pricing(
        &self,
        sku: &str,
        strategy: OfflineStrategy,
    ) -> Result<PricingApiResponse> {
        let url = format!(
            "{}/api/pricing/{}?strategy={}",
            self.base_url,
            sku,
            strategy.as_str()
        );
        debug!("fetching pricing for {} from API", sku);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("pricing fetch failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("pricing API error: {} - {}", status, body));
        }

        response
            .json::<PricingApiResponse>()
            .await
            .context("failed to parse pricing response")
    }

    async fn fetch_all_pricing(&self) -> Result<HashMap<String, PricingFields>> {
        let url = format!("{}/api/pricing", self.base_url);
        debug!("fetching all pricing from API");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("pricing fetch failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("pricing API error: {}", response.status()));
        }

        let body: AllPricingResponse = response
            .json()
            .await
            .context("failed to parse pricing response")?;

        if !body.success {
            return Err(anyhow!(
                "pricing API error: {}",
                body.error.unwrap_or_else(|| "unknown".to_string())
            ));
        }
        Ok(body.data)
    }

    async fn trigger_test_update(&self) -> Result<String> {
        let url = format!("{}/test/publish", self.base_url);

        let response = self
            .http
            .post(&url)
            .send()
            .await
            .context("test publish failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("test publish error: {}", response.status()));
        }

        let body: PublishResponse = response
            .json()
            .await
            .context("failed to parse publish response")?;
        Ok(body.message)
    }
}
