//! SSE subscription with automatic reconnection and exponential backoff.
//!
//! Wraps the gateway's `/events/pricing` stream in a background task that
//! reopens the connection on transport failure and hands decoded events to
//! the owning client through a channel. The task stops on its own when the
//! receiver is dropped or the attempt budget runs out.

use crate::stream::sse::{parse_event, SseDecoder};
use crate::types::StreamEvent;
use anyhow::{bail, Context, Result};
use futures_util::StreamExt;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Hard ceiling on the reconnect delay.
pub const MAX_RECONNECT_DELAY_MS: u64 = 30_000;

/// Configuration for reconnection behavior.
#[derive(Clone, Debug)]
pub struct ReconnectConfig {
    /// Base backoff unit in milliseconds (default: 5000ms).
    pub reconnect_interval_ms: u64,
    /// Attempts before the subscription gives up (default: 10).
    pub max_reconnect_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            reconnect_interval_ms: 5_000,
            max_reconnect_attempts: 10,
        }
    }
}

impl ReconnectConfig {
    /// Delay before reconnect attempt number `attempt` (0-based):
    /// `reconnect_interval_ms * 2^attempt`, capped at 30 seconds.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
        let delay_ms = self
            .reconnect_interval_ms
            .saturating_mul(factor)
            .min(MAX_RECONNECT_DELAY_MS);
        Duration::from_millis(delay_ms)
    }
}

/// Connection counters shared between the subscription task and the
/// owning client. Attempts reset to zero on every successful open.
#[derive(Debug, Default)]
pub struct StreamStats {
    connected: AtomicBool,
    reconnect_attempts: AtomicU32,
}

impl StreamStats {
    pub fn record_open(&self) {
        self.connected.store(true, Ordering::Relaxed);
        self.reconnect_attempts.store(0, Ordering::Relaxed);
    }

    pub fn record_drop(&self) {
        self.connected.store(false, Ordering::Relaxed);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    fn next_attempt(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }
}

/// Transport-level signal delivered to the client task.
#[derive(Debug)]
pub enum StreamSignal {
    /// Subscription opened (or reopened) successfully.
    Opened,
    /// A decoded pricing event.
    Event(StreamEvent),
    /// The stream dropped or failed to open; a reconnect follows if the
    /// attempt budget allows.
    TransportError(String),
    /// Attempt budget exhausted; the task has stopped. A manual
    /// reconnect is required to resume.
    RetriesExhausted(u32),
}

/// A reconnecting subscription to the gateway's pricing event stream.
pub struct PricingSubscription {
    base_url: String,
    http: Client,
    config: ReconnectConfig,
    stats: Arc<StreamStats>,
}

impl PricingSubscription {
    pub fn new(
        base_url: impl Into<String>,
        http: Client,
        config: ReconnectConfig,
        stats: Arc<StreamStats>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            http,
            config,
            stats,
        }
    }

    /// Spawn the background task and hand back the signal channel.
    pub fn into_signal_stream(self) -> mpsc::UnboundedReceiver<StreamSignal> {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            reconnecting_task(self, sender).await;
        });
        receiver
    }

    /// Open the stream and pump frames until it drops. `Ok(())` means the
    /// receiver went away and the task should stop for good.
    async fn open_and_stream(&self, sender: &mpsc::UnboundedSender<StreamSignal>) -> Result<()> {
        let url = format!("{}/events/pricing", self.base_url);
        debug!("connecting to pricing stream at {}", url);

        let response = self
            .http
            .get(&url)
            .header("Accept", "text/event-stream")
            .send()
            .await
            .context("failed to open pricing stream")?
            .error_for_status()
            .context("pricing stream rejected")?;

        self.stats.record_open();
        if sender.send(StreamSignal::Opened).is_err() {
            return Ok(());
        }
        info!("connected to pricing stream");

        let mut decoder = SseDecoder::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.context("pricing stream read failed")?;
            for frame in decoder.push(&chunk) {
                match parse_event(&frame) {
                    Ok(Some(event)) => {
                        if sender.send(StreamSignal::Event(event)).is_err() {
                            return Ok(());
                        }
                    }
                    Ok(None) => debug!("ignoring unrecognized stream event: {}", frame.event),
                    // Malformed messages are dropped; they neither tear
                    // down the stream nor count as transport errors.
                    Err(e) => warn!("dropping malformed {} message: {:#}", frame.event, e),
                }
            }
        }

        bail!("pricing stream ended")
    }
}

/// Background task that owns the connect/stream/backoff loop.
async fn reconnecting_task(
    subscription: PricingSubscription,
    sender: mpsc::UnboundedSender<StreamSignal>,
) {
    loop {
        match subscription.open_and_stream(&sender).await {
            Ok(()) => {
                debug!("pricing stream receiver dropped, stopping subscription task");
                return;
            }
            Err(e) => {
                subscription.stats.record_drop();
                warn!("pricing stream error: {:#}", e);
                if sender
                    .send(StreamSignal::TransportError(format!("{:#}", e)))
                    .is_err()
                {
                    return;
                }
            }
        }

        let attempt = subscription.stats.attempts();
        if attempt >= subscription.config.max_reconnect_attempts {
            error!("pricing stream: max reconnect attempts reached ({})", attempt);
            let _ = sender.send(StreamSignal::RetriesExhausted(attempt));
            return;
        }

        let delay = subscription.config.delay_for_attempt(attempt);
        info!(
            "pricing stream: reconnecting in {:?} (attempt {})",
            delay,
            attempt + 1
        );
        subscription.stats.next_attempt();
        tokio::time::sleep(delay).await;
    }
}
