//! Incremental decoder for `text/event-stream` payloads.
//!
//! The gateway frames every message as `event:` + `data:` lines terminated
//! by a blank line. The decoder is fed raw byte chunks as they arrive off
//! the socket and yields complete frames; a frame split across chunks is
//! buffered until its terminator shows up.

use crate::types::{PricingFields, StreamEvent};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// One complete server-sent event frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Stateful line decoder. Feed it chunks with [`SseDecoder::push`]; it
/// hands back whatever frames those chunks complete.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: String,
    event: String,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.push_str(&String::from_utf8_lossy(chunk));

        let mut frames = Vec::new();
        while let Some(pos) = self.buf.find('\n') {
            let mut line: String = self.buf.drain(..=pos).collect();
            while line.ends_with('\n') || line.ends_with('\r') {
                line.pop();
            }

            if line.is_empty() {
                if let Some(frame) = self.take_frame() {
                    frames.push(frame);
                }
                continue;
            }
            // Comment lines are used by some servers as padding/heartbeat
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line.as_str(), ""),
            };
            match field {
                "event" => self.event = value.to_string(),
                "data" => self.data.push(value.to_string()),
                // id/retry are not used by the pricing gateway
                _ => {}
            }
        }
        frames
    }

    fn take_frame(&mut self) -> Option<SseFrame> {
        if self.event.is_empty() && self.data.is_empty() {
            return None;
        }
        let event = if self.event.is_empty() {
            "message".to_string()
        } else {
            std::mem::take(&mut self.event)
        };
        let frame = SseFrame {
            event,
            data: self.data.join("\n"),
        };
        self.event.clear();
        self.data.clear();
        Some(frame)
    }
}

#[derive(Debug, Deserialize)]
struct InitialPayload {
    pricing: HashMap<String, PricingFields>,
}

#[derive(Debug, Deserialize)]
struct UpdatePayload {
    sku: String,
    pricing: PricingFields,
}

/// Map a decoded frame onto the typed event union.
///
/// Returns `Ok(None)` for event names the client does not consume and
/// `Err` when a recognized event carries a payload that fails to parse.
/// The caller drops such frames without tearing down the stream.
pub fn parse_event(frame: &SseFrame) -> Result<Option<StreamEvent>> {
    match frame.event.as_str() {
        "initial" => {
            let payload: InitialPayload =
                serde_json::from_str(&frame.data).context("invalid initial payload")?;
            Ok(Some(StreamEvent::Initial {
                pricing: payload.pricing,
            }))
        }
        "pricing_update" => {
            let payload: UpdatePayload =
                serde_json::from_str(&frame.data).context("invalid pricing_update payload")?;
            Ok(Some(StreamEvent::PricingUpdate {
                sku: payload.sku,
                pricing: payload.pricing,
            }))
        }
        "keepalive" => Ok(Some(StreamEvent::Keepalive)),
        _ => Ok(None),
    }
}
