//! Message router: decides the fate of every inbound text frame.
//!
//! Candle updates are delivered to registry handlers and never forwarded.
//! Orderbook and market frames are gated or rewritten by feature flags.
//! Everything else reaches the downstream sink byte-for-byte.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::candle::Bar;
use crate::domain::market::promote_initializing;
use crate::error::FrameError;
use crate::flags::FeatureFlags;
use crate::shared::ChannelId;
use crate::telemetry::ReceiptSink;
use crate::ws::frame::InboundFrame;
use crate::ws::subscriptions::SharedRegistry;

/// Outcome of routing one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    /// Heartbeat reply; re-arms the disconnect timeout.
    Pong,
    /// Hand this text to the downstream sink.
    Forward(String),
    /// A bar was delivered to `handlers` handlers.
    Delivered { channel_id: ChannelId, handlers: usize },
    /// Handled internally, nothing to forward.
    Consumed,
    /// Suppressed by a feature flag.
    Dropped,
    /// Could not be parsed; already logged.
    Rejected,
}

pub struct MessageRouter {
    registry: SharedRegistry,
    flags: Arc<dyn FeatureFlags>,
    receipts: Arc<dyn ReceiptSink>,
    origin: String,
    pong_type: String,
}

impl MessageRouter {
    pub fn new(
        registry: SharedRegistry,
        flags: Arc<dyn FeatureFlags>,
        receipts: Arc<dyn ReceiptSink>,
        origin: impl Into<String>,
        pong_type: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            flags,
            receipts,
            origin: origin.into(),
            pong_type: pong_type.into(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Route one frame. Never panics on bad input; parse failures are logged
    /// once at error level and yield [`Routed::Rejected`].
    pub fn route(&self, text: &str) -> Routed {
        match self.dispatch(text) {
            Ok(routed) => {
                self.receipts.record(&self.origin, Utc::now());
                routed
            }
            Err(e) => {
                tracing::error!("Failed to handle inbound frame: {}", e);
                Routed::Rejected
            }
        }
    }

    fn dispatch(&self, text: &str) -> Result<Routed, FrameError> {
        let routed = match InboundFrame::classify(text, &self.pong_type)? {
            InboundFrame::Pong => Routed::Pong,
            InboundFrame::Candles {
                id: Some(id),
                candle: Some(candle),
            } => self.deliver(id, Bar::from(candle)),
            InboundFrame::Candles { .. } => Routed::Consumed,
            InboundFrame::Orderbook => {
                if self.flags.process_orderbook() {
                    Routed::Forward(text.to_string())
                } else {
                    Routed::Dropped
                }
            }
            InboundFrame::Markets(mut frame) => {
                if self.flags.display_initializing_markets() {
                    let contents = frame
                        .get_mut("contents")
                        .ok_or(FrameError::MissingContents)?;
                    let promoted = promote_initializing(contents);
                    if promoted > 0 {
                        tracing::debug!("Promoted {} initializing market(s)", promoted);
                    }
                    Routed::Forward(serde_json::to_string(&frame)?)
                } else {
                    Routed::Forward(text.to_string())
                }
            }
            InboundFrame::Passthrough => Routed::Forward(text.to_string()),
        };
        Ok(routed)
    }

    fn deliver(&self, channel_id: ChannelId, bar: Bar) -> Routed {
        // Handlers run outside the lock so they may touch the registry.
        let handlers = {
            let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            if !registry.record_last_bar(&channel_id, bar) {
                return Routed::Consumed;
            }
            registry.handlers_for(&channel_id)
        };

        for handler in &handlers {
            handler(&bar);
        }

        Routed::Delivered {
            channel_id,
            handlers: handlers.len(),
        }
    }
}
