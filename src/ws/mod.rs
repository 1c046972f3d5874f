//! WebSocket layer: channels, outbound frames, session configuration.
//!
//! - `subscriptions.rs`: reconnect-durable subscription registry
//! - `frame.rs`: inbound frame classification
//! - `router.rs`: dispatch of classified frames
//! - `native.rs`: the `tokio-tungstenite` session (feature `ws-native`)

pub mod frame;
pub mod router;
pub mod subscriptions;

#[cfg(feature = "ws-native")]
pub mod native;

use crate::shared::ChannelId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use frame::InboundFrame;
pub use router::{MessageRouter, Routed};
pub use subscriptions::{BarHandler, HandlerId, SharedRegistry, Subscription, SubscriptionRegistry};

#[cfg(feature = "ws-native")]
pub use native::WsSession;

// ─── Channels ────────────────────────────────────────────────────────────────

/// Feed channel a subscription belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    #[serde(rename = "v4_candles")]
    Candles,
    #[serde(rename = "v4_orderbook")]
    Orderbook,
    #[serde(rename = "v4_markets")]
    Markets,
    #[serde(other)]
    Unknown,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Candles => "v4_candles",
            Channel::Orderbook => "v4_orderbook",
            Channel::Markets => "v4_markets",
            Channel::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ─── Outbound messages ───────────────────────────────────────────────────────

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum MessageOut {
    #[serde(rename = "subscribe")]
    Subscribe {
        channel: Channel,
        id: ChannelId,
        batched: bool,
    },
    #[serde(rename = "unsubscribe")]
    Unsubscribe { channel: Channel, id: ChannelId },
}

impl MessageOut {
    pub fn subscribe(channel: Channel, id: ChannelId) -> Self {
        MessageOut::Subscribe {
            channel,
            id,
            batched: true,
        }
    }

    pub fn unsubscribe(channel: Channel, id: ChannelId) -> Self {
        MessageOut::Unsubscribe { channel, id }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ─── ConnectionState ─────────────────────────────────────────────────────────

/// Connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Idle = 0,
    Connecting = 1,
    Open = 2,
    Closed = 3,
}

impl From<u8> for ConnectionState {
    fn from(v: u8) -> Self {
        match v {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Open,
            3 => ConnectionState::Closed,
            _ => ConnectionState::Idle,
        }
    }
}

// ─── Config ──────────────────────────────────────────────────────────────────

/// What `disconnect()` means for the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisconnectMode {
    /// Tear down, forget every subscription, stop reconnecting.
    #[default]
    Terminal,
    /// Tear down but keep subscriptions; the watchdog reconnects on its next tick.
    Resumable,
}

/// Configuration for a [`WsSession`](native::WsSession).
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Heartbeat period while open.
    pub ping_interval: Duration,
    /// Time without a pong after which the socket is torn down.
    pub pong_timeout: Duration,
    /// Watchdog period for re-establishing a lost socket.
    pub reconnect_interval: Duration,
    pub connect_timeout: Duration,
    /// Upper bound on waiting for the close handshake during teardown.
    pub close_timeout: Duration,
    /// Text frame sent as the application-level heartbeat.
    pub ping_message: String,
    /// `type` value that marks an inbound frame as the heartbeat reply.
    pub pong_type: String,
    pub command_channel_capacity: usize,
    pub disconnect_mode: DisconnectMode,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(5),
            pong_timeout: Duration::from_secs(10),
            reconnect_interval: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(30),
            close_timeout: Duration::from_secs(2),
            ping_message: r#"{"type":"ping"}"#.to_string(),
            pong_type: "pong".to_string(),
            command_channel_capacity: 256,
            disconnect_mode: DisconnectMode::default(),
        }
    }
}
