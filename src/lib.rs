//! # marketfeed
//!
//! A resilient market-data WebSocket session and order-book reconciliation.
//!
//! ## Architecture
//!
//! The crate is organized in layers:
//!
//! 1. **Core**: Shared newtypes, domain models, pure reconciliation (always available)
//! 2. **Collaborators**: Feature flags and receipt telemetry seams
//! 3. **WebSocket**: Subscription registry, message router, `tokio-tungstenite` session
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use marketfeed::prelude::*;
//!
//! let mut session = WsSession::new(WsConfig::default())
//!     .with_flags(Arc::new(StaticFlags::from_env()));
//!
//! session
//!     .connect(DEFAULT_WS_URL, |up| println!("connected: {up}"), |frame| println!("{frame}"))
//!     .await?;
//!
//! let market = MarketId::from("BTC-USD");
//! session.subscribe_candles(ChannelId::candles(&market, CandleResolution::Minute1), |bar| {
//!     println!("{} close={}", bar.time, bar.close);
//! });
//!
//! let book = resolve_book(Some(&state.snapshot()), &OpenOrderIndex::from_orders(&orders), 20);
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes used across all domains.
pub mod shared;

/// Domain modules (vertical slices): types, wire types, conversions, state.
pub mod domain;

/// Unified error types.
pub mod error;

/// Network URL constants.
pub mod network;

// ── Layer 2: Collaborators ───────────────────────────────────────────────────

/// Runtime feature flags.
pub mod flags;

/// Last-successful-receipt bookkeeping.
pub mod telemetry;

// ── Layer 3: WebSocket ───────────────────────────────────────────────────────

/// WebSocket session: channels, subscriptions, routing.
pub mod ws;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared newtypes
    pub use crate::shared::{CandleResolution, ChannelId, MarketId, Side};

    // Domain types: candles, markets, orders
    pub use crate::domain::candle::{Bar, RawCandle};
    pub use crate::domain::market::MarketStatus;
    pub use crate::domain::order::{OpenOrder, OpenOrderIndex};

    // Domain types: orderbook
    pub use crate::domain::orderbook::{
        depth_chart, resolve_book, BookLevel, DepthChart, DepthChartDatum, DepthChartSeries,
        DisplayLevel, OrderbookSnapshot, OrderbookState, ResolvedBook,
    };

    // Errors
    pub use crate::error::{FeedError, FrameError, WsError, WsResult};

    // Network
    pub use crate::network::DEFAULT_WS_URL;

    // Collaborators
    pub use crate::flags::{FeatureFlags, StaticFlags};
    pub use crate::telemetry::{LastReceiptByOrigin, NoopReceipts, ReceiptSink};

    // WebSocket types
    pub use crate::ws::{
        BarHandler, Channel, ConnectionState, DisconnectMode, HandlerId, MessageOut,
        MessageRouter, Routed, SharedRegistry, SubscriptionRegistry, WsConfig,
    };
    #[cfg(feature = "ws-native")]
    pub use crate::ws::WsSession;
}
