//! Orderbook domain: raw ladders, reconciliation, display-ready views.
//!
//! - `wire.rs`: `v4_orderbook` snapshot/delta contents
//! - `state.rs`: ladder container that applies those contents
//! - `resolve.rs`: reconciliation into a bounded, uncrossed [`ResolvedBook`]
//! - `depth_chart.rs`: lighter projection for depth charts

pub mod depth_chart;
pub mod resolve;
pub mod state;
pub mod wire;

pub use depth_chart::{depth_chart, DepthChart, DepthChartDatum, DepthChartSeries};
pub use resolve::resolve_book;
pub use state::OrderbookState;

use crate::shared::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ─── Raw ladder ──────────────────────────────────────────────────────────────

/// One raw price level of a ladder.
///
/// `offset` is the feed's per-side update sequence for this level; a higher
/// offset means a more recent update. `depth` is the cumulative size at and
/// beyond this level and is advisory: unparseable values become `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub size: Decimal,
    #[serde(default)]
    pub offset: u64,
    #[serde(default, with = "crate::shared::serde_util::lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub depth: Option<Decimal>,
}

impl BookLevel {
    pub fn new(price: Decimal, size: Decimal, offset: u64) -> Self {
        Self {
            price,
            size,
            offset,
            depth: None,
        }
    }

    pub fn with_depth(mut self, depth: Decimal) -> Self {
        self.depth = Some(depth);
        self
    }
}

/// Raw order book as maintained upstream: asks ascending, bids descending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderbookSnapshot {
    #[serde(default)]
    pub asks: Vec<BookLevel>,
    #[serde(default)]
    pub bids: Vec<BookLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spread_percent: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid_price: Option<Decimal>,
}

// ─── Display view ────────────────────────────────────────────────────────────

/// A ladder row annotated for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayLevel {
    /// Stable row key: `ask-{idx}` / `bid-{idx}`, index into the raw ladder.
    pub key: String,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    /// Trader's own resting size at exactly this price.
    pub mine: Option<Decimal>,
    pub offset: u64,
    pub depth: Option<Decimal>,
}

/// Reconciled, display-ready order book.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedBook {
    pub asks: Vec<DisplayLevel>,
    pub bids: Vec<DisplayLevel>,
    pub spread: Option<Decimal>,
    pub spread_percent: Option<Decimal>,
    /// Larger of the two sides' outermost depth, never negative.
    pub histogram_range: Decimal,
    pub has_orderbook: bool,
}

impl ResolvedBook {
    pub fn best_bid(&self) -> Option<&DisplayLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&DisplayLevel> {
        self.asks.first()
    }
}
