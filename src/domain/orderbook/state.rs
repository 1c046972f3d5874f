//! Orderbook state containers: app-owned, crate-provided update logic.

use super::wire::{DeltaContents, OrderbookFrame, OrderbookUpdate, SnapshotContents};
use super::{BookLevel, OrderbookSnapshot};
use crate::error::FrameError;
use crate::shared::ChannelId;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Level {
    size: Decimal,
    offset: u64,
}

/// Live ladder state that can apply `v4_orderbook` snapshots and deltas.
///
/// Each level remembers the message id of the update that last touched it;
/// that becomes the level's `offset` in [`OrderbookState::snapshot`].
/// Crossed levels are kept as received.
#[derive(Debug, Clone, Default)]
pub struct OrderbookState {
    pub id: Option<ChannelId>,
    pub message_id: u64,
    bids: BTreeMap<Decimal, Level>,
    asks: BTreeMap<Decimal, Level>,
}

impl OrderbookState {
    pub fn new(id: ChannelId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Apply a raw forwarded `v4_orderbook` frame.
    ///
    /// Frames for another book id and frames without book data are ignored.
    pub fn apply_frame(&mut self, frame: &OrderbookFrame) -> Result<(), FrameError> {
        if let Some(id) = &self.id {
            if *id != frame.id {
                return Ok(());
            }
        }
        if let Some(update) = frame.decode()? {
            self.apply(&update);
        }
        Ok(())
    }

    /// Apply a decoded update (snapshot replaces, delta merges).
    pub fn apply(&mut self, update: &OrderbookUpdate) {
        match update {
            OrderbookUpdate::Snapshot {
                message_id,
                contents,
            } => self.apply_snapshot(contents, *message_id),
            OrderbookUpdate::Deltas { message_id, deltas } => {
                for delta in deltas {
                    self.apply_delta(delta, *message_id);
                }
            }
        }
    }

    pub fn apply_snapshot(&mut self, contents: &SnapshotContents, message_id: u64) {
        self.bids.clear();
        self.asks.clear();
        self.message_id = message_id;

        for level in &contents.bids {
            upsert(&mut self.bids, level.price, level.size, message_id);
        }
        for level in &contents.asks {
            upsert(&mut self.asks, level.price, level.size, message_id);
        }
    }

    pub fn apply_delta(&mut self, delta: &DeltaContents, message_id: u64) {
        self.message_id = self.message_id.max(message_id);

        for (price, size) in &delta.bids {
            upsert(&mut self.bids, *price, *size, message_id);
        }
        for (price, size) in &delta.asks {
            upsert(&mut self.asks, *price, *size, message_id);
        }
    }

    /// Highest bid price.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next_back().copied()
    }

    /// Lowest ask price.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    /// Mid price (average of best bid and best ask).
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::from(2)),
            _ => None,
        }
    }

    /// Spread between best ask and best bid.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Spread as a percentage of the mid price.
    pub fn spread_percent(&self) -> Option<Decimal> {
        let mid = self.mid_price()?;
        if mid.is_zero() {
            return None;
        }
        Some(self.spread()? / mid * Decimal::ONE_HUNDRED)
    }

    /// Raw ladders with cumulative depth: asks ascending, bids descending.
    pub fn snapshot(&self) -> OrderbookSnapshot {
        OrderbookSnapshot {
            asks: with_depth(self.asks.iter()),
            bids: with_depth(self.bids.iter().rev()),
            spread_percent: self.spread_percent(),
            mid_price: self.mid_price(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.message_id = 0;
    }
}

fn upsert(side: &mut BTreeMap<Decimal, Level>, price: Decimal, size: Decimal, offset: u64) {
    if size.is_zero() {
        side.remove(&price);
    } else {
        side.insert(price, Level { size, offset });
    }
}

fn with_depth<'a>(levels: impl Iterator<Item = (&'a Decimal, &'a Level)>) -> Vec<BookLevel> {
    let mut depth = Decimal::ZERO;
    levels
        .map(|(price, level)| {
            depth += level.size;
            BookLevel::new(*price, level.size, level.offset).with_depth(depth)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::orderbook::wire::SnapshotLevel;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn snapshot(bids: &[(i64, i64)], asks: &[(i64, i64)]) -> SnapshotContents {
        let levels = |rows: &[(i64, i64)]| -> Vec<SnapshotLevel> {
            rows.iter()
                .map(|&(price, size)| SnapshotLevel {
                    price: d(price),
                    size: d(size),
                })
                .collect()
        };
        SnapshotContents {
            bids: levels(bids),
            asks: levels(asks),
        }
    }

    fn delta(bids: &[(i64, i64)], asks: &[(i64, i64)]) -> DeltaContents {
        DeltaContents {
            bids: bids.iter().map(|&(p, s)| (d(p), d(s))).collect(),
            asks: asks.iter().map(|&(p, s)| (d(p), d(s))).collect(),
        }
    }

    #[test]
    fn test_snapshot_replaces_state() {
        let mut book = OrderbookState::new(ChannelId::from("BTC-USD"));
        book.apply_snapshot(&snapshot(&[(50, 10)], &[(51, 5)]), 1);
        assert_eq!(book.best_bid(), Some(d(50)));
        assert_eq!(book.best_ask(), Some(d(51)));

        book.apply_snapshot(&snapshot(&[(49, 20)], &[(52, 8)]), 2);
        assert_eq!(book.best_bid(), Some(d(49)));
        assert_eq!(book.best_ask(), Some(d(52)));
        assert_eq!(book.snapshot().bids.len(), 1);
    }

    #[test]
    fn test_delta_merges_and_tracks_offset() {
        let mut book = OrderbookState::default();
        book.apply_snapshot(&snapshot(&[(50, 10)], &[(51, 5)]), 1);
        book.apply_delta(&delta(&[(49, 15), (48, 3)], &[]), 4);

        let snap = book.snapshot();
        assert_eq!(snap.bids.len(), 3);
        assert_eq!(snap.bids[0].price, d(50));
        assert_eq!(snap.bids[0].offset, 1);
        assert_eq!(snap.bids[1].offset, 4);
        assert_eq!(snap.asks[0].offset, 1);
        assert_eq!(book.message_id, 4);
    }

    #[test]
    fn test_zero_size_removes_level() {
        let mut book = OrderbookState::default();
        book.apply_snapshot(&snapshot(&[(50, 10)], &[(51, 5)]), 1);
        book.apply_delta(&delta(&[(50, 0)], &[]), 2);
        assert_eq!(book.best_bid(), None);
        assert!(book.spread_percent().is_none());
    }

    #[test]
    fn test_cumulative_depth_and_order() {
        let mut book = OrderbookState::default();
        book.apply_snapshot(&snapshot(&[(48, 1), (50, 2), (49, 3)], &[(53, 4), (51, 5)]), 1);
        let snap = book.snapshot();

        let bid_prices: Vec<_> = snap.bids.iter().map(|l| l.price).collect();
        assert_eq!(bid_prices, vec![d(50), d(49), d(48)]);
        let bid_depths: Vec<_> = snap.bids.iter().map(|l| l.depth).collect();
        assert_eq!(bid_depths, vec![Some(d(2)), Some(d(5)), Some(d(6))]);

        let ask_prices: Vec<_> = snap.asks.iter().map(|l| l.price).collect();
        assert_eq!(ask_prices, vec![d(51), d(53)]);
        assert_eq!(snap.asks[1].depth, Some(d(9)));
    }

    #[test]
    fn test_mid_and_spread_percent() {
        let mut book = OrderbookState::default();
        book.apply_snapshot(&snapshot(&[(99, 1)], &[(101, 1)]), 1);
        let snap = book.snapshot();
        assert_eq!(snap.mid_price, Some(d(100)));
        assert_eq!(snap.spread_percent, Some(d(2)));
    }

    #[test]
    fn test_apply_frame_filters_by_id() {
        let mut book = OrderbookState::new(ChannelId::from("BTC-USD"));
        let other = OrderbookFrame::parse(
            r#"{"type":"subscribed","id":"ETH-USD","message_id":1,"contents":{"bids":[{"price":"1","size":"1"}]}}"#,
        )
        .unwrap();
        book.apply_frame(&other).unwrap();
        assert!(book.is_empty());

        let mine = OrderbookFrame::parse(
            r#"{"type":"subscribed","id":"BTC-USD","message_id":1,"contents":{"bids":[{"price":"1","size":"1"}]}}"#,
        )
        .unwrap();
        book.apply_frame(&mine).unwrap();
        assert_eq!(book.best_bid(), Some(d(1)));
    }

    #[test]
    fn test_clear() {
        let mut book = OrderbookState::default();
        book.apply_snapshot(&snapshot(&[(50, 10)], &[(51, 5)]), 7);
        book.clear();
        assert!(book.is_empty());
        assert_eq!(book.message_id, 0);
    }
}
