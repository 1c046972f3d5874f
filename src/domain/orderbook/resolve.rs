//! Order-book reconciliation.
//!
//! Turns raw ladders plus the trader's open-order index into a bounded,
//! uncrossed book. The feed can briefly show a best bid at or above the best
//! ask while one side's update is still in flight; the level with the older
//! offset is the stale one and is dropped.

use super::{BookLevel, DisplayLevel, OrderbookSnapshot, ResolvedBook};
use crate::domain::order::OpenOrderIndex;
use crate::shared::Side;
use rust_decimal::Decimal;

/// Reconcile a raw snapshot into a display-ready book.
///
/// Pure: the same inputs always give the same output. Each side is truncated
/// to `max_rows_per_side` before crossing is resolved.
pub fn resolve_book(
    snapshot: Option<&OrderbookSnapshot>,
    open_orders: &OpenOrderIndex,
    max_rows_per_side: usize,
) -> ResolvedBook {
    let Some(snapshot) = snapshot else {
        return ResolvedBook {
            asks: Vec::new(),
            bids: Vec::new(),
            spread: None,
            spread_percent: None,
            histogram_range: Decimal::ZERO,
            has_orderbook: false,
        };
    };

    let mut asks = annotate(&snapshot.asks, Side::Ask, open_orders, max_rows_per_side);
    let mut bids = annotate(&snapshot.bids, Side::Bid, open_orders, max_rows_per_side);

    uncross(&mut asks, &mut bids);

    let spread = match (asks.first(), bids.first()) {
        (Some(ask), Some(bid)) => Some(ask.price - bid.price),
        _ => None,
    };

    let histogram_range = outer_depth(&bids).max(outer_depth(&asks)).max(Decimal::ZERO);

    ResolvedBook {
        asks,
        bids,
        spread,
        spread_percent: snapshot.spread_percent,
        histogram_range,
        has_orderbook: true,
    }
}

fn annotate(
    levels: &[BookLevel],
    side: Side,
    open_orders: &OpenOrderIndex,
    max_rows: usize,
) -> Vec<DisplayLevel> {
    levels
        .iter()
        .take(max_rows)
        .enumerate()
        .map(|(idx, level)| DisplayLevel {
            key: format!("{}-{}", side.as_str(), idx),
            side,
            price: level.price,
            size: level.size,
            mine: open_orders.mine(side, level.price),
            offset: level.offset,
            depth: level.depth,
        })
        .collect()
}

/// Drop stale levels until the best bid is strictly below the best ask.
///
/// The newer offset wins. On equal offsets the larger size wins. When both
/// tie the worst bid goes. Losing asks are taken from the front, losing bids
/// from the back.
fn uncross(asks: &mut Vec<DisplayLevel>, bids: &mut Vec<DisplayLevel>) {
    let mut ask_start = 0;
    let mut bid_end = bids.len();

    while ask_start < asks.len() && bid_end > 0 && bids[0].price >= asks[ask_start].price {
        let (bid, ask) = (&bids[0], &asks[ask_start]);
        let drop_ask = if bid.offset == ask.offset {
            bid.size > ask.size
        } else {
            bid.offset > ask.offset
        };

        if drop_ask {
            ask_start += 1;
        } else {
            bid_end -= 1;
        }
    }

    asks.drain(..ask_start);
    bids.truncate(bid_end);
}

fn outer_depth(levels: &[DisplayLevel]) -> Decimal {
    levels
        .last()
        .and_then(|level| level.depth)
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn level(price: i64, size: i64, offset: u64) -> BookLevel {
        BookLevel::new(d(price), d(size), offset)
    }

    fn book(asks: Vec<BookLevel>, bids: Vec<BookLevel>) -> OrderbookSnapshot {
        OrderbookSnapshot {
            asks,
            bids,
            spread_percent: None,
            mid_price: None,
        }
    }

    #[test]
    fn test_no_snapshot() {
        let resolved = resolve_book(None, &OpenOrderIndex::new(), 10);
        assert!(!resolved.has_orderbook);
        assert!(resolved.asks.is_empty() && resolved.bids.is_empty());
        assert_eq!(resolved.spread, None);
        assert_eq!(resolved.histogram_range, Decimal::ZERO);
    }

    #[test]
    fn test_uncrossed_book_passes_through() {
        let mut snap = book(
            vec![level(101, 1, 1), level(102, 2, 1)],
            vec![level(100, 3, 1), level(99, 4, 1)],
        );
        snap.spread_percent = Some(Decimal::new(99, 2));
        let resolved = resolve_book(Some(&snap), &OpenOrderIndex::new(), 10);

        assert!(resolved.has_orderbook);
        assert_eq!(resolved.asks.len(), 2);
        assert_eq!(resolved.bids.len(), 2);
        assert_eq!(resolved.spread, Some(d(1)));
        assert_eq!(resolved.spread_percent, Some(Decimal::new(99, 2)));
        assert_eq!(resolved.asks[1].key, "ask-1");
        assert_eq!(resolved.bids[0].key, "bid-0");
        assert_eq!(resolved.bids[0].side, Side::Bid);
    }

    #[test]
    fn test_equal_offset_larger_bid_drops_best_ask() {
        let snap = book(vec![level(100, 3, 7), level(101, 1, 2)], vec![level(100, 5, 7)]);
        let resolved = resolve_book(Some(&snap), &OpenOrderIndex::new(), 10);

        assert_eq!(resolved.asks.len(), 1);
        assert_eq!(resolved.asks[0].price, d(101));
        assert_eq!(resolved.asks[0].key, "ask-1");
        assert_eq!(resolved.bids.len(), 1);
        assert_eq!(resolved.spread, Some(d(1)));
    }

    #[test]
    fn test_equal_offset_equal_size_drops_worst_bid() {
        let snap = book(vec![level(100, 3, 7)], vec![level(100, 3, 7)]);
        let resolved = resolve_book(Some(&snap), &OpenOrderIndex::new(), 10);
        assert_eq!(resolved.asks.len(), 1);
        assert!(resolved.bids.is_empty());
        assert_eq!(resolved.spread, None);
    }

    #[test]
    fn test_newer_ask_drops_bids_from_the_back() {
        let snap = book(
            vec![level(100, 1, 9)],
            vec![level(101, 1, 3), level(99, 1, 3), level(98, 1, 3)],
        );
        let resolved = resolve_book(Some(&snap), &OpenOrderIndex::new(), 10);
        // The crossing best bid sits at the front, so every bid behind it goes too.
        assert!(resolved.bids.is_empty());
        assert_eq!(resolved.asks.len(), 1);
    }

    #[test]
    fn test_newer_bid_drops_best_asks() {
        let snap = book(
            vec![level(99, 1, 1), level(100, 1, 1), level(103, 1, 1)],
            vec![level(101, 1, 5)],
        );
        let resolved = resolve_book(Some(&snap), &OpenOrderIndex::new(), 10);
        assert_eq!(resolved.asks.len(), 1);
        assert_eq!(resolved.asks[0].price, d(103));
        assert_eq!(resolved.spread, Some(d(2)));
    }

    #[test]
    fn test_row_cap_applies_before_crossing() {
        let asks: Vec<_> = (0..20).map(|i| level(101 + i, 1, 1)).collect();
        let bids: Vec<_> = (0..20).map(|i| level(100 - i, 1, 1)).collect();
        let resolved = resolve_book(Some(&book(asks, bids)), &OpenOrderIndex::new(), 5);
        assert_eq!(resolved.asks.len(), 5);
        assert_eq!(resolved.bids.len(), 5);
        assert_eq!(resolved.asks[4].key, "ask-4");
    }

    #[test]
    fn test_mine_annotation() {
        let mut index = OpenOrderIndex::new();
        index.insert(Side::Bid, d(100), d(2));
        index.insert(Side::Ask, d(100), d(9));
        let snap = book(vec![level(101, 1, 1)], vec![level(100, 3, 1), level(99, 1, 1)]);
        let resolved = resolve_book(Some(&snap), &index, 10);

        assert_eq!(resolved.bids[0].mine, Some(d(2)));
        assert_eq!(resolved.bids[1].mine, None);
        assert_eq!(resolved.asks[0].mine, None);
    }

    #[test]
    fn test_histogram_range_uses_outer_depth() {
        let snap = book(
            vec![level(101, 1, 1).with_depth(d(1)), level(102, 2, 1).with_depth(d(3))],
            vec![level(100, 4, 1).with_depth(d(4)), level(99, 4, 1).with_depth(d(8))],
        );
        let resolved = resolve_book(Some(&snap), &OpenOrderIndex::new(), 10);
        assert_eq!(resolved.histogram_range, d(8));
    }

    #[test]
    fn test_histogram_range_never_negative() {
        let snap = book(
            vec![level(101, 1, 1).with_depth(d(-5))],
            vec![level(100, 1, 1)],
        );
        let resolved = resolve_book(Some(&snap), &OpenOrderIndex::new(), 10);
        assert_eq!(resolved.histogram_range, Decimal::ZERO);

        let garbage: OrderbookSnapshot = serde_json::from_str(
            r#"{"asks":[{"price":"101","size":"1","offset":1,"depth":"NaN"}],
                "bids":[{"price":"100","size":"1","offset":1,"depth":"n/a"}]}"#,
        )
        .unwrap();
        let resolved = resolve_book(Some(&garbage), &OpenOrderIndex::new(), 10);
        assert_eq!(resolved.histogram_range, Decimal::ZERO);
    }

    fn ladder() -> impl Strategy<Value = Vec<BookLevel>> {
        prop::collection::vec((95i64..105, 1i64..6, 0u64..4), 0..8)
            .prop_map(|rows| rows.into_iter().map(|(p, s, o)| level(p, s, o)).collect())
    }

    fn open_orders() -> impl Strategy<Value = OpenOrderIndex> {
        prop::collection::vec((any::<bool>(), 95i64..105, 0i64..4), 0..6).prop_map(|orders| {
            let mut index = OpenOrderIndex::new();
            for (is_bid, price, size) in orders {
                let side = if is_bid { Side::Bid } else { Side::Ask };
                index.insert(side, d(price), d(size));
            }
            index
        })
    }

    proptest! {
        #[test]
        fn prop_never_crossed_and_deterministic(
            mut asks in ladder(),
            mut bids in ladder(),
            orders in open_orders(),
            rows in 1usize..7,
        ) {
            asks.sort_by(|a, b| a.price.cmp(&b.price));
            bids.sort_by(|a, b| b.price.cmp(&a.price));
            let snap = book(asks, bids);

            let first = resolve_book(Some(&snap), &orders, rows);
            let second = resolve_book(Some(&snap), &orders, rows);
            prop_assert_eq!(&first, &second);
            if let (Some(bid), Some(ask)) = (first.best_bid(), first.best_ask()) {
                prop_assert!(bid.price < ask.price, "crossed: bid {} >= ask {}", bid.price, ask.price);
            }
            prop_assert!(first.asks.len() <= rows && first.bids.len() <= rows);
            prop_assert!(first.histogram_range >= Decimal::ZERO);
        }
    }
}
