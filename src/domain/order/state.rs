//! Open-order index: app-owned, rebuilt whenever the trader's orders change.

use super::OpenOrder;
use crate::shared::Side;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Aggregated resting size of the trader's own orders, keyed by `(side, price)`.
///
/// The reconciler only reads it; lookups are by exact price.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenOrderIndex {
    sizes: HashMap<(Side, Decimal), Decimal>,
}

impl OpenOrderIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from orders, summing remaining sizes at the same level.
    pub fn from_orders<'a>(orders: impl IntoIterator<Item = &'a OpenOrder>) -> Self {
        let mut index = Self::new();
        for order in orders {
            if order.is_resting() {
                index.insert(order.side, order.price, order.remaining_size);
            }
        }
        index
    }

    /// Add `size` to the level. Non-positive sizes are ignored.
    pub fn insert(&mut self, side: Side, price: Decimal, size: Decimal) {
        if size <= Decimal::ZERO {
            return;
        }
        *self
            .sizes
            .entry((side, price.normalize()))
            .or_insert(Decimal::ZERO) += size;
    }

    /// Trader's resting size at exactly this level, if any.
    pub fn mine(&self, side: Side, price: Decimal) -> Option<Decimal> {
        self.sizes.get(&(side, price.normalize())).copied()
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    pub fn clear(&mut self) {
        self.sizes.clear();
    }
}
