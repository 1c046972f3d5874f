//! Order domain: the trader's resting orders, as seen by the book view.

pub mod state;

use crate::shared::{MarketId, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use state::OpenOrderIndex;

// ─── OpenOrder ───────────────────────────────────────────────────────────────

/// A resting order belonging to the trader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrder {
    pub id: String,
    pub market: MarketId,
    pub side: Side,
    pub price: Decimal,
    /// Unfilled size still on the book.
    pub remaining_size: Decimal,
}

impl OpenOrder {
    pub fn is_resting(&self) -> bool {
        self.remaining_size > Decimal::ZERO
    }
}
