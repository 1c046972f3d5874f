//! Candle domain: canonical bars produced from `v4_candles` updates.

mod convert;
pub mod wire;

pub use crate::shared::CandleResolution;
pub use wire::RawCandle;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Canonical OHLCV bar handed to chart consumers.
///
/// `time` is the candle start in unix milliseconds. `volume` is the base-token
/// volume rounded up to a whole unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    pub time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}
