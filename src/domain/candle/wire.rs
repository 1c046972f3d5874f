//! Wire types for `v4_candles` contents.

use crate::shared::{CandleResolution, MarketId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One candle as the feed sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCandle {
    #[serde(with = "crate::shared::serde_util::rfc3339_ms")]
    pub started_at: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub base_token_volume: Decimal,
    #[serde(default)]
    pub usd_volume: Option<Decimal>,
    #[serde(default)]
    pub trades: Option<u64>,
    #[serde(default)]
    pub resolution: Option<CandleResolution>,
    #[serde(default)]
    pub ticker: Option<MarketId>,
}
