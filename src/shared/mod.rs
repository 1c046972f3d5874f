//! Shared newtypes and utilities used across all domain modules.
//!
//! These types are serialization-transparent: they serialize/deserialize identically
//! to the raw format the server sends, so they can be used directly in wire types
//! without conversion overhead.

pub mod serde_util;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

// ─── ChannelId ───────────────────────────────────────────────────────────────

/// Opaque identifier correlating a subscribe request with its inbound updates
/// (e.g. `"BTC-USD/1MIN"` for a candle stream, `"BTC-USD"` for an orderbook).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Channel id of a candle stream: `{market}/{resolution}`.
    pub fn candles(market: &MarketId, resolution: CandleResolution) -> Self {
        Self(format!("{}/{}", market, resolution))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ChannelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl FromStr for ChannelId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ChannelId(s.to_string()))
    }
}

impl Serialize for ChannelId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ChannelId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(ChannelId(s))
    }
}

// ─── MarketId ────────────────────────────────────────────────────────────────

/// Market ticker, e.g. `"BTC-USD"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketId(String);

impl MarketId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MarketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MarketId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ─── Side ────────────────────────────────────────────────────────────────────

/// Order side: Bid (buy) or Ask (sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Bid => "bid",
            Side::Ask => "ask",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Side::Bid => write!(f, "Buy"),
            Side::Ask => write!(f, "Sell"),
        }
    }
}

// ─── CandleResolution ────────────────────────────────────────────────────────

/// Candle resolution as spelled by the feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandleResolution {
    #[default]
    #[serde(rename = "1MIN")]
    Minute1,
    #[serde(rename = "5MINS")]
    Minute5,
    #[serde(rename = "15MINS")]
    Minute15,
    #[serde(rename = "30MINS")]
    Minute30,
    #[serde(rename = "1HOUR")]
    Hour1,
    #[serde(rename = "4HOURS")]
    Hour4,
    #[serde(rename = "1DAY")]
    Day1,
}

impl CandleResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minute1 => "1MIN",
            Self::Minute5 => "5MINS",
            Self::Minute15 => "15MINS",
            Self::Minute30 => "30MINS",
            Self::Hour1 => "1HOUR",
            Self::Hour4 => "4HOURS",
            Self::Day1 => "1DAY",
        }
    }

    /// Duration of one candle in seconds.
    pub fn seconds(&self) -> u64 {
        match self {
            Self::Minute1 => 60,
            Self::Minute5 => 300,
            Self::Minute15 => 900,
            Self::Minute30 => 1800,
            Self::Hour1 => 3600,
            Self::Hour4 => 14400,
            Self::Day1 => 86400,
        }
    }
}

impl std::fmt::Display for CandleResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candle_channel_id() {
        let id = ChannelId::candles(&MarketId::from("BTC-USD"), CandleResolution::Minute1);
        assert_eq!(id.as_str(), "BTC-USD/1MIN");
    }

    #[test]
    fn test_channel_id_serde() {
        let id = ChannelId::from("ETH-USD/1HOUR");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ETH-USD/1HOUR\"");
        let back: ChannelId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn test_side_serde() {
        let bid: Side = serde_json::from_str("\"bid\"").unwrap();
        assert_eq!(bid, Side::Bid);
        let ask: Side = serde_json::from_str("\"ask\"").unwrap();
        assert_eq!(ask, Side::Ask);
    }

    #[test]
    fn test_resolution_serde() {
        let r: CandleResolution = serde_json::from_str("\"4HOURS\"").unwrap();
        assert_eq!(r, CandleResolution::Hour4);
        assert_eq!(r.seconds(), 14400);
        assert_eq!(r.to_string(), "4HOURS");
    }
}
