//! Market domain: market lifecycle status as carried by `v4_markets`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── MarketStatus ────────────────────────────────────────────────────────────

/// Market lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketStatus {
    Initializing,
    Online,
    Paused,
    CancelOnly,
    PostOnly,
    FinalSettlement,
}

impl MarketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketStatus::Initializing => "INITIALIZING",
            MarketStatus::Online => "ONLINE",
            MarketStatus::Paused => "PAUSED",
            MarketStatus::CancelOnly => "CANCEL_ONLY",
            MarketStatus::PostOnly => "POST_ONLY",
            MarketStatus::FinalSettlement => "FINAL_SETTLEMENT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INITIALIZING" => Some(MarketStatus::Initializing),
            "ONLINE" => Some(MarketStatus::Online),
            "PAUSED" => Some(MarketStatus::Paused),
            "CANCEL_ONLY" => Some(MarketStatus::CancelOnly),
            "POST_ONLY" => Some(MarketStatus::PostOnly),
            "FINAL_SETTLEMENT" => Some(MarketStatus::FinalSettlement),
            _ => None,
        }
    }
}

impl std::fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rewrites every `markets.<id>.status == "INITIALIZING"` in a `v4_markets`
/// `contents` object to `"ONLINE"`. Returns how many markets were changed.
///
/// Entries without a `status`, or with any other status, are left untouched.
pub fn promote_initializing(contents: &mut Value) -> usize {
    let Some(markets) = contents.get_mut("markets").and_then(Value::as_object_mut) else {
        return 0;
    };

    let mut promoted = 0;
    for market in markets.values_mut() {
        let Some(status) = market.get_mut("status") else {
            continue;
        };
        if status.as_str() == Some(MarketStatus::Initializing.as_str()) {
            *status = Value::String(MarketStatus::Online.as_str().to_string());
            promoted += 1;
        }
    }
    promoted
}
