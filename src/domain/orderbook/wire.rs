//! Wire types for `v4_orderbook` frames.

use crate::error::FrameError;
use crate::shared::ChannelId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope of a forwarded `v4_orderbook` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderbookFrame {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: ChannelId,
    #[serde(default)]
    pub message_id: u64,
    #[serde(default)]
    pub contents: Value,
}

/// Full book sent in the `subscribed` frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotContents {
    #[serde(default)]
    pub bids: Vec<SnapshotLevel>,
    #[serde(default)]
    pub asks: Vec<SnapshotLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotLevel {
    pub price: Decimal,
    pub size: Decimal,
}

/// Incremental update: `[price, size]` pairs, size `0` removes the level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeltaContents {
    #[serde(default)]
    pub bids: Vec<(Decimal, Decimal)>,
    #[serde(default)]
    pub asks: Vec<(Decimal, Decimal)>,
}

/// Decoded orderbook update.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderbookUpdate {
    Snapshot {
        message_id: u64,
        contents: SnapshotContents,
    },
    Deltas {
        message_id: u64,
        deltas: Vec<DeltaContents>,
    },
}

impl OrderbookFrame {
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decode the contents according to the frame type.
    ///
    /// Returns `Ok(None)` for frame types that carry no book data.
    pub fn decode(&self) -> Result<Option<OrderbookUpdate>, FrameError> {
        let update = match self.kind.as_str() {
            "subscribed" => OrderbookUpdate::Snapshot {
                message_id: self.message_id,
                contents: SnapshotContents::deserialize(&self.contents)?,
            },
            "channel_data" => OrderbookUpdate::Deltas {
                message_id: self.message_id,
                deltas: vec![DeltaContents::deserialize(&self.contents)?],
            },
            "channel_batch_data" => OrderbookUpdate::Deltas {
                message_id: self.message_id,
                deltas: Vec::<DeltaContents>::deserialize(&self.contents)?,
            },
            _ => return Ok(None),
        };
        Ok(Some(update))
    }
}
