//! Inbound frame classification.

use crate::domain::candle::RawCandle;
use crate::error::FrameError;
use crate::shared::ChannelId;
use crate::ws::Channel;
use serde::Deserialize;
use serde_json::Value;

/// An inbound text frame sorted by what should happen to it.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Heartbeat reply.
    Pong,
    /// Candle update. `candle` is `None` when `contents` is not a non-empty
    /// array, e.g. the initial `subscribed` frame.
    Candles {
        id: Option<ChannelId>,
        candle: Option<RawCandle>,
    },
    Orderbook,
    /// Market frame, kept parsed so the status override can rewrite it.
    Markets(Value),
    /// Anything else, forwarded as received.
    Passthrough,
}

#[derive(Deserialize)]
struct Header {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    channel: Option<Channel>,
    #[serde(default)]
    id: Option<ChannelId>,
}

impl InboundFrame {
    /// Classify a text frame by `(type, channel)`.
    ///
    /// Only invalid JSON and malformed candles are errors. A frame without a
    /// `type`, or one that is not an object at all, falls through by channel.
    pub fn classify(text: &str, pong_type: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Ok(InboundFrame::Passthrough);
        }

        let header = Header::deserialize(&value)?;
        if header.kind.as_deref() == Some(pong_type) {
            return Ok(InboundFrame::Pong);
        }

        let frame = match header.channel {
            Some(Channel::Candles) => InboundFrame::Candles {
                id: header.id,
                candle: first_candle(value.get("contents"))?,
            },
            Some(Channel::Orderbook) => InboundFrame::Orderbook,
            Some(Channel::Markets) => InboundFrame::Markets(value),
            _ => InboundFrame::Passthrough,
        };
        Ok(frame)
    }
}

fn first_candle(contents: Option<&Value>) -> Result<Option<RawCandle>, FrameError> {
    let Some(first) = contents.and_then(Value::as_array).and_then(|items| items.first()) else {
        return Ok(None);
    };
    RawCandle::deserialize(first)
        .map(Some)
        .map_err(|e| FrameError::Candle(e.to_string()))
}
