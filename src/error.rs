//! Unified error types.

use thiserror::Error;

/// Top-level crate error.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("WebSocket error: {0}")]
    Ws(#[from] WsError),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Session / transport errors.
#[derive(Error, Debug)]
pub enum WsError {
    #[error("Not connected")]
    NotConnected,

    #[error("Session already running")]
    AlreadyConnected,

    #[error("Invalid WebSocket URL: {0}")]
    InvalidUrl(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("Connection closed: code={code:?} reason={reason}")]
    Closed { code: Option<u16>, reason: String },
}

#[cfg(feature = "ws-native")]
impl From<tokio_tungstenite::tungstenite::Error> for WsError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error;
        match err {
            Error::ConnectionClosed => WsError::Closed {
                code: Some(1000),
                reason: "Connection closed normally".to_string(),
            },
            Error::AlreadyClosed => WsError::NotConnected,
            Error::Url(e) => WsError::InvalidUrl(e.to_string()),
            Error::Http(resp) => {
                WsError::ConnectionFailed(format!("HTTP error: {:?}", resp.status()))
            }
            other => WsError::ConnectionFailed(other.to_string()),
        }
    }
}

/// Errors raised while classifying a single inbound frame.
///
/// These never close the connection: the router logs them and drops the frame.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Markets frame has no `contents`")]
    MissingContents,

    #[error("Malformed candle: {0}")]
    Candle(String),
}

pub type WsResult<T> = Result<T, WsError>;
