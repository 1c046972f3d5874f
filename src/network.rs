//! Network URL constants.

/// Default WebSocket URL of the public market-data feed.
pub const DEFAULT_WS_URL: &str = "wss://indexer.dydx.trade/v4/ws";

/// Origin of a URL as `scheme://host[:port]`, the key receipts are recorded under.
///
/// Default ports are omitted, matching how browsers serialize origins.
pub fn origin_of(url: &url::Url) -> String {
    url.origin().ascii_serialization()
}
