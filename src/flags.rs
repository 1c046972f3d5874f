//! Runtime feature flags consulted by the message router.

/// Environment variable that disables orderbook forwarding when set to `"0"`.
pub const PROCESS_ORDERBOOK_ENV: &str = "MARKETFEED_PROCESS_ORDERBOOK";

/// Environment variable that enables the INITIALIZING → ONLINE market override.
pub const DISPLAY_INITIALIZING_MARKETS_ENV: &str = "MARKETFEED_DISPLAY_INITIALIZING_MARKETS";

/// Flags are read per frame, so implementations may change values at runtime.
pub trait FeatureFlags: Send + Sync {
    /// Forward `v4_orderbook` frames downstream.
    fn process_orderbook(&self) -> bool;

    /// Present markets still initializing as online.
    fn display_initializing_markets(&self) -> bool;
}

/// Fixed flag values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticFlags {
    pub process_orderbook: bool,
    pub display_initializing_markets: bool,
}

impl Default for StaticFlags {
    fn default() -> Self {
        Self {
            process_orderbook: true,
            display_initializing_markets: false,
        }
    }
}

impl StaticFlags {
    /// Read flags from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let process_orderbook = lookup(PROCESS_ORDERBOOK_ENV)
            .map(|v| v.trim() != "0")
            .unwrap_or(true);
        let display_initializing_markets = lookup(DISPLAY_INITIALIZING_MARKETS_ENV)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true"))
            .unwrap_or(false);

        Self {
            process_orderbook,
            display_initializing_markets,
        }
    }
}

impl FeatureFlags for StaticFlags {
    fn process_orderbook(&self) -> bool {
        self.process_orderbook
    }

    fn display_initializing_markets(&self) -> bool {
        self.display_initializing_markets
    }
}
