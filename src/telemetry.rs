//! Receipt bookkeeping for feed health dashboards.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Receives the time of every successfully handled inbound frame.
pub trait ReceiptSink: Send + Sync {
    fn record(&self, origin: &str, at: DateTime<Utc>);
}

/// Discards receipts.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReceipts;

impl ReceiptSink for NoopReceipts {
    fn record(&self, _origin: &str, _at: DateTime<Utc>) {}
}

/// Keeps the most recent receipt per origin.
#[derive(Debug, Default)]
pub struct LastReceiptByOrigin {
    inner: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl LastReceiptByOrigin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self, origin: &str) -> Option<DateTime<Utc>> {
        self.inner.lock().ok()?.get(origin).copied()
    }

    pub fn origins(&self) -> Vec<String> {
        match self.inner.lock() {
            Ok(map) => map.keys().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl ReceiptSink for LastReceiptByOrigin {
    fn record(&self, origin: &str, at: DateTime<Utc>) {
        match self.inner.lock() {
            Ok(mut map) => {
                let slot = map.entry(origin.to_string()).or_insert(at);
                if at > *slot {
                    *slot = at;
                }
            }
            Err(e) => tracing::warn!("Receipt map poisoned: {}", e),
        }
    }
}
