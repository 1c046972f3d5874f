//! Subscription tracking and handler fan-out.
//!
//! The registry is plain bookkeeping: the session reads it to replay
//! subscriptions after a reconnect, the router reads it to deliver bars.

use crate::domain::candle::Bar;
use crate::shared::ChannelId;
use crate::ws::Channel;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Callback receiving every bar delivered on a candle channel.
pub type BarHandler = Arc<dyn Fn(&Bar) + Send + Sync>;

/// Registry shared between a session and its router.
pub type SharedRegistry = Arc<Mutex<SubscriptionRegistry>>;

/// Handle returned by [`SubscriptionRegistry::add_handler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

/// One tracked subscription.
pub struct Subscription {
    pub channel_id: ChannelId,
    pub stream: Channel,
    pub last_bar: Option<Bar>,
    handlers: Vec<(HandlerId, BarHandler)>,
}

impl Subscription {
    fn new(channel_id: ChannelId, stream: Channel) -> Self {
        Self {
            channel_id,
            stream,
            last_bar: None,
            handlers: Vec::new(),
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("channel_id", &self.channel_id)
            .field("stream", &self.stream)
            .field("last_bar", &self.last_bar)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Active subscriptions keyed by channel id.
///
/// Iteration order is by channel id, so replay after reconnect is deterministic.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    subs: BTreeMap<ChannelId, Subscription>,
    next_handler: u64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRegistry {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Track a channel. Returns `false` if it was already tracked.
    pub fn track(&mut self, channel_id: ChannelId, stream: Channel) -> bool {
        if self.subs.contains_key(&channel_id) {
            return false;
        }
        tracing::debug!("Tracking subscription: {} ({})", channel_id, stream);
        self.subs
            .insert(channel_id.clone(), Subscription::new(channel_id, stream));
        true
    }

    /// Stop tracking a channel, dropping its handlers.
    pub fn untrack(&mut self, channel_id: &ChannelId) -> Option<Subscription> {
        let removed = self.subs.remove(channel_id);
        if removed.is_some() {
            tracing::debug!("Removed subscription from tracking: {}", channel_id);
        }
        removed
    }

    /// Register a bar handler, tracking the channel as a candle stream if needed.
    pub fn add_handler(&mut self, channel_id: ChannelId, handler: BarHandler) -> HandlerId {
        let id = HandlerId(self.next_handler);
        self.next_handler += 1;
        self.subs
            .entry(channel_id.clone())
            .or_insert_with(|| Subscription::new(channel_id, Channel::Candles))
            .handlers
            .push((id, handler));
        id
    }

    /// Remove a handler. The subscription itself stays tracked.
    pub fn remove_handler(&mut self, handler: HandlerId) -> bool {
        for sub in self.subs.values_mut() {
            let before = sub.handlers.len();
            sub.handlers.retain(|(id, _)| *id != handler);
            if sub.handlers.len() != before {
                return true;
            }
        }
        false
    }

    /// Handlers for a channel in registration order.
    pub fn handlers_for(&self, channel_id: &ChannelId) -> Vec<BarHandler> {
        self.subs
            .get(channel_id)
            .map(|sub| sub.handlers.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default()
    }

    /// Record the latest bar. Returns `false` if the channel is not tracked.
    pub fn record_last_bar(&mut self, channel_id: &ChannelId, bar: Bar) -> bool {
        match self.subs.get_mut(channel_id) {
            Some(sub) => {
                sub.last_bar = Some(bar);
                true
            }
            None => false,
        }
    }

    pub fn last_bar(&self, channel_id: &ChannelId) -> Option<Bar> {
        self.subs.get(channel_id).and_then(|sub| sub.last_bar)
    }

    pub fn is_tracked(&self, channel_id: &ChannelId) -> bool {
        self.subs.contains_key(channel_id)
    }

    /// `(channel_id, stream)` of every tracked subscription, ordered by id.
    pub fn subscriptions(&self) -> Vec<(ChannelId, Channel)> {
        self.subs
            .values()
            .map(|sub| (sub.channel_id.clone(), sub.stream))
            .collect()
    }

    pub fn get(&self, channel_id: &ChannelId) -> Option<&Subscription> {
        self.subs.get(channel_id)
    }

    pub fn len(&self) -> usize {
        self.subs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    pub fn clear(&mut self) {
        if !self.subs.is_empty() {
            tracing::debug!("Cleared {} subscription(s)", self.subs.len());
        }
        self.subs.clear();
    }
}
