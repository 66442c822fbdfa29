// ── Subscription registry ──
//
// Event name → (subscriber id → subscription). At most one callback per
// (event, subscriber id); subscribing again replaces it in place.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::event::PushEvent;

/// Subscriber callback. Invoked on the hub's reader task.
pub type Callback = Arc<dyn Fn(&PushEvent) + Send + Sync>;

/// Provider tag used when the caller does not name one.
pub const DEFAULT_PROVIDER: &str = "sse";

/// One subscriber's interest in one event name.
#[derive(Clone)]
pub struct Subscription {
    pub subscriber_id: String,
    pub provider: String,
    pub event: String,
    pub callback: Callback,
}

impl Subscription {
    pub fn new<F>(subscriber_id: impl Into<String>, event: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&PushEvent) + Send + Sync + 'static,
    {
        Self {
            subscriber_id: subscriber_id.into(),
            provider: DEFAULT_PROVIDER.to_owned(),
            event: event.into(),
            callback: Arc::new(callback),
        }
    }

    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("subscriber_id", &self.subscriber_id)
            .field("provider", &self.provider)
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

/// Storage for all live subscriptions of one hub.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    by_event: HashMap<String, IndexMap<String, Subscription>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a subscription. Returns `true` if it is the first for its event.
    pub fn insert(&mut self, sub: Subscription) -> bool {
        let bucket = self.by_event.entry(sub.event.clone()).or_default();
        let first = bucket.is_empty();
        bucket.insert(sub.subscriber_id.clone(), sub);
        first
    }

    /// Remove every registration held by `subscriber_id`.
    ///
    /// Returns how many were removed; an unknown id removes nothing.
    pub fn remove_subscriber(&mut self, subscriber_id: &str) -> usize {
        let mut removed = 0;
        self.by_event.retain(|_, bucket| {
            if bucket.shift_remove(subscriber_id).is_some() {
                removed += 1;
            }
            !bucket.is_empty()
        });
        removed
    }

    /// Callbacks registered for `event`, in subscription order.
    pub fn callbacks_for(&self, event: &str) -> Vec<Callback> {
        self.by_event
            .get(event)
            .map(|bucket| bucket.values().map(|s| Arc::clone(&s.callback)).collect())
            .unwrap_or_default()
    }

    pub fn get(&self, event: &str, subscriber_id: &str) -> Option<&Subscription> {
        self.by_event.get(event)?.get(subscriber_id)
    }

    pub fn contains(&self, event: &str, subscriber_id: &str) -> bool {
        self.get(event, subscriber_id).is_some()
    }

    /// Event names with at least one subscriber.
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.by_event.keys().map(String::as_str)
    }

    /// Total registrations across all events.
    pub fn len(&self) -> usize {
        self.by_event.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_event.is_empty()
    }
}
