//! Publish/subscribe event bus for decoupling tree leaves.
//!
//! Payloads are [`serde_json::Value`]s so producers and consumers agree on a
//! wire-shaped contract rather than concrete types. The subscription list is
//! snapshotted before delivery, so a callback may subscribe, unsubscribe, or
//! publish without deadlocking the bus.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Identifier returned by [`EventBus::subscribe`], used to unsubscribe.
pub type SubscriptionId = u64;

type Callback = Arc<dyn Fn(&Value) + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    callback: Callback,
}

#[derive(Default)]
struct BusInner {
    subscriptions: HashMap<String, Vec<Subscription>>,
    next_id: SubscriptionId,
}

/// Name-keyed pub/sub bus.
#[derive(Default)]
pub struct EventBus {
    inner: Mutex<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `event`. Returns the id needed to
    /// unsubscribe.
    pub fn subscribe<F>(&self, event: impl Into<String>, callback: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner
            .subscriptions
            .entry(event.into())
            .or_default()
            .push(Subscription {
                id,
                callback: Arc::new(callback),
            });
        id
    }

    pub fn unsubscribe(&self, event: &str, id: SubscriptionId) {
        let mut inner = self.inner.lock();
        if let Some(subs) = inner.subscriptions.get_mut(event) {
            subs.retain(|sub| sub.id != id);
        }
    }

    /// Deliver `payload` to every subscriber of `event`.
    ///
    /// The subscriber list is copied out under the lock and invoked after it
    /// is released; mid-delivery subscription changes take effect on the
    /// next publish.
    pub fn publish(&self, event: &str, payload: Value) {
        let callbacks: Vec<Callback> = {
            let inner = self.inner.lock();
            match inner.subscriptions.get(event) {
                Some(subs) => subs.iter().map(|sub| Arc::clone(&sub.callback)).collect(),
                None => return,
            }
        };
        tracing::trace!(event, subscribers = callbacks.len(), "publishing event");
        for callback in callbacks {
            callback(&payload);
        }
    }

    /// Drop every subscription for `event`.
    pub fn clear_event(&self, event: &str) {
        self.inner.lock().subscriptions.remove(event);
    }

    pub fn clear_all(&self) {
        self.inner.lock().subscriptions.clear();
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.inner
            .lock()
            .subscriptions
            .get(event)
            .map_or(0, |subs| subs.len())
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("EventBus")
            .field("events", &inner.subscriptions.len())
            .finish()
    }
}
