// src/events/hub.rs

//! Process-wide publish/subscribe hub.
//!
//! Every observer owns an unbounded channel, so publishing never waits on
//! an observer and a slow observer never loses events. A closed channel
//! removes the observer. Delivery to observers happens in subscription
//! order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc;
use tracing::debug;

use crate::events::EngineEvent;

pub type SubscriberId = u64;

#[derive(Debug)]
struct Subscriber {
    id: SubscriberId,
    tx: mpsc::UnboundedSender<EngineEvent>,
}

#[derive(Debug, Default)]
struct HubInner {
    next_id: SubscriberId,
    subscribers: Vec<Subscriber>,
}

impl HubInner {
    fn remove(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        before != self.subscribers.len()
    }
}

fn lock_inner(inner: &Mutex<HubInner>) -> MutexGuard<'_, HubInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cheap to clone; all clones share the same subscriber list.
#[derive(Debug, Clone, Default)]
pub struct EventHub {
    inner: Arc<Mutex<HubInner>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new observer. Dropping the returned [`Subscription`]
    /// unsubscribes it.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = lock_inner(&self.inner);
        inner.next_id += 1;
        let id = inner.next_id;
        inner.subscribers.push(Subscriber { id, tx });
        debug!(subscriber = id, total = inner.subscribers.len(), "observer subscribed");

        Subscription {
            id,
            rx,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Remove an observer. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = lock_inner(&self.inner).remove(id);
        if removed {
            debug!(subscriber = id, "observer unsubscribed");
        }
        removed
    }

    /// Deliver `event` to every observer; returns how many accepted it.
    pub fn publish(&self, event: EngineEvent) -> usize {
        let mut inner = lock_inner(&self.inner);
        let mut delivered = 0;
        let mut closed = Vec::new();

        for sub in inner.subscribers.iter() {
            match sub.tx.send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => closed.push(sub.id),
            }
        }

        for id in closed {
            debug!(subscriber = id, "observer went away; removing");
            inner.remove(id);
        }

        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        lock_inner(&self.inner).subscribers.len()
    }
}

/// A live observer registration.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::UnboundedReceiver<EngineEvent>,
    hub: Weak<Mutex<HubInner>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next event; `None` once unsubscribed and drained.
    pub async fn recv(&mut self) -> Option<EngineEvent> {
        self.rx.recv().await
    }

    /// Next buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<EngineEvent> {
        self.rx.try_recv().ok()
    }

    /// Everything currently buffered.
    pub fn drain(&mut self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Explicit teardown; same as dropping.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.hub.upgrade() {
            lock_inner(&inner).remove(self.id);
        }
    }
}
