//! Event Bus
//!
//! A typed publish/subscribe hub. Publishing is synchronous: every listener
//! registered for the event kind runs before `publish` returns, in
//! subscription order.
//!
//! # Dispatch Snapshot
//!
//! The listener list is copied before dispatch starts and the lock is released
//! before any listener runs. Listeners may therefore subscribe, unsubscribe or
//! publish from inside a callback; changes take effect from the next publish.
//!
//! Listener panics are not caught. They unwind into whoever called `publish`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use indexmap::IndexMap;
use parking_lot::RwLock;
use smallvec::SmallVec;

use super::payload::{EventKind, EventPayload, RuntimeEvent};

/// Callback invoked for each published event.
pub type Listener = Arc<dyn Fn(&RuntimeEvent) + Send + Sync>;

/// Unique identifier for a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

struct BusInner {
    listeners: RwLock<IndexMap<EventKind, Vec<(ListenerId, Listener)>>>,
    epoch: Instant,
}

/// The runtime's event hub.
///
/// Cloning an `EventBus` yields another handle to the same hub.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                listeners: RwLock::new(IndexMap::new()),
                epoch: Instant::now(),
            }),
        }
    }

    /// Milliseconds elapsed since this bus was created.
    ///
    /// Used as the timestamp of every event published by the runtime.
    pub fn now(&self) -> f64 {
        self.inner.epoch.elapsed().as_secs_f64() * 1000.0
    }

    /// Register a listener for one event kind.
    ///
    /// The listener stays registered until [`Subscription::unsubscribe`] is
    /// called or the bus is cleared. Dropping the subscription handle does
    /// not unregister it.
    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> Subscription
    where
        F: Fn(&RuntimeEvent) + Send + Sync + 'static,
    {
        let id = ListenerId::new();
        self.inner
            .listeners
            .write()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));

        Subscription {
            bus: Arc::downgrade(&self.inner),
            kind,
            id,
        }
    }

    /// Register a listener that receives the payload type directly.
    pub fn on<P, F>(&self, listener: F) -> Subscription
    where
        P: EventPayload,
        F: Fn(&P) + Send + Sync + 'static,
    {
        self.subscribe(P::KIND, move |event| {
            if let Some(payload) = P::from_event(event) {
                listener(payload);
            }
        })
    }

    /// Deliver an event to every listener currently registered for its kind.
    pub fn publish(&self, event: impl Into<RuntimeEvent>) {
        let event = event.into();
        let kind = event.kind();

        let snapshot: SmallVec<[Listener; 4]> = {
            let listeners = self.inner.listeners.read();
            match listeners.get(&kind) {
                Some(entries) => entries.iter().map(|(_, l)| Arc::clone(l)).collect(),
                None => return,
            }
        };

        tracing::trace!(event = kind.name(), listeners = snapshot.len(), "publish");

        for listener in snapshot {
            listener(&event);
        }
    }

    /// Number of listeners registered for `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner
            .listeners
            .read()
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Whether anyone listens for `kind`.
    ///
    /// Publishers use this to skip building payloads nobody observes.
    pub fn has_listeners(&self, kind: EventKind) -> bool {
        self.listener_count(kind) > 0
    }

    /// Remove every listener.
    pub fn clear(&self) {
        self.inner.listeners.write().clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.inner.listeners.read();
        f.debug_struct("EventBus")
            .field("kinds", &listeners.len())
            .field(
                "listeners",
                &listeners.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    bus: Weak<BusInner>,
    kind: EventKind,
    id: ListenerId,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Remove the listener. A no-op if the bus is gone or was cleared.
    pub fn unsubscribe(self) {
        let Some(bus) = self.bus.upgrade() else {
            return;
        };

        let mut listeners = bus.listeners.write();
        if let Some(entries) = listeners.get_mut(&self.kind) {
            entries.retain(|(id, _)| *id != self.id);
            if entries.is_empty() {
                listeners.shift_remove(&self.kind);
            }
        }
    }
}
