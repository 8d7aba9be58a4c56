//! Diagnostics
//!
//! [`EventRecorder`] subscribes to every event kind on a bus and keeps what
//! it sees, in publish order. Recordings can be exported as JSON for humans
//! or as MessagePack for tooling.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Result, RuntimeError};
use crate::events::{EventBus, EventKind, RenderFlush, RuntimeEvent, Subscription};

/// Records every event published on a bus.
pub struct EventRecorder {
    events: Arc<Mutex<Vec<RuntimeEvent>>>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl EventRecorder {
    /// Start recording `bus`.
    pub fn attach(bus: &EventBus) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let subscriptions = EventKind::ALL
            .into_iter()
            .map(|kind| {
                let events = Arc::clone(&events);
                bus.subscribe(kind, move |event| events.lock().push(event.clone()))
            })
            .collect();

        Self {
            events,
            subscriptions: Mutex::new(subscriptions),
        }
    }

    /// Stop recording. Events recorded so far are kept.
    pub fn detach(&self) {
        for subscription in self.subscriptions.lock().drain(..) {
            subscription.unsubscribe();
        }
    }

    pub fn events(&self) -> Vec<RuntimeEvent> {
        self.events.lock().clone()
    }

    /// Recorded `render:flush` payloads.
    pub fn flushes(&self) -> Vec<RenderFlush> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                RuntimeEvent::RenderFlush(flush) => Some(flush.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.kind() == kind)
            .count()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// The recording as a pretty-printed JSON array.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&*self.events.lock())
            .map_err(|err| RuntimeError::Export(err.to_string()))
    }

    /// The recording as MessagePack, with struct fields encoded by name.
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(&*self.events.lock())
            .map_err(|err| RuntimeError::Export(err.to_string()))
    }
}

impl std::fmt::Debug for EventRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRecorder")
            .field("events", &self.len())
            .field("attached", &!self.subscriptions.lock().is_empty())
            .finish()
    }
}
