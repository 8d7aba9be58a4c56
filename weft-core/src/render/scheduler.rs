//! Render Scheduler
//!
//! The scheduler turns `render:request` events into flushes. Requests are
//! accumulated into a [`PendingBatch`]; the first request of a batch posts a
//! single flush task on the [`TaskQueue`], and every request that arrives
//! before the host runs that task joins the same batch.
//!
//! # Flushing
//!
//! 1. Take the whole batch and reset it, before any rendering. A request
//!    raised while rendering therefore starts a new batch and a new flush.
//! 2. Pick the scope: `root` when the root was invalidated or no component
//!    is dirty, `components` otherwise.
//! 3. Render: replay the root, or update the dirty components in place.
//! 4. Publish `render:flush`. If a components flush had to fall back to a
//!    root replay, the published scope is `root` and `fallback` names the
//!    components that forced it.

use std::sync::{Arc, Weak};
use std::time::Instant;

use indexmap::IndexSet;
use parking_lot::Mutex;
use tracing::debug;

use super::queue::TaskQueue;
use super::reconciler::Reconciler;
use crate::component::ComponentId;
use crate::error::Result;
use crate::events::{EventBus, FlushScope, RenderFlush, RenderReason, RenderRequest, Subscription};

/// Invalidations waiting for the next flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingBatch {
    /// Distinct reasons, in arrival order.
    pub reasons: IndexSet<RenderReason>,
    /// Components that asked to be re-rendered, in arrival order.
    pub dirty: IndexSet<ComponentId>,
    /// Set by any request that named no component.
    pub root_invalidated: bool,
    /// Whether a flush task is already queued.
    pub flush_pending: bool,
}

impl PendingBatch {
    pub fn scope(&self) -> FlushScope {
        if self.root_invalidated || self.dirty.is_empty() {
            FlushScope::Root
        } else {
            FlushScope::Components
        }
    }
}

/// Batches render requests into flushes.
pub struct Scheduler {
    reconciler: Arc<Reconciler>,
    queue: Arc<TaskQueue>,
    events: EventBus,
    batch: Mutex<PendingBatch>,
    subscription: Mutex<Option<Subscription>>,
    this: Weak<Scheduler>,
}

impl Scheduler {
    /// Create a scheduler and subscribe it to `render:request` on `events`.
    pub fn new(reconciler: Arc<Reconciler>, queue: Arc<TaskQueue>, events: EventBus) -> Arc<Self> {
        let scheduler = Arc::new_cyclic(|this| Self {
            reconciler,
            queue,
            events,
            batch: Mutex::new(PendingBatch::default()),
            subscription: Mutex::new(None),
            this: this.clone(),
        });
        scheduler.attach();
        scheduler
    }

    /// Subscribe to `render:request`, replacing any earlier subscription.
    pub fn attach(&self) {
        let this = self.this.clone();
        let subscription = self.events.on::<RenderRequest, _>(move |request| {
            if let Some(scheduler) = this.upgrade() {
                scheduler.enqueue(request.reason, request.component);
            }
        });

        if let Some(previous) = self.subscription.lock().replace(subscription) {
            previous.unsubscribe();
        }
    }

    /// Stop listening for render requests.
    pub fn detach(&self) {
        if let Some(subscription) = self.subscription.lock().take() {
            subscription.unsubscribe();
        }
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// Add an invalidation to the pending batch, posting a flush if none is
    /// queued yet.
    pub fn enqueue(&self, reason: RenderReason, component: Option<ComponentId>) {
        let post = {
            let mut batch = self.batch.lock();
            batch.reasons.insert(reason);
            match component {
                Some(id) => {
                    batch.dirty.insert(id);
                }
                None => batch.root_invalidated = true,
            }
            !std::mem::replace(&mut batch.flush_pending, true)
        };

        if post {
            let this = self.this.clone();
            self.queue.push(Box::new(move || match this.upgrade() {
                Some(scheduler) => scheduler.flush().map(drop),
                None => Ok(()),
            }));
        }
    }

    /// Apply the pending batch now.
    ///
    /// Returns the published flush summary, or `None` when there was nothing
    /// to do.
    pub fn flush(&self) -> Result<Option<RenderFlush>> {
        let batch = std::mem::take(&mut *self.batch.lock());
        if batch.reasons.is_empty() {
            return Ok(None);
        }

        let timestamp = self.events.now();
        let started = Instant::now();

        let (scope, components, fallback) = match batch.scope() {
            FlushScope::Root => {
                self.reconciler.rerender()?;
                (FlushScope::Root, Vec::new(), Vec::new())
            }
            FlushScope::Components => {
                let dirty: Vec<ComponentId> = batch.dirty.into_iter().collect();
                let fallback = self.reconciler.rerender_components(&dirty)?;
                if fallback.is_empty() {
                    (FlushScope::Components, dirty, Vec::new())
                } else {
                    (FlushScope::Root, Vec::new(), fallback)
                }
            }
        };

        let flush = RenderFlush {
            reasons: batch.reasons.into_iter().collect(),
            components,
            scope,
            fallback,
            timestamp,
            duration: started.elapsed().as_secs_f64() * 1000.0,
        };

        debug!(
            scope = ?flush.scope,
            components = flush.components.len(),
            fallback = flush.fallback.len(),
            duration_ms = flush.duration,
            "flush"
        );
        self.events.publish(flush.clone());
        Ok(Some(flush))
    }

    /// A copy of the pending batch.
    pub fn pending(&self) -> PendingBatch {
        self.batch.lock().clone()
    }

    /// Drop the pending batch.
    pub fn reset(&self) {
        *self.batch.lock() = PendingBatch::default();
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("batch", &*self.batch.lock())
            .field("attached", &self.is_attached())
            .finish()
    }
}
