//! Runtime
//!
//! A [`Runtime`] owns one complete, independent rendering context: the event
//! bus, the component store, the hook engine, the reconciler, the scheduler
//! and the host task queue. Nothing is global; two runtimes never see each
//! other's components or events.
//!
//! # Host Loop
//!
//! Render requests are not applied immediately. They are batched and flushed
//! on the next host turn, which the embedder drives:
//!
//! - [`Runtime::run_turn`] runs one turn synchronously.
//! - [`Runtime::run_until_idle`] keeps running turns until nothing is queued.
//! - [`Runtime::next_turn`] waits for work, then runs one turn.
//!
//! # Example
//!
//! ```rust
//! use weft_core::{create_element, Component, Props, Runtime};
//!
//! let runtime = Runtime::new();
//! let document = runtime.document().unwrap().clone();
//! let root = document.create_element("main");
//!
//! let counter = Component::new("Counter", |hooks, _| {
//!     let (count, set_count) = hooks.use_state(0)?;
//!     hooks.use_effect(move || { set_count.set(1); None }, None)?;
//!     Ok(create_element("span", Props::new().child(count)))
//! });
//!
//! runtime.render(create_element(&counter, Props::new()), root).unwrap();
//! assert_eq!(document.text_content(root), "0");
//!
//! runtime.run_until_idle().unwrap();
//! assert_eq!(document.text_content(root), "1");
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::component::{Cleanup, ComponentId, ComponentStore};
use crate::config::RuntimeConfig;
use crate::dom::{Document, DomBuilder, NodeBuilder, NodeId};
use crate::element::Element;
use crate::error::{Result, RuntimeError};
use crate::events::{EventBus, RenderReason, RenderRequest};
use crate::hooks::{Dependencies, Hooks, Ref, SetState};
use crate::render::{Reconciler, Scheduler, TaskQueue};

struct RuntimeInner {
    config: RuntimeConfig,
    events: EventBus,
    hooks: Hooks,
    document: Option<Arc<Document>>,
    reconciler: Arc<Reconciler>,
    scheduler: Arc<Scheduler>,
    queue: Arc<TaskQueue>,
}

/// Handle to a rendering context.
///
/// Cheap to clone; clones share the context.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// A runtime with default configuration, rendering into its own
    /// in-memory [`Document`].
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let events = EventBus::new();
        let document = Arc::new(Document::new());
        let builder = Arc::new(DomBuilder::new(Arc::clone(&document)).with_events(events.clone()));
        Self::assemble(config, events, builder, Some(document))
    }

    /// A runtime that renders through a custom [`NodeBuilder`].
    ///
    /// Such a runtime has no [`document`](Self::document).
    pub fn with_builder(config: RuntimeConfig, builder: Arc<dyn NodeBuilder>) -> Self {
        Self::assemble(config, EventBus::new(), builder, None)
    }

    fn assemble(
        config: RuntimeConfig,
        events: EventBus,
        builder: Arc<dyn NodeBuilder>,
        document: Option<Arc<Document>>,
    ) -> Self {
        let hooks = Hooks::new(Arc::new(ComponentStore::new()), events.clone());
        let reconciler = Arc::new(Reconciler::new(hooks.clone(), builder, config.clone()));
        let queue = Arc::new(TaskQueue::new());
        let scheduler = Scheduler::new(Arc::clone(&reconciler), Arc::clone(&queue), events.clone());

        Self {
            inner: Arc::new(RuntimeInner {
                config,
                events,
                hooks,
                document,
                reconciler,
                scheduler,
                queue,
            }),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn hooks(&self) -> &Hooks {
        &self.inner.hooks
    }

    pub fn store(&self) -> &Arc<ComponentStore> {
        self.inner.hooks.store()
    }

    /// The in-memory document, unless the runtime was built with a custom
    /// builder.
    pub fn document(&self) -> Option<&Arc<Document>> {
        self.inner.document.as_ref()
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.inner.reconciler
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.inner.scheduler
    }

    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.inner.queue
    }

    pub fn use_state<T>(&self, initial: T) -> Result<(T, SetState<T>)>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        self.inner.hooks.use_state(initial)
    }

    pub fn use_state_with<T, F>(&self, init: F) -> Result<(T, SetState<T>)>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        self.inner.hooks.use_state_with(init)
    }

    pub fn use_effect<F>(&self, callback: F, dependencies: Option<Dependencies>) -> Result<()>
    where
        F: FnOnce() -> Option<Cleanup>,
    {
        self.inner.hooks.use_effect(callback, dependencies)
    }

    pub fn use_ref<T>(&self, initial: T) -> Result<Ref<T>>
    where
        T: Send + Sync + 'static,
    {
        self.inner.hooks.use_ref(initial)
    }

    /// Render `element` into `container`, replacing whatever was there.
    pub fn render(&self, element: Element, container: NodeId) -> Result<()> {
        self.inner.reconciler.render(element, container)
    }

    /// Ask for a re-render on the next turn.
    ///
    /// With a component, only that component is updated if possible;
    /// without one, the whole root is replayed.
    pub fn request_render(&self, reason: RenderReason, component: Option<ComponentId>) {
        self.inner.events.publish(RenderRequest {
            reason,
            component,
            timestamp: self.inner.events.now(),
        });
    }

    /// Run one host turn. Returns the number of tasks that ran.
    pub fn run_turn(&self) -> Result<usize> {
        self.inner.queue.run_turn()
    }

    /// Run turns until the queue is empty. Returns the number of turns.
    ///
    /// Fails with [`RuntimeError::TurnLimit`] if work is still queued after
    /// `max_turns` turns, e.g. an effect that sets state on every render.
    pub fn run_until_idle(&self) -> Result<usize> {
        let max_turns = self.inner.config.max_turns;
        let mut turns = 0;

        while !self.inner.queue.is_empty() {
            if turns == max_turns {
                return Err(RuntimeError::TurnLimit(max_turns));
            }
            self.inner.queue.run_turn()?;
            turns += 1;
        }
        Ok(turns)
    }

    /// Wait until work is queued, then run one turn.
    pub async fn next_turn(&self) -> Result<usize> {
        self.inner.queue.ready().await;
        self.run_turn()
    }

    /// Tear the runtime down.
    ///
    /// Stops scheduling, drops pending work, forgets the root, runs every
    /// pending effect cleanup and removes all bus listeners. The runtime can
    /// be rendered into again afterwards, but nothing will schedule flushes
    /// until [`Scheduler::attach`] is called.
    pub fn cleanup(&self) {
        let inner = &self.inner;
        inner.scheduler.detach();
        inner.scheduler.reset();
        inner.queue.clear();
        inner.reconciler.reset();
        inner.hooks.store().teardown_all();
        inner.events.clear();
        debug!("runtime cleaned up");
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .field("events", &self.inner.events)
            .field("store", self.inner.hooks.store())
            .field("scheduler", &self.inner.scheduler)
            .field("queue", &self.inner.queue)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::element::{create_element, Props};
    use crate::events::EventKind;

    #[test]
    fn runtimes_are_independent() {
        let a = Runtime::new();
        let b = Runtime::new();

        let counter = Component::new("Counter", |hooks, _| {
            let (count, _) = hooks.use_state(0)?;
            Ok(create_element("span", Props::new().child(count)))
        });

        let root = a.document().unwrap().create_element("main");
        a.render(create_element(&counter, Props::new()), root).unwrap();

        assert!(a.store().contains(counter.id()));
        assert!(!b.store().contains(counter.id()));
    }

    #[test]
    fn hooks_outside_components_fail() {
        let runtime = Runtime::new();
        assert!(matches!(
            runtime.use_ref(0).unwrap_err(),
            RuntimeError::HookOutsideComponent { hook: "use_ref" }
        ));
        assert!(runtime.use_effect(|| None, None).is_err());
    }

    #[test]
    fn endless_updates_hit_the_turn_limit() {
        let config = RuntimeConfig {
            max_turns: 8,
            ..RuntimeConfig::default()
        };
        let runtime = Runtime::with_config(config);
        let root = runtime.document().unwrap().create_element("main");

        let restless = Component::new("Restless", |hooks, _| {
            let (count, set_count) = hooks.use_state(0_u64)?;
            hooks.use_effect(
                move || {
                    set_count.set(count + 1);
                    None
                },
                None,
            )?;
            Ok(Element::text(count.to_string()))
        });

        runtime
            .render(create_element(&restless, Props::new()), root)
            .unwrap();
        let err = runtime.run_until_idle().unwrap_err();
        assert!(matches!(err, RuntimeError::TurnLimit(8)));
    }

    #[test]
    fn cleanup_detaches_everything() {
        let runtime = Runtime::new();
        runtime.events().subscribe(EventKind::RenderFlush, |_| {});
        runtime.request_render(RenderReason::External, None);
        assert_eq!(runtime.queue().len(), 1);

        runtime.cleanup();

        assert!(runtime.queue().is_empty());
        assert!(!runtime.scheduler().is_attached());
        assert!(!runtime.events().has_listeners(EventKind::RenderFlush));

        runtime.request_render(RenderReason::External, None);
        assert!(runtime.queue().is_empty());
    }
}
