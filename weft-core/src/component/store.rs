//! Component Store
//!
//! The store exclusively owns one [`ComponentRecord`] per mounted component:
//! its hook slots, effect slots, last props and the location of its output in
//! the document. The hook engine and the reconciler reach records only through
//! the accessors below and never keep copies.
//!
//! # Invocation Frames
//!
//! While a component body runs, the store holds an invocation frame for it:
//! the component ID plus a hook cursor. Each hook call takes the next index
//! from the cursor, which is how slot *i* keeps meaning the same hook from one
//! render to the next.
//!
//! Frames live on a stack. Beginning an invocation pushes one and returns an
//! [`InvocationScope`] guard that pops it when dropped, so the frame is cleared
//! even if the body returns early with an error or panics.
//!
//! # Locking
//!
//! All state sits behind one mutex. It is only ever held for short,
//! non-reentrant sections; user code (component bodies, effect cleanups) never
//! runs while it is held.

use std::any::Any;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;

use super::{Component, ComponentId, ComponentOutput, FragmentBoundary};
use crate::dom::NodeId;
use crate::element::Props;
use crate::error::{Result, RuntimeError};
use crate::hooks::Dependencies;

/// Cleanup callback returned by an effect.
pub type Cleanup = Box<dyn FnOnce() + Send>;

/// Persistent per-call-order hook storage.
///
/// The payloads are type-erased; the hook engine downcasts them back to the
/// concrete cell type it allocated.
#[derive(Clone)]
pub enum HookSlot {
    State(Arc<dyn Any + Send + Sync>),
    Ref(Arc<dyn Any + Send + Sync>),
}

impl std::fmt::Debug for HookSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookSlot::State(_) => f.write_str("State(..)"),
            HookSlot::Ref(_) => f.write_str("Ref(..)"),
        }
    }
}

/// Bookkeeping for one `use_effect` call site.
pub struct EffectSlot {
    /// Dependencies the effect last ran with. `None` means "rerun every render".
    pub dependencies: Option<Dependencies>,
    /// Cleanup returned by the last run, if any.
    pub cleanup: Option<Cleanup>,
}

impl std::fmt::Debug for EffectSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectSlot")
            .field("dependencies", &self.dependencies)
            .field("has_cleanup", &self.cleanup.is_some())
            .finish()
    }
}

/// Everything the runtime remembers about one mounted component.
pub struct ComponentRecord {
    component: Component,
    hooks: Vec<Option<HookSlot>>,
    effects: Vec<Option<EffectSlot>>,
    output: Option<ComponentOutput>,
    last_props: Props,
    /// Components rendered directly by the last successful build.
    children: IndexSet<ComponentId>,
}

impl ComponentRecord {
    fn new(component: Component, props: Props) -> Self {
        Self {
            component,
            hooks: Vec::new(),
            effects: Vec::new(),
            output: None,
            last_props: props,
            children: IndexSet::new(),
        }
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn hook(&self, index: usize) -> Option<&HookSlot> {
        self.hooks.get(index).and_then(Option::as_ref)
    }

    pub fn set_hook(&mut self, index: usize, slot: HookSlot) {
        if self.hooks.len() <= index {
            self.hooks.resize(index + 1, None);
        }
        self.hooks[index] = Some(slot);
    }

    pub fn effect(&self, index: usize) -> Option<&EffectSlot> {
        self.effects.get(index).and_then(Option::as_ref)
    }

    pub fn effect_mut(&mut self, index: usize) -> Option<&mut EffectSlot> {
        self.effects.get_mut(index).and_then(Option::as_mut)
    }

    pub fn set_effect(&mut self, index: usize, slot: EffectSlot) {
        if self.effects.len() <= index {
            self.effects.resize_with(index + 1, || None);
        }
        self.effects[index] = Some(slot);
    }

    pub fn output(&self) -> Option<ComponentOutput> {
        self.output
    }

    pub fn last_props(&self) -> &Props {
        &self.last_props
    }

    /// Remove every pending cleanup, paired with its hook index.
    fn take_cleanups(&mut self) -> Vec<(usize, Cleanup)> {
        self.effects
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| {
                slot.as_mut()
                    .and_then(|slot| slot.cleanup.take())
                    .map(|cleanup| (index, cleanup))
            })
            .collect()
    }
}

impl std::fmt::Debug for ComponentRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRecord")
            .field("component", &self.component)
            .field("hooks", &self.hooks)
            .field("effects", &self.effects)
            .field("output", &self.output)
            .field("children", &self.children)
            .finish()
    }
}

#[derive(Debug)]
struct Frame {
    component: ComponentId,
    cursor: usize,
}

#[derive(Default)]
struct StoreState {
    records: IndexMap<ComponentId, ComponentRecord>,
    frames: Vec<Frame>,
}

/// Owner of all component records of one runtime.
#[derive(Default)]
pub struct ComponentStore {
    state: Mutex<StoreState>,
}

impl ComponentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start invoking `component` with `props`.
    ///
    /// Creates the record on first use, stores `props` as the last known
    /// props and makes the record current with a fresh hook cursor. The
    /// returned guard ends the invocation when dropped.
    pub fn begin_invocation(&self, component: &Component, props: Props) -> InvocationScope<'_> {
        let id = component.id();
        let mut state = self.state.lock();

        let record = state
            .records
            .entry(id)
            .or_insert_with(|| ComponentRecord::new(component.clone(), Props::new()));
        record.last_props = props;
        let first_render = record.output.is_none();

        state.frames.push(Frame {
            component: id,
            cursor: 0,
        });

        InvocationScope {
            store: self,
            component: id,
            first_render,
        }
    }

    /// Pop the innermost invocation frame.
    ///
    /// Prefer dropping the [`InvocationScope`]; this exists for callers that
    /// manage frames by hand.
    pub fn end_invocation(&self) -> Option<ComponentId> {
        self.state.lock().frames.pop().map(|frame| frame.component)
    }

    fn end_frame(&self, component: ComponentId) {
        let mut state = self.state.lock();
        // The frame may already be gone if the record was removed mid-invocation.
        if let Some(position) = state
            .frames
            .iter()
            .rposition(|frame| frame.component == component)
        {
            state.frames.remove(position);
        }
    }

    /// The component currently being invoked, if any.
    pub fn current(&self) -> Option<ComponentId> {
        self.state.lock().frames.last().map(|frame| frame.component)
    }

    /// Take the next hook index of the current invocation.
    pub fn next_hook_index(&self, hook: &'static str) -> Result<(ComponentId, usize)> {
        let mut state = self.state.lock();
        let frame = state
            .frames
            .last_mut()
            .ok_or(RuntimeError::HookOutsideComponent { hook })?;

        let index = frame.cursor;
        frame.cursor += 1;
        Ok((frame.component, index))
    }

    /// Run `f` against the record of `id` while holding the store lock.
    ///
    /// `f` must not call back into the store.
    pub fn with_record<R>(
        &self,
        id: ComponentId,
        f: impl FnOnce(&mut ComponentRecord) -> R,
    ) -> Option<R> {
        self.state.lock().records.get_mut(&id).map(f)
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.state.lock().records.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// IDs of all records, in creation order.
    pub fn ids(&self) -> Vec<ComponentId> {
        self.state.lock().records.keys().copied().collect()
    }

    pub fn output(&self, id: ComponentId) -> Option<ComponentOutput> {
        self.state.lock().records.get(&id).and_then(|r| r.output)
    }

    pub fn last_props(&self, id: ComponentId) -> Option<Props> {
        self.state.lock().records.get(&id).map(|r| r.last_props.clone())
    }

    pub fn component(&self, id: ComponentId) -> Option<Component> {
        self.state.lock().records.get(&id).map(|r| r.component.clone())
    }

    /// Everything needed to re-invoke a mounted component in place.
    pub fn instance(&self, id: ComponentId) -> Option<(Component, Props, Option<ComponentOutput>)> {
        self.state
            .lock()
            .records
            .get(&id)
            .map(|r| (r.component.clone(), r.last_props.clone(), r.output))
    }

    /// Components `id` rendered directly, in render order.
    pub fn children(&self, id: ComponentId) -> Vec<ComponentId> {
        self.state
            .lock()
            .records
            .get(&id)
            .map(|r| r.children.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn set_children(&self, id: ComponentId, children: IndexSet<ComponentId>) {
        if let Some(record) = self.state.lock().records.get_mut(&id) {
            record.children = children;
        }
    }

    /// Record a single-node output, clearing any fragment boundary.
    pub fn set_output_node(&self, id: ComponentId, node: NodeId) {
        if let Some(record) = self.state.lock().records.get_mut(&id) {
            record.output = Some(ComponentOutput::Node(node));
        }
    }

    /// Record a fragment output, clearing any single node.
    pub fn set_output_fragment(&self, id: ComponentId, boundary: FragmentBoundary) {
        if let Some(record) = self.state.lock().records.get_mut(&id) {
            record.output = Some(ComponentOutput::Fragment(boundary));
        }
    }

    /// Detach every pending effect cleanup of `id` so the caller can run them.
    pub fn take_effect_cleanups(&self, id: ComponentId) -> Vec<(usize, Cleanup)> {
        self.state
            .lock()
            .records
            .get_mut(&id)
            .map(ComponentRecord::take_cleanups)
            .unwrap_or_default()
    }

    /// Delete the record of `id`. Pending cleanups are dropped without running.
    pub fn remove(&self, id: ComponentId) -> Option<ComponentRecord> {
        let mut state = self.state.lock();
        state.frames.retain(|frame| frame.component != id);
        state.records.shift_remove(&id)
    }

    /// Run every pending effect cleanup, then forget all records.
    pub fn teardown_all(&self) {
        let records = {
            let mut state = self.state.lock();
            state.frames.clear();
            std::mem::take(&mut state.records)
        };

        tracing::debug!(records = records.len(), "tearing down component store");

        for (_, mut record) in records {
            for (_, cleanup) in record.take_cleanups() {
                cleanup();
            }
        }
    }
}

impl std::fmt::Debug for ComponentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ComponentStore")
            .field("records", &state.records.len())
            .field("frames", &state.frames)
            .finish()
    }
}

/// Guard for an active component invocation.
///
/// Ends the invocation when dropped.
pub struct InvocationScope<'a> {
    store: &'a ComponentStore,
    component: ComponentId,
    first_render: bool,
}

impl InvocationScope<'_> {
    pub fn component(&self) -> ComponentId {
        self.component
    }

    /// Whether the record had no output when the invocation began.
    pub fn first_render(&self) -> bool {
        self.first_render
    }
}

impl Drop for InvocationScope<'_> {
    fn drop(&mut self) {
        self.store.end_frame(self.component);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn component(name: &str) -> Component {
        Component::new(name, |_, _| Ok(Element::text("")))
    }

    #[test]
    fn begin_creates_record_and_resets_cursor() {
        let store = ComponentStore::new();
        let c = component("A");

        {
            let scope = store.begin_invocation(&c, Props::new());
            assert!(scope.first_render());
            assert_eq!(store.next_hook_index("test").unwrap(), (c.id(), 0));
            assert_eq!(store.next_hook_index("test").unwrap(), (c.id(), 1));
        }

        assert!(store.contains(c.id()));
        assert_eq!(store.current(), None);

        let _scope = store.begin_invocation(&c, Props::new());
        assert_eq!(store.next_hook_index("test").unwrap(), (c.id(), 0));
    }

    #[test]
    fn hook_index_outside_invocation_is_misuse() {
        let store = ComponentStore::new();
        let err = store.next_hook_index("use_state").unwrap_err();
        assert!(matches!(err, RuntimeError::HookOutsideComponent { hook: "use_state" }));
        assert_eq!(err.to_string(), "use_state called outside component");
    }

    #[test]
    fn nested_invocations_restore_outer_frame() {
        let store = ComponentStore::new();
        let outer = component("Outer");
        let inner = component("Inner");

        let _outer_scope = store.begin_invocation(&outer, Props::new());
        store.next_hook_index("test").unwrap();

        {
            let _inner_scope = store.begin_invocation(&inner, Props::new());
            assert_eq!(store.current(), Some(inner.id()));
            assert_eq!(store.next_hook_index("test").unwrap(), (inner.id(), 0));
        }

        assert_eq!(store.current(), Some(outer.id()));
        assert_eq!(store.next_hook_index("test").unwrap(), (outer.id(), 1));
    }

    #[test]
    fn last_props_are_recorded() {
        let store = ComponentStore::new();
        let c = component("A");

        drop(store.begin_invocation(&c, Props::new().attr("label", "one")));
        drop(store.begin_invocation(&c, Props::new().attr("label", "two")));

        let props = store.last_props(c.id()).unwrap();
        assert_eq!(props.text("label"), Some("two"));
    }

    #[test]
    fn output_setters_are_exclusive() {
        let store = ComponentStore::new();
        let c = component("A");
        drop(store.begin_invocation(&c, Props::new()));

        let node = NodeId::new();
        let boundary = FragmentBoundary {
            start: NodeId::new(),
            end: NodeId::new(),
        };

        store.set_output_fragment(c.id(), boundary);
        assert_eq!(store.output(c.id()), Some(ComponentOutput::Fragment(boundary)));

        store.set_output_node(c.id(), node);
        assert_eq!(store.output(c.id()), Some(ComponentOutput::Node(node)));

        let scope = store.begin_invocation(&c, Props::new());
        assert!(!scope.first_render());
    }

    #[test]
    fn teardown_runs_every_cleanup() {
        let store = ComponentStore::new();
        let runs = Arc::new(AtomicUsize::new(0));

        for name in ["A", "B"] {
            let c = component(name);
            drop(store.begin_invocation(&c, Props::new()));
            for index in [0, 2] {
                let runs = runs.clone();
                store.with_record(c.id(), |record| {
                    record.set_effect(
                        index,
                        EffectSlot {
                            dependencies: None,
                            cleanup: Some(Box::new(move || {
                                runs.fetch_add(1, Ordering::SeqCst);
                            })),
                        },
                    );
                });
            }
        }

        store.teardown_all();
        assert_eq!(runs.load(Ordering::SeqCst), 4);
        assert!(store.is_empty());
    }

    #[test]
    fn remove_drops_record_and_frame() {
        let store = ComponentStore::new();
        let c = component("A");

        let scope = store.begin_invocation(&c, Props::new());
        assert!(store.remove(c.id()).is_some());
        assert_eq!(store.current(), None);
        drop(scope);
        assert!(!store.contains(c.id()));
    }
}
