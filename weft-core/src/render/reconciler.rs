//! Reconciler
//!
//! Applies component output to the document. There are two ways in:
//!
//! 1. **Root render.** The container is cleared and the whole tree is built
//!    again from the root element. Every component in it is invoked.
//!
//! 2. **Instance update.** One mounted component is re-invoked with the props
//!    it last received and its output is swapped in place: a single node is
//!    replaced, a fragment has everything between its two boundary markers
//!    replaced. The rest of the document is untouched.
//!
//! An instance update that cannot be applied (the output moved from a single
//! node to a fragment or back, or the old output is no longer attached)
//! reports `false`. A batch of updates that saw any such failure, or that
//! included the root component itself, ends with exactly one root render.
//!
//! # Lifecycle
//!
//! A component record is created on first invocation and announced with
//! `component:mounted`. It is unmounted (pending effect cleanups run, then
//! `component:unmounted`) when a root render replaces it with a different
//! root, when a root pass completes without visiting it, or when an instance
//! update of its parent no longer renders it. Unmounting a component also
//! unmounts the components it rendered.

use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexSet;
use parking_lot::Mutex;
use tracing::debug;

use crate::component::{Component, ComponentId, ComponentOutput, ComponentStore, FragmentBoundary};
use crate::config::RuntimeConfig;
use crate::dom::{Built, NodeBuilder, NodeId};
use crate::element::{Element, Props};
use crate::error::Result;
use crate::events::{ComponentMounted, ComponentUnmounted, EffectCleanup, EventBus};
use crate::hooks::Hooks;

/// The element and container of the last root render.
#[derive(Debug, Clone)]
struct RootRender {
    element: Element,
    container: NodeId,
}

/// Drives component invocation and document updates for one runtime.
pub struct Reconciler {
    store: Arc<ComponentStore>,
    builder: Arc<dyn NodeBuilder>,
    hooks: Hooks,
    events: EventBus,
    config: RuntimeConfig,
    root: Mutex<Option<RootRender>>,
    /// Components invoked during the root pass in progress.
    visited: Mutex<Option<IndexSet<ComponentId>>>,
    /// For each component build in progress, the components it invoked directly.
    owners: Mutex<Vec<IndexSet<ComponentId>>>,
}

impl Reconciler {
    pub fn new(hooks: Hooks, builder: Arc<dyn NodeBuilder>, config: RuntimeConfig) -> Self {
        Self {
            store: Arc::clone(hooks.store()),
            events: hooks.events().clone(),
            builder,
            hooks,
            config,
            root: Mutex::new(None),
            visited: Mutex::new(None),
            owners: Mutex::new(Vec::new()),
        }
    }

    pub fn builder(&self) -> &Arc<dyn NodeBuilder> {
        &self.builder
    }

    /// Run a component body inside an invocation scope.
    ///
    /// Returns the element it produced and whether this was its first render.
    fn invoke(&self, component: &Component, props: &Props) -> Result<(Element, bool)> {
        let scope = self.store.begin_invocation(component, props.clone());
        let first_render = scope.first_render();
        let element = component.invoke(&self.hooks, props)?;
        drop(scope);

        if let Some(visited) = self.visited.lock().as_mut() {
            visited.insert(component.id());
        }
        Ok((element, first_render))
    }

    fn build(&self, element: &Element) -> Result<Built> {
        self.builder
            .build(element, &mut |component: &Component, props: &Props| {
                self.render_component(component, props)
            })
    }

    /// Build a component's output, collecting the components it renders
    /// directly.
    fn build_owned(&self, element: &Element) -> (Result<Built>, IndexSet<ComponentId>) {
        self.owners.lock().push(IndexSet::new());
        let built = self.build(element);
        let children = self.owners.lock().pop().unwrap_or_default();
        (built, children)
    }

    /// Invoke `component` as part of a build and record where its output went.
    ///
    /// A multi-node result is wrapped in a fresh pair of boundary markers, which
    /// are included in the returned fragment.
    pub fn render_component(&self, component: &Component, props: &Props) -> Result<Built> {
        let id = component.id();
        if let Some(siblings) = self.owners.lock().last_mut() {
            siblings.insert(id);
        }
        let (element, first_render) = self.invoke(component, props)?;

        let (built, children) = self.build_owned(&element);
        let built = built?;
        if self.visited.lock().is_some() {
            // Root passes leave unmounting to the sweep.
            self.store.set_children(id, children);
        } else {
            self.adopt_children(id, children);
        }

        let (built, output) = match built {
            Built::Node(node) => {
                self.store.set_output_node(id, node);
                (Built::Node(node), ComponentOutput::Node(node))
            }
            Built::Fragment(nodes) => {
                let prefix = &self.config.marker_prefix;
                let name = component.name();
                let boundary = FragmentBoundary {
                    start: self.builder.create_marker(&format!("{prefix}:{name}:start")),
                    end: self.builder.create_marker(&format!("{prefix}:{name}:end")),
                };
                self.store.set_output_fragment(id, boundary);

                let mut wrapped = Vec::with_capacity(nodes.len() + 2);
                wrapped.push(boundary.start);
                wrapped.extend(nodes);
                wrapped.push(boundary.end);
                (Built::Fragment(wrapped), ComponentOutput::Fragment(boundary))
            }
        };

        if first_render {
            debug!(component = %id, name = component.name(), "mounted");
            self.events.publish(ComponentMounted {
                component: id,
                output,
                timestamp: self.events.now(),
            });
        }

        Ok(built)
    }

    /// Re-invoke one mounted component and swap its output in place.
    ///
    /// Returns `false` when the update cannot be applied and a root render is
    /// needed instead. Component errors are returned as errors.
    pub fn rerender_instance(&self, id: ComponentId) -> Result<bool> {
        let Some((component, props, output)) = self.store.instance(id) else {
            return Ok(false);
        };

        match output {
            None => Ok(false),
            Some(ComponentOutput::Node(old)) => {
                if self.builder.parent(old).is_none() {
                    return Ok(false);
                }

                let (element, _) = self.invoke(&component, &props)?;
                let (built, children) = self.build_owned(&element);
                match built? {
                    Built::Node(new) => {
                        self.builder.replace_in_place(old, new)?;
                        self.store.set_output_node(id, new);
                        self.adopt_children(id, children);
                        Ok(true)
                    }
                    Built::Fragment(nodes) => {
                        debug!(component = %id, "single node became a fragment");
                        self.discard_all(nodes);
                        Ok(false)
                    }
                }
            }
            Some(ComponentOutput::Fragment(boundary)) => {
                let Some(parent) = self.builder.parent(boundary.start) else {
                    return Ok(false);
                };

                let (element, _) = self.invoke(&component, &props)?;
                let (built, children) = self.build_owned(&element);
                match built? {
                    Built::Fragment(nodes) => {
                        self.builder
                            .remove_between(boundary.start, boundary.end, parent)?;
                        for node in nodes {
                            self.builder.insert_before(parent, node, boundary.end)?;
                        }
                        self.adopt_children(id, children);
                        Ok(true)
                    }
                    Built::Node(node) => {
                        debug!(component = %id, "fragment became a single node");
                        self.builder.discard(node);
                        Ok(false)
                    }
                }
            }
        }
    }

    /// Record the children of an updated component, unmounting those it no
    /// longer renders.
    fn adopt_children(&self, id: ComponentId, children: IndexSet<ComponentId>) {
        let dropped: Vec<ComponentId> = self
            .store
            .children(id)
            .into_iter()
            .filter(|child| !children.contains(child))
            .collect();
        self.store.set_children(id, children);

        for child in dropped {
            self.unmount(child);
        }
    }

    fn discard_all(&self, nodes: Vec<NodeId>) {
        for node in nodes {
            self.builder.discard(node);
        }
    }

    /// Render `element` as the new root of `container`.
    ///
    /// If the previous root was a component and `element` is not that same
    /// component, the previous root is unmounted first.
    pub fn render(&self, element: Element, container: NodeId) -> Result<()> {
        let previous = self.root.lock().replace(RootRender {
            element: element.clone(),
            container,
        });

        if let Some(previous) = previous.and_then(|root| root.element.component_id()) {
            if element.component_id() != Some(previous) {
                self.unmount(previous);
            }
        }

        self.render_pass(&element, container)
    }

    fn render_pass(&self, element: &Element, container: NodeId) -> Result<()> {
        let started = Instant::now();
        self.builder.clear(container)?;

        *self.visited.lock() = Some(IndexSet::new());
        let built = self.build(element);
        let visited = self.visited.lock().take().unwrap_or_default();

        for node in built?.into_nodes() {
            self.builder.append(container, node)?;
        }

        if self.config.sweep_unvisited {
            for id in self.store.ids() {
                if !visited.contains(&id) {
                    self.unmount(id);
                }
            }
        }

        debug!(
            components = visited.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "root pass complete"
        );
        Ok(())
    }

    /// Replay the last root render. A no-op before the first one.
    pub fn rerender(&self) -> Result<()> {
        let root = self.root.lock().clone();
        match root {
            Some(root) => self.render_pass(&root.element, root.container),
            None => Ok(()),
        }
    }

    /// Update each component in place, falling back to one root render.
    ///
    /// Duplicates are ignored. The root component always falls back, as does
    /// every component whose instance update fails. Returns the components
    /// that fell back.
    pub fn rerender_components(&self, ids: &[ComponentId]) -> Result<Vec<ComponentId>> {
        let root_component = self.root_component();
        let mut seen = IndexSet::with_capacity(ids.len());
        let mut fallback = Vec::new();

        for &id in ids {
            if !seen.insert(id) {
                continue;
            }
            if root_component == Some(id) || !self.rerender_instance(id)? {
                fallback.push(id);
            }
        }

        if !fallback.is_empty() {
            debug!(?fallback, "falling back to a root render");
            self.rerender()?;
        }
        Ok(fallback)
    }

    /// Unmount a component: run and announce its pending effect cleanups,
    /// drop its record, then announce the unmount. The components it rendered
    /// are unmounted after it.
    ///
    /// Returns `false` if there was no record.
    pub fn unmount(&self, id: ComponentId) -> bool {
        if !self.store.contains(id) {
            return false;
        }
        let children = self.store.children(id);

        for (hook_index, cleanup) in self.store.take_effect_cleanups(id) {
            self.events.publish(EffectCleanup {
                component: id,
                hook_index,
                timestamp: self.events.now(),
            });
            cleanup();
        }

        self.store.remove(id);
        debug!(component = %id, "unmounted");
        self.events.publish(ComponentUnmounted {
            component: id,
            timestamp: self.events.now(),
        });

        for child in children {
            self.unmount(child);
        }
        true
    }

    /// The component at the root, if the last root render was a component.
    pub fn root_component(&self) -> Option<ComponentId> {
        self.root
            .lock()
            .as_ref()
            .and_then(|root| root.element.component_id())
    }

    /// Container of the last root render.
    pub fn container(&self) -> Option<NodeId> {
        self.root.lock().as_ref().map(|root| root.container)
    }

    /// Forget the root.
    pub fn reset(&self) {
        self.root.lock().take();
        self.visited.lock().take();
        self.owners.lock().clear();
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("root", &self.root_component())
            .field("container", &self.container())
            .finish_non_exhaustive()
    }
}
