//! Components
//!
//! A component is a render function registered once under an opaque
//! [`ComponentId`]. The id, not the closure, is the component's identity: the
//! [`ComponentStore`] keys its records by it, the scheduler tracks dirty
//! components by it, and events report it.
//!
//! Registering the same closure twice yields two distinct components with
//! independent state.

mod store;

pub use store::{
    Cleanup, ComponentRecord, ComponentStore, EffectSlot, HookSlot, InvocationScope,
};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dom::NodeId;
use crate::element::{Element, Props};
use crate::error::Result;
use crate::hooks::Hooks;

/// Unique identifier for a registered component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(u64);

impl ComponentId {
    /// Issue a new process-unique component ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ComponentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

/// Signature of a component body.
pub type RenderFn = dyn Fn(&Hooks, &Props) -> Result<Element> + Send + Sync;

/// A registered component.
///
/// Cheap to clone; clones share the identity and the render function.
///
/// ```rust
/// use weft_core::{create_element, Component, Props};
///
/// let greeting = Component::new("Greeting", |_hooks, props| {
///     let name = props.text("name").unwrap_or("world").to_string();
///     Ok(create_element("p", Props::new().child(format!("hello {name}"))))
/// });
/// assert_eq!(greeting.name(), "Greeting");
/// ```
#[derive(Clone)]
pub struct Component {
    id: ComponentId,
    name: Arc<str>,
    render: Arc<RenderFn>,
}

impl Component {
    pub fn new<F>(name: impl Into<Arc<str>>, render: F) -> Self
    where
        F: Fn(&Hooks, &Props) -> Result<Element> + Send + Sync + 'static,
    {
        Self {
            id: ComponentId::new(),
            name: name.into(),
            render: Arc::new(render),
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Display name, used for fragment marker labels and logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the component body.
    ///
    /// Callers are responsible for opening an invocation scope first;
    /// otherwise every hook the body calls fails with
    /// [`HookOutsideComponent`](crate::RuntimeError::HookOutsideComponent).
    pub fn invoke(&self, hooks: &Hooks, props: &Props) -> Result<Element> {
        (self.render)(hooks, props)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Component {}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Pair of comment markers bracketing a multi-node component output.
///
/// The markers are created on the component's first fragment render and
/// survive instance updates; only the nodes between them are replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FragmentBoundary {
    pub start: NodeId,
    pub end: NodeId,
}

/// Where a mounted component's output lives in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentOutput {
    Node(NodeId),
    Fragment(FragmentBoundary),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_ids_are_unique() {
        let a = ComponentId::new();
        let b = ComponentId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn same_body_registered_twice_is_two_components() {
        fn body(_: &Hooks, _: &Props) -> Result<Element> {
            Ok(Element::text("x"))
        }

        let first = Component::new("Body", body);
        let second = Component::new("Body", body);
        assert_ne!(first, second);
        assert_eq!(first.clone(), first);
    }
}
