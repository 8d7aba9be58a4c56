//! Node Builder
//!
//! Turns an [`Element`] description into document nodes. Components met along
//! the way are handed back to the caller through a render callback, so the
//! reconciler stays in charge of invocation scopes and component records
//! while the builder only knows about nodes.
//!
//! [`NodeBuilder`] is the seam for other backends. [`DomBuilder`] implements
//! it over the in-memory [`Document`].

use std::sync::Arc;

use serde::Serialize;

use super::document::Document;
use super::node::NodeId;
use crate::component::Component;
use crate::element::{Element, PropValue, Props};
use crate::error::{Result, RuntimeError};
use crate::events::{EventBus, EventKind, NodeCreated};

/// Result of building one element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Built {
    /// Exactly one top-level node.
    Node(NodeId),
    /// A flat, ordered list of top-level nodes. May be empty.
    Fragment(Vec<NodeId>),
}

impl Built {
    pub fn nodes(&self) -> &[NodeId] {
        match self {
            Built::Node(node) => std::slice::from_ref(node),
            Built::Fragment(nodes) => nodes,
        }
    }

    pub fn into_nodes(self) -> Vec<NodeId> {
        match self {
            Built::Node(node) => vec![node],
            Built::Fragment(nodes) => nodes,
        }
    }

    pub fn is_fragment(&self) -> bool {
        matches!(self, Built::Fragment(_))
    }
}

/// Callback the builder uses to render a nested component.
pub type RenderComponent<'a> = dyn FnMut(&Component, &Props) -> Result<Built> + 'a;

/// Document operations the reconciler relies on.
pub trait NodeBuilder: Send + Sync {
    /// Build `element`, delegating component references to `render_component`.
    ///
    /// On error, nodes created by the failed build are discarded.
    fn build(&self, element: &Element, render_component: &mut RenderComponent<'_>)
        -> Result<Built>;

    /// Create a detached comment node used as a fragment boundary.
    fn create_marker(&self, label: &str) -> NodeId;

    /// Current parent of `node`, `None` when detached or unknown.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Swap `old` for `new` at the same position and discard `old`.
    fn replace_in_place(&self, old: NodeId, new: NodeId) -> Result<()>;

    /// Insert `node` under `parent` right before `reference`.
    fn insert_before(&self, parent: NodeId, node: NodeId, reference: NodeId) -> Result<()>;

    /// Discard every sibling strictly between `start` and `end`.
    fn remove_between(&self, start: NodeId, end: NodeId, parent: NodeId) -> Result<()>;

    /// Append `node` as the last child of `parent`.
    fn append(&self, parent: NodeId, node: NodeId) -> Result<()>;

    /// Discard every child of `container`.
    fn clear(&self, container: NodeId) -> Result<()>;

    /// Delete a node and its subtree.
    fn discard(&self, node: NodeId);
}

/// [`NodeBuilder`] over an in-memory [`Document`].
pub struct DomBuilder {
    document: Arc<Document>,
    events: Option<EventBus>,
}

impl DomBuilder {
    pub fn new(document: Arc<Document>) -> Self {
        Self {
            document,
            events: None,
        }
    }

    /// Publish `dom:node-created` on `events` for every element built.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    /// Apply props to a freshly created element.
    ///
    /// `on<event>` listeners register for the lower-cased event name, `ref`
    /// receives the node, `className` is written as `class`, and every other
    /// plain value becomes a string attribute.
    fn bind(&self, node: NodeId, props: &Props) -> Result<()> {
        for (key, value) in props.attrs() {
            match value {
                PropValue::Ref(node_ref) if key == "ref" => node_ref.set(Some(node)),
                PropValue::Listener(handler) => {
                    if let Some(event) = key.strip_prefix("on").filter(|e| !e.is_empty()) {
                        self.document
                            .add_listener(node, event.to_lowercase(), Arc::clone(handler))?;
                    }
                }
                value => {
                    let Some(attribute) = value.as_attribute() else {
                        continue;
                    };
                    let name = if key == "className" { "class" } else { key };
                    self.document.set_attribute(node, name, attribute)?;
                }
            }
        }
        Ok(())
    }

    /// Bind `props` to `node` and build its children into it.
    fn fill(
        &self,
        node: NodeId,
        props: &Props,
        render_component: &mut RenderComponent<'_>,
    ) -> Result<()> {
        self.bind(node, props)?;
        for child in props.children() {
            let mut built = self.build(child, render_component)?.into_nodes().into_iter();
            while let Some(child_node) = built.next() {
                if let Err(err) = self.document.append_child(node, child_node) {
                    self.document.discard(child_node);
                    built.for_each(|rest| self.document.discard(rest));
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    fn notify(&self, element: &Element, built: &Built) {
        let Some(events) = &self.events else {
            return;
        };
        if !events.has_listeners(EventKind::NodeCreated) {
            return;
        }
        events.publish(NodeCreated {
            description: element.describe(),
            node: built.clone(),
            timestamp: events.now(),
        });
    }
}

impl NodeBuilder for DomBuilder {
    fn build(
        &self,
        element: &Element,
        render_component: &mut RenderComponent<'_>,
    ) -> Result<Built> {
        let built = match element {
            Element::Text(value) => Built::Node(self.document.create_text(value.as_str())),
            Element::Component { component, props } => render_component(component, props)?,
            Element::Fragment(children) => {
                let mut nodes = Vec::with_capacity(children.len());
                for child in children {
                    match self.build(child, render_component) {
                        Ok(built) => nodes.extend(built.into_nodes()),
                        Err(err) => {
                            nodes.into_iter().for_each(|node| self.document.discard(node));
                            return Err(err);
                        }
                    }
                }
                Built::Fragment(nodes)
            }
            Element::Intrinsic { tag, props } => {
                let node = self.document.create_element(tag.as_str());
                if let Err(err) = self.fill(node, props, render_component) {
                    self.document.discard(node);
                    return Err(err);
                }
                Built::Node(node)
            }
        };

        self.notify(element, &built);
        Ok(built)
    }

    fn create_marker(&self, label: &str) -> NodeId {
        self.document.create_comment(label)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.document.parent(node)
    }

    fn replace_in_place(&self, old: NodeId, new: NodeId) -> Result<()> {
        let parent = self
            .document
            .parent(old)
            .ok_or(RuntimeError::Detached(old))?;
        self.document.replace_child(parent, new, old)?;
        self.document.discard(old);
        Ok(())
    }

    fn insert_before(&self, parent: NodeId, node: NodeId, reference: NodeId) -> Result<()> {
        self.document.insert_before(parent, node, Some(reference))
    }

    fn remove_between(&self, start: NodeId, end: NodeId, parent: NodeId) -> Result<()> {
        for node in self.document.remove_between(parent, start, end)? {
            self.document.discard(node);
        }
        Ok(())
    }

    fn append(&self, parent: NodeId, node: NodeId) -> Result<()> {
        self.document.append_child(parent, node)
    }

    fn clear(&self, container: NodeId) -> Result<()> {
        for node in self.document.clear_children(container)? {
            self.document.discard(node);
        }
        Ok(())
    }

    fn discard(&self, node: NodeId) {
        self.document.discard(node);
    }
}

impl std::fmt::Debug for DomBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomBuilder")
            .field("document", &self.document)
            .field("events", &self.events.is_some())
            .finish()
    }
}
