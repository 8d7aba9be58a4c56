//! Document Nodes
//!
//! This module defines the node types stored in a [`Document`](super::Document).

use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Unique identifier for a document node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// The kind of node in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// An element with a tag name. The only kind that has children.
    Element { tag: String },

    /// A text node.
    Text(String),

    /// A comment. The reconciler uses comments as fragment boundary markers.
    Comment(String),
}

/// A node in the document tree.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: IndexMap<String, String>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: NodeId::new(),
            kind,
            parent: None,
            children: Vec::new(),
            attributes: IndexMap::new(),
        }
    }

    pub fn element(tag: impl Into<String>) -> Self {
        Self::new(NodeKind::Element { tag: tag.into() })
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new(NodeKind::Text(value.into()))
    }

    pub fn comment(value: impl Into<String>) -> Self {
        Self::new(NodeKind::Comment(value.into()))
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Tag name for elements.
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag } => Some(tag),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    pub(crate) fn set_attribute(&mut self, name: String, value: String) {
        self.attributes.insert(name, value);
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    pub(crate) fn position_of(&self, child: NodeId) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }

    pub(crate) fn insert_child(&mut self, index: usize, child: NodeId) {
        self.children.insert(index, child);
    }

    /// Remove `child` from the child list, returning its former position.
    pub(crate) fn remove_child(&mut self, child: NodeId) -> Option<usize> {
        let position = self.position_of(child)?;
        self.children.remove(position);
        Some(position)
    }

    pub(crate) fn take_children(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn element_exposes_tag() {
        let node = Node::element("div");
        assert_eq!(node.tag(), Some("div"));
        assert!(Node::text("x").tag().is_none());
    }

    #[test]
    fn child_list_management() {
        let mut node = Node::element("ul");
        let a = NodeId::new();
        let b = NodeId::new();
        let c = NodeId::new();

        node.insert_child(0, a);
        node.insert_child(1, c);
        node.insert_child(1, b);
        assert_eq!(node.children(), &[a, b, c]);

        assert_eq!(node.remove_child(b), Some(1));
        assert_eq!(node.remove_child(b), None);
        assert_eq!(node.children(), &[a, c]);
    }
}
