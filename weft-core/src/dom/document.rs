//! In-memory Document
//!
//! A minimal document model: element, text and comment nodes in an arena,
//! with parent/child links, string attributes and per-node event listeners.
//! It is the default backend behind [`DomBuilder`](super::DomBuilder) and is
//! what the tests inspect.
//!
//! # Detach vs. Discard
//!
//! `remove_child` and friends only detach a node, exactly like the browser
//! DOM: the node keeps existing and can be re-inserted. `discard` deletes a
//! node and its whole subtree from the arena together with its listeners.
//! The builder discards everything it replaces, so a component record that
//! still points at a replaced node sees it as detached (`parent` is `None`)
//! and the reconciler falls back to a root render.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use smallvec::SmallVec;

use super::node::{Node, NodeId, NodeKind};
use crate::error::{Result, RuntimeError};

/// Event delivered to document listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    /// Lower-case event name, e.g. `"click"`.
    pub name: String,
    pub target: NodeId,
}

/// A listener bound to a document node.
pub type EventHandler = Arc<dyn Fn(&DomEvent) + Send + Sync>;

/// Arena-backed document tree.
#[derive(Default)]
pub struct Document {
    nodes: RwLock<HashMap<NodeId, Node>>,
    listeners: DashMap<NodeId, Vec<(String, EventHandler)>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, node: Node) -> NodeId {
        let id = node.id();
        self.nodes.write().insert(id, node);
        id
    }

    pub fn create_element(&self, tag: impl Into<String>) -> NodeId {
        self.insert(Node::element(tag))
    }

    pub fn create_text(&self, value: impl Into<String>) -> NodeId {
        self.insert(Node::text(value))
    }

    pub fn create_comment(&self, value: impl Into<String>) -> NodeId {
        self.insert(Node::comment(value))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.read().contains_key(&id)
    }

    /// Number of live nodes, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy of the node.
    pub fn node(&self, id: NodeId) -> Option<Node> {
        self.nodes.read().get(&id).cloned()
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.read().get(&id).map(|n| n.kind().clone())
    }

    pub fn tag(&self, id: NodeId) -> Option<String> {
        self.nodes
            .read()
            .get(&id)
            .and_then(|n| n.tag().map(str::to_string))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.read().get(&id).and_then(Node::parent)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .read()
            .get(&id)
            .map(|n| n.children().to_vec())
            .unwrap_or_default()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let nodes = self.nodes.read();
        let parent = nodes.get(&id)?.parent()?;
        let siblings = nodes.get(&parent)?.children();
        let position = siblings.iter().position(|&c| c == id)?;
        siblings.get(position + 1).copied()
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
        self.nodes
            .read()
            .get(&id)
            .and_then(|n| n.attribute(name).map(str::to_string))
    }

    pub fn set_attribute(
        &self,
        id: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        let mut nodes = self.nodes.write();
        node_mut(&mut nodes, id)?.set_attribute(name.into(), value.into());
        Ok(())
    }

    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `reference`, or last when
    /// `reference` is `None`. The child is detached from its old parent first.
    pub fn insert_before(
        &self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<()> {
        let mut nodes = self.nodes.write();
        node_mut(&mut nodes, parent)?;
        node_mut(&mut nodes, child)?;

        if is_ancestor(&nodes, child, parent) {
            return Err(RuntimeError::CyclicInsert {
                parent,
                node: child,
            });
        }

        if let Some(reference) = reference {
            if reference == child {
                return Ok(());
            }
            if nodes.get(&reference).and_then(Node::parent) != Some(parent) {
                return Err(RuntimeError::NotAChild {
                    parent,
                    node: reference,
                });
            }
        }

        detach(&mut nodes, child);

        let parent_node = node_mut(&mut nodes, parent)?;
        let index = match reference {
            Some(reference) => parent_node
                .position_of(reference)
                .ok_or(RuntimeError::NotAChild {
                    parent,
                    node: reference,
                })?,
            None => parent_node.children().len(),
        };
        parent_node.insert_child(index, child);
        node_mut(&mut nodes, child)?.set_parent(Some(parent));
        Ok(())
    }

    /// Detach `child` from `parent`.
    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let mut nodes = self.nodes.write();
        if nodes.get(&child).and_then(Node::parent) != Some(parent) {
            return Err(RuntimeError::NotAChild {
                parent,
                node: child,
            });
        }
        detach(&mut nodes, child);
        Ok(())
    }

    /// Put `new` where `old` is under `parent`; `old` ends up detached.
    pub fn replace_child(&self, parent: NodeId, new: NodeId, old: NodeId) -> Result<()> {
        if new == old {
            return Ok(());
        }

        let mut nodes = self.nodes.write();
        node_mut(&mut nodes, new)?;
        if nodes.get(&old).and_then(Node::parent) != Some(parent) {
            return Err(RuntimeError::NotAChild { parent, node: old });
        }
        if is_ancestor(&nodes, new, parent) {
            return Err(RuntimeError::CyclicInsert { parent, node: new });
        }

        detach(&mut nodes, new);

        let parent_node = node_mut(&mut nodes, parent)?;
        let index = parent_node
            .remove_child(old)
            .ok_or(RuntimeError::NotAChild { parent, node: old })?;
        parent_node.insert_child(index, new);

        node_mut(&mut nodes, old)?.set_parent(None);
        node_mut(&mut nodes, new)?.set_parent(Some(parent));
        Ok(())
    }

    /// Detach every child of `parent`, returning them in order.
    pub fn clear_children(&self, parent: NodeId) -> Result<Vec<NodeId>> {
        let mut nodes = self.nodes.write();
        let children = node_mut(&mut nodes, parent)?.take_children();
        for child in &children {
            if let Some(node) = nodes.get_mut(child) {
                node.set_parent(None);
            }
        }
        Ok(children)
    }

    /// Detach every sibling strictly between `start` and `end` under `parent`.
    pub fn remove_between(
        &self,
        parent: NodeId,
        start: NodeId,
        end: NodeId,
    ) -> Result<Vec<NodeId>> {
        let mut nodes = self.nodes.write();
        let parent_node = node_mut(&mut nodes, parent)?;
        let from = parent_node
            .position_of(start)
            .ok_or(RuntimeError::NotAChild {
                parent,
                node: start,
            })?;
        let to = parent_node
            .position_of(end)
            .ok_or(RuntimeError::NotAChild { parent, node: end })?;

        if to <= from + 1 {
            return Ok(Vec::new());
        }

        let removed: Vec<NodeId> = parent_node.children()[from + 1..to].to_vec();
        for id in &removed {
            detach(&mut nodes, *id);
        }
        Ok(removed)
    }

    /// Delete `id` and its subtree from the arena, along with their listeners.
    pub fn discard(&self, id: NodeId) {
        let removed = {
            let mut nodes = self.nodes.write();
            detach(&mut nodes, id);

            let mut removed = Vec::new();
            let mut stack = vec![id];
            while let Some(next) = stack.pop() {
                if let Some(mut node) = nodes.remove(&next) {
                    stack.extend(node.take_children());
                    removed.push(next);
                }
            }
            removed
        };

        for id in removed {
            self.listeners.remove(&id);
        }
    }

    /// Concatenated text of every text node below `id`. Comments are skipped.
    pub fn text_content(&self, id: NodeId) -> String {
        let nodes = self.nodes.read();
        let mut out = String::new();
        collect_text(&nodes, id, &mut out);
        out
    }

    /// Descendants of `root` with the given tag, in document order.
    pub fn query_all(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        let nodes = self.nodes.read();
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = nodes
            .get(&root)
            .map(|n| n.children().iter().rev().copied().collect())
            .unwrap_or_default();

        while let Some(id) = stack.pop() {
            if let Some(node) = nodes.get(&id) {
                if node.tag() == Some(tag) {
                    found.push(id);
                }
                stack.extend(node.children().iter().rev().copied());
            }
        }
        found
    }

    /// First descendant of `root` with the given tag.
    pub fn query(&self, root: NodeId, tag: &str) -> Option<NodeId> {
        self.query_all(root, tag).into_iter().next()
    }

    pub fn add_listener(
        &self,
        id: NodeId,
        event: impl Into<String>,
        handler: EventHandler,
    ) -> Result<()> {
        if !self.contains(id) {
            return Err(RuntimeError::UnknownNode(id));
        }
        self.listeners
            .entry(id)
            .or_default()
            .push((event.into(), handler));
        Ok(())
    }

    pub fn listener_count(&self, id: NodeId) -> usize {
        self.listeners.get(&id).map_or(0, |entry| entry.len())
    }

    /// Invoke the listeners registered on `target` for `event`.
    ///
    /// Returns how many listeners ran. Events do not bubble.
    pub fn dispatch(&self, target: NodeId, event: &str) -> usize {
        let handlers: SmallVec<[EventHandler; 2]> = match self.listeners.get(&target) {
            Some(entry) => entry
                .iter()
                .filter(|(name, _)| name == event)
                .map(|(_, handler)| Arc::clone(handler))
                .collect(),
            None => return 0,
        };

        let dom_event = DomEvent {
            name: event.to_string(),
            target,
        };
        for handler in &handlers {
            handler(&dom_event);
        }
        handlers.len()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn node_mut(nodes: &mut HashMap<NodeId, Node>, id: NodeId) -> Result<&mut Node> {
    nodes.get_mut(&id).ok_or(RuntimeError::UnknownNode(id))
}

/// Unlink `child` from its parent, if it has one.
fn detach(nodes: &mut HashMap<NodeId, Node>, child: NodeId) {
    let parent = nodes.get(&child).and_then(Node::parent);
    if let Some(parent) = parent {
        if let Some(parent_node) = nodes.get_mut(&parent) {
            parent_node.remove_child(child);
        }
    }
    if let Some(node) = nodes.get_mut(&child) {
        node.set_parent(None);
    }
}

/// Whether `ancestor` is `node` or one of its ancestors.
fn is_ancestor(nodes: &HashMap<NodeId, Node>, ancestor: NodeId, node: NodeId) -> bool {
    let mut current = Some(node);
    while let Some(id) = current {
        if id == ancestor {
            return true;
        }
        current = nodes.get(&id).and_then(Node::parent);
    }
    false
}

fn collect_text(nodes: &HashMap<NodeId, Node>, id: NodeId, out: &mut String) {
    let Some(node) = nodes.get(&id) else {
        return;
    };
    match node.kind() {
        NodeKind::Text(value) => out.push_str(value),
        NodeKind::Comment(_) => {}
        NodeKind::Element { .. } => {
            for &child in node.children() {
                collect_text(nodes, child, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn append_and_text_content() {
        let doc = Document::new();
        let div = doc.create_element("div");
        let a = doc.create_text("a");
        let comment = doc.create_comment("marker");
        let b = doc.create_text("b");

        doc.append_child(div, a).unwrap();
        doc.append_child(div, comment).unwrap();
        doc.append_child(div, b).unwrap();

        assert_eq!(doc.children(div), vec![a, comment, b]);
        assert_eq!(doc.text_content(div), "ab");
        assert_eq!(doc.parent(a), Some(div));
        assert_eq!(doc.next_sibling(a), Some(comment));
        assert_eq!(doc.next_sibling(b), None);
    }

    #[test]
    fn insert_before_moves_existing_child() {
        let doc = Document::new();
        let ul = doc.create_element("ul");
        let a = doc.create_element("li");
        let b = doc.create_element("li");
        let c = doc.create_element("li");
        for li in [a, b, c] {
            doc.append_child(ul, li).unwrap();
        }

        doc.insert_before(ul, c, Some(a)).unwrap();
        assert_eq!(doc.children(ul), vec![c, a, b]);
    }

    #[test]
    fn insert_before_foreign_reference_fails() {
        let doc = Document::new();
        let ul = doc.create_element("ul");
        let stray = doc.create_element("li");
        let li = doc.create_element("li");

        let err = doc.insert_before(ul, li, Some(stray)).unwrap_err();
        assert!(matches!(err, RuntimeError::NotAChild { .. }));
    }

    #[test]
    fn cyclic_insert_is_rejected() {
        let doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(outer, inner).unwrap();

        let err = doc.append_child(inner, outer).unwrap_err();
        assert!(matches!(err, RuntimeError::CyclicInsert { .. }));
    }

    #[test]
    fn replace_child_keeps_position() {
        let doc = Document::new();
        let div = doc.create_element("div");
        let first = doc.create_text("1");
        let old = doc.create_element("p");
        let last = doc.create_text("3");
        for n in [first, old, last] {
            doc.append_child(div, n).unwrap();
        }

        let new = doc.create_element("span");
        doc.replace_child(div, new, old).unwrap();

        assert_eq!(doc.children(div), vec![first, new, last]);
        assert_eq!(doc.parent(old), None);
        assert!(doc.contains(old));
    }

    #[test]
    fn remove_between_spares_markers() {
        let doc = Document::new();
        let ul = doc.create_element("ul");
        let start = doc.create_comment("start");
        let a = doc.create_element("li");
        let b = doc.create_element("li");
        let end = doc.create_comment("end");
        let tail = doc.create_element("li");
        for n in [start, a, b, end, tail] {
            doc.append_child(ul, n).unwrap();
        }

        let removed = doc.remove_between(ul, start, end).unwrap();
        assert_eq!(removed, vec![a, b]);
        assert_eq!(doc.children(ul), vec![start, end, tail]);
    }

    #[test]
    fn discard_removes_subtree_and_listeners() {
        let doc = Document::new();
        let root = doc.create_element("div");
        let section = doc.create_element("section");
        let button = doc.create_element("button");
        doc.append_child(root, section).unwrap();
        doc.append_child(section, button).unwrap();
        doc.add_listener(button, "click", Arc::new(|_| {})).unwrap();

        doc.discard(section);

        assert!(!doc.contains(section));
        assert!(!doc.contains(button));
        assert_eq!(doc.listener_count(button), 0);
        assert!(doc.children(root).is_empty());
    }

    #[test]
    fn dispatch_runs_matching_listeners() {
        let doc = Document::new();
        let button = doc.create_element("button");
        let clicks = Arc::new(AtomicUsize::new(0));

        let clicks_clone = clicks.clone();
        doc.add_listener(
            button,
            "click",
            Arc::new(move |event: &DomEvent| {
                assert_eq!(event.name, "click");
                clicks_clone.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();
        doc.add_listener(button, "focus", Arc::new(|_: &DomEvent| {}))
            .unwrap();

        assert_eq!(doc.dispatch(button, "click"), 1);
        assert_eq!(doc.dispatch(button, "keydown"), 0);
        assert_eq!(clicks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn query_all_walks_in_document_order() {
        let doc = Document::new();
        let root = doc.create_element("div");
        let p1 = doc.create_element("p");
        let section = doc.create_element("section");
        let p2 = doc.create_element("p");
        doc.append_child(root, p1).unwrap();
        doc.append_child(root, section).unwrap();
        doc.append_child(section, p2).unwrap();

        assert_eq!(doc.query_all(root, "p"), vec![p1, p2]);
        assert_eq!(doc.query(root, "section"), Some(section));
        assert_eq!(doc.query(root, "div"), None);
    }
}
