//! Tree Descriptions
//!
//! An [`Element`] is the immutable description a component body returns. It
//! is rebuilt on every render and never mutated afterwards. The reconciler
//! hands it to a [`NodeBuilder`](crate::dom::NodeBuilder), which turns it into
//! document nodes.
//!
//! # Example
//!
//! ```rust
//! use weft_core::{create_element, Element, Props};
//!
//! let list = create_element(
//!     "ul",
//!     Props::new()
//!         .class("items")
//!         .child(create_element("li", Props::new().child("one")))
//!         .child(create_element("li", Props::new().child(2))),
//! );
//!
//! assert!(matches!(list, Element::Intrinsic { ref tag, .. } if tag == "ul"));
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::component::{Component, ComponentId};
use crate::dom::{DomEvent, EventHandler, NodeRef};

/// A declarative description of document content.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// A document element such as `div`.
    Intrinsic { tag: String, props: Props },
    /// A registered component, rendered through the reconciler.
    Component { component: Component, props: Props },
    /// A text node.
    Text(String),
    /// Several sibling elements with no wrapper.
    Fragment(Vec<Element>),
}

impl Element {
    pub fn text(value: impl Into<String>) -> Self {
        Element::Text(value.into())
    }

    pub fn fragment<I, E>(children: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Element>,
    {
        Element::Fragment(children.into_iter().map(Into::into).collect())
    }

    /// The component identity if this element is a component reference.
    pub fn component_id(&self) -> Option<ComponentId> {
        match self {
            Element::Component { component, .. } => Some(component.id()),
            _ => None,
        }
    }

    pub fn props(&self) -> Option<&Props> {
        match self {
            Element::Intrinsic { props, .. } | Element::Component { props, .. } => Some(props),
            Element::Text(_) | Element::Fragment(_) => None,
        }
    }

    /// A lightweight, serializable summary used in diagnostics events.
    pub fn describe(&self) -> Description {
        match self {
            Element::Intrinsic { tag, .. } => Description::Intrinsic { tag: tag.clone() },
            Element::Component { component, .. } => Description::Component {
                component: component.id(),
                name: component.name().to_string(),
            },
            Element::Text(value) => Description::Text {
                value: value.clone(),
            },
            Element::Fragment(children) => Description::Fragment {
                children: children.len(),
            },
        }
    }
}

impl From<&str> for Element {
    fn from(value: &str) -> Self {
        Element::Text(value.to_string())
    }
}

impl From<String> for Element {
    fn from(value: String) -> Self {
        Element::Text(value)
    }
}

macro_rules! text_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Element {
                fn from(value: $ty) -> Self {
                    Element::Text(value.to_string())
                }
            }
        )*
    };
}

text_from_display!(i32, i64, u32, u64, usize, f64, char);

/// What to create: a tag name or a component.
#[derive(Debug, Clone)]
pub enum ElementKind {
    Tag(String),
    Component(Component),
}

impl From<&str> for ElementKind {
    fn from(tag: &str) -> Self {
        ElementKind::Tag(tag.to_string())
    }
}

impl From<String> for ElementKind {
    fn from(tag: String) -> Self {
        ElementKind::Tag(tag)
    }
}

impl From<Component> for ElementKind {
    fn from(component: Component) -> Self {
        ElementKind::Component(component)
    }
}

impl From<&Component> for ElementKind {
    fn from(component: &Component) -> Self {
        ElementKind::Component(component.clone())
    }
}

/// Build an element from a kind and its props.
pub fn create_element(kind: impl Into<ElementKind>, props: Props) -> Element {
    match kind.into() {
        ElementKind::Tag(tag) => Element::Intrinsic { tag, props },
        ElementKind::Component(component) => Element::Component { component, props },
    }
}

/// An attribute value.
#[derive(Clone)]
pub enum PropValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Event listener, bound by `on<event>` keys.
    Listener(EventHandler),
    /// Receives the created node, bound by the `ref` key.
    Ref(NodeRef),
}

impl PropValue {
    /// The value as a document attribute, if it is a plain value.
    pub fn as_attribute(&self) -> Option<String> {
        match self {
            PropValue::Text(value) => Some(value.clone()),
            PropValue::Int(value) => Some(value.to_string()),
            PropValue::Float(value) => Some(value.to_string()),
            PropValue::Bool(value) => Some(value.to_string()),
            PropValue::Listener(_) | PropValue::Ref(_) => None,
        }
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Text(a), PropValue::Text(b)) => a == b,
            (PropValue::Int(a), PropValue::Int(b)) => a == b,
            (PropValue::Float(a), PropValue::Float(b)) => a.to_bits() == b.to_bits(),
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Listener(a), PropValue::Listener(b)) => Arc::ptr_eq(a, b),
            (PropValue::Ref(a), PropValue::Ref(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for PropValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropValue::Text(value) => write!(f, "{value:?}"),
            PropValue::Int(value) => write!(f, "{value}"),
            PropValue::Float(value) => write!(f, "{value}"),
            PropValue::Bool(value) => write!(f, "{value}"),
            PropValue::Listener(_) => f.write_str("<listener>"),
            PropValue::Ref(_) => f.write_str("<ref>"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Text(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Text(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(value.into())
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<NodeRef> for PropValue {
    fn from(value: NodeRef) -> Self {
        PropValue::Ref(value)
    }
}

/// Attributes and children passed to an element or component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    attrs: IndexMap<String, PropValue>,
    children: Vec<Element>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn class(self, name: impl Into<String>) -> Self {
        let name: String = name.into();
        self.attr("class", name)
    }

    /// Attach a listener for `event` (e.g. `"click"`).
    pub fn on<F>(mut self, event: &str, handler: F) -> Self
    where
        F: Fn(&DomEvent) + Send + Sync + 'static,
    {
        self.attrs
            .insert(format!("on{event}"), PropValue::Listener(Arc::new(handler)));
        self
    }

    /// Ask the builder to store the created node in `node_ref`.
    pub fn node_ref(self, node_ref: &NodeRef) -> Self {
        self.attr("ref", node_ref.clone())
    }

    pub fn child(mut self, child: impl Into<Element>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Add a child only when present.
    pub fn maybe_child<E: Into<Element>>(mut self, child: Option<E>) -> Self {
        if let Some(child) = child {
            self.children.push(child.into());
        }
        self
    }

    pub fn with_children<I, E>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Element>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.attrs.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.attrs.get(key) {
            Some(PropValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.attrs.get(key) {
            Some(PropValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.attrs.get(key) {
            Some(PropValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// Attributes in insertion order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }
}

/// Serializable summary of an [`Element`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Description {
    Intrinsic { tag: String },
    Component { component: ComponentId, name: String },
    Text { value: String },
    Fragment { children: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::Ref;

    #[test]
    fn create_element_dispatches_on_kind() {
        let tag = create_element("div", Props::new());
        assert!(matches!(tag, Element::Intrinsic { ref tag, .. } if tag == "div"));

        let c = Component::new("C", |_, _| Ok(Element::text("")));
        let comp = create_element(&c, Props::new());
        assert_eq!(comp.component_id(), Some(c.id()));
    }

    #[test]
    fn absent_children_are_skipped() {
        let props = Props::new()
            .child("a")
            .maybe_child(None::<Element>)
            .maybe_child(Some(7))
            .with_children(["b", "c"]);

        let texts: Vec<_> = props
            .children()
            .iter()
            .map(|child| match child {
                Element::Text(value) => value.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(texts, vec!["a", "7", "b", "c"]);
    }

    #[test]
    fn typed_accessors() {
        let props = Props::new()
            .attr("title", "hi")
            .attr("count", 3)
            .attr("open", true);

        assert_eq!(props.text("title"), Some("hi"));
        assert_eq!(props.int("count"), Some(3));
        assert_eq!(props.bool("open"), Some(true));
        assert_eq!(props.text("count"), None);
    }

    #[test]
    fn listener_and_ref_values_compare_by_identity() {
        let node_ref: NodeRef = Ref::new(None);
        let a = Props::new().node_ref(&node_ref);
        let b = Props::new().node_ref(&node_ref);
        assert_eq!(a, b);

        let other: NodeRef = Ref::new(None);
        assert_ne!(a, Props::new().node_ref(&other));

        let on_a = Props::new().on("click", |_| {});
        let on_b = Props::new().on("click", |_| {});
        assert_ne!(on_a, on_b);
        assert_eq!(on_a.clone(), on_a);
    }

    #[test]
    fn plain_values_render_as_attributes() {
        assert_eq!(PropValue::from(1.5).as_attribute().as_deref(), Some("1.5"));
        assert_eq!(PropValue::from(false).as_attribute().as_deref(), Some("false"));
        assert_eq!(
            PropValue::Listener(Arc::new(|_: &DomEvent| {})).as_attribute(),
            None
        );
    }
}
