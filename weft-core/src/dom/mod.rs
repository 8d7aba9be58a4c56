//! Document Layer
//!
//! The in-memory [`Document`] the runtime renders into, and the
//! [`NodeBuilder`] seam the reconciler uses to create and move nodes.

mod builder;
mod document;
mod node;

pub use builder::{Built, DomBuilder, NodeBuilder, RenderComponent};
pub use document::{Document, DomEvent, EventHandler};
pub use node::{Node, NodeId, NodeKind};

/// A ref the builder fills with the node it created for an element.
pub type NodeRef = crate::hooks::Ref<Option<NodeId>>;
