//! Runtime Errors
//!
//! Every fallible operation in the crate returns [`Result`]. Errors are
//! surfaced synchronously to whoever triggered them: a hook called outside a
//! component fails that call, a component body that returns an error aborts
//! the render pass it was part of.
//!
//! Note that a failed instance update is *not* an error. The reconciler
//! reports it as `false` and the scheduler widens the flush to a root replay.

use thiserror::Error;

use crate::component::ComponentId;
use crate::dom::NodeId;

/// Errors produced by the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A hook was called while no component invocation was active.
    #[error("{hook} called outside component")]
    HookOutsideComponent {
        /// Name of the offending hook.
        hook: &'static str,
    },

    /// A hook slot was reused by a hook of a different kind or value type.
    ///
    /// This happens when a component calls hooks conditionally.
    #[error("hook slot {index} of {component} holds a different hook type")]
    HookTypeMismatch {
        component: ComponentId,
        index: usize,
    },

    #[error("unknown component {0}")]
    UnknownComponent(ComponentId),

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// A document operation referenced a child that is not attached to the
    /// given parent.
    #[error("node {node} is not a child of {parent}")]
    NotAChild { parent: NodeId, node: NodeId },

    /// The node has no parent, so it cannot be replaced in place.
    #[error("node {0} is not attached to a parent")]
    Detached(NodeId),

    /// Inserting the node would make it its own ancestor.
    #[error("inserting {node} under {parent} would create a cycle")]
    CyclicInsert { parent: NodeId, node: NodeId },

    /// The host loop kept finding new work after the configured number of turns.
    #[error("render loop did not settle after {0} turns")]
    TurnLimit(usize),

    /// A component body failed.
    #[error("render failed: {0}")]
    Render(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Recorded events could not be encoded.
    #[error("failed to export events: {0}")]
    Export(String),
}

impl RuntimeError {
    /// Build a [`RuntimeError::Render`] from any displayable message.
    pub fn render(message: impl std::fmt::Display) -> Self {
        Self::Render(message.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = RuntimeError> = std::result::Result<T, E>;
