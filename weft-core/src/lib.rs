//! Weft Core
//!
//! This crate provides the core runtime for the Weft component rendering
//! framework. It implements:
//!
//! - Function components with per-instance state (`use_state`, `use_ref`,
//!   `use_effect`)
//! - An immutable element tree and a builder that turns it into document nodes
//! - Targeted re-rendering of individual components, with a root replay as
//!   fallback
//! - Batched, turn-based scheduling of render requests
//! - A typed event bus through which every step can be observed
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `events`: the event bus and the event catalog
//! - `component`: component identity and the store of per-instance records
//! - `element`: the declarative element tree
//! - `dom`: the in-memory document and the node builder
//! - `hooks`: state, refs and effects
//! - `render`: reconciler, scheduler and the host task queue
//! - `runtime`: the facade that wires one rendering context together
//! - `diagnostics`: event recording and export
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
//! let counter = Component::new("Counter", |hooks, _props| {
//!     let (count, set_count) = hooks.use_state(0)?;
//!     Ok(create_element(
//!         "button",
//!         Props::new()
//!             .on("click", move |_| {
//!                 set_count.update(|n| n + 1);
//!             })
//!             .child(count),
//!     ))
//! });
//!
//! runtime.render(create_element(&counter, Props::new()), root).unwrap();
//!
//! let button = document.query(root, "button").unwrap();
//! document.dispatch(button, "click");
//! document.dispatch(button, "click");
//! runtime.run_until_idle().unwrap();
//!
//! assert_eq!(document.text_content(root), "2");
//! ```

pub mod component;
pub mod config;
pub mod diagnostics;
pub mod dom;
pub mod element;
pub mod error;
pub mod events;
pub mod hooks;
pub mod render;
pub mod runtime;

pub use component::{Component, ComponentId, ComponentOutput, ComponentStore, FragmentBoundary};
pub use config::RuntimeConfig;
pub use diagnostics::EventRecorder;
pub use dom::{Built, Document, DomBuilder, DomEvent, NodeBuilder, NodeId, NodeRef};
pub use element::{create_element, Description, Element, ElementKind, PropValue, Props};
pub use error::{Result, RuntimeError};
pub use events::{EventBus, EventKind, FlushScope, RenderFlush, RenderReason, RuntimeEvent};
pub use hooks::{cleanup, Dep, Dependencies, Hooks, Ref, SetState};
pub use render::{Reconciler, Scheduler, TaskQueue};
pub use runtime::Runtime;
