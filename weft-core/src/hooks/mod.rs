//! Hooks
//!
//! Component bodies receive a [`Hooks`] handle and use it to keep state
//! between renders. Each call takes the next slot of the running invocation,
//! so a component must call its hooks in the same order on every render.
//!
//! ```rust
//! use weft_core::{create_element, deps, Component, Props};
//!
//! let counter = Component::new("Counter", |hooks, _props| {
//!     let (count, set_count) = hooks.use_state(0)?;
//!     let renders = hooks.use_ref(0_u32)?;
//!     renders.with_mut(|n| *n += 1);
//!     hooks.use_effect(|| None, Some(deps![count]))?;
//!
//!     Ok(create_element(
//!         "button",
//!         Props::new()
//!             .on("click", move |_| {
//!                 set_count.update(|n| n + 1);
//!             })
//!             .child(count),
//!     ))
//! });
//! # let _ = counter;
//! ```

mod deps;
mod effect;
mod refs;
mod state;

pub use deps::{Dep, Dependencies};
pub use effect::cleanup;
pub use refs::Ref;
pub use state::SetState;

use std::sync::Arc;

use crate::component::{ComponentId, ComponentStore};
use crate::events::EventBus;

/// Hook engine of one runtime.
///
/// Cheap to clone. All clones read and write the same component store.
#[derive(Clone)]
pub struct Hooks {
    store: Arc<ComponentStore>,
    events: EventBus,
}

impl Hooks {
    pub fn new(store: Arc<ComponentStore>, events: EventBus) -> Self {
        Self { store, events }
    }

    pub fn store(&self) -> &Arc<ComponentStore> {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The component whose body is running, if any.
    pub fn current_component(&self) -> Option<ComponentId> {
        self.store.current()
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("current", &self.store.current())
            .finish()
    }
}
