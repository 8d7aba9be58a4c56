//! State Hook
//!
//! `use_state` keeps a value in the component's hook slot and hands back a
//! [`SetState`] handle. Setting a value that differs from the current one
//! publishes a `render:request` for the owning component; the scheduler takes
//! it from there. Setting an equal value is silent.
//!
//! Sameness is `PartialEq`. A type whose `eq` is always `false` renders on
//! every set.

use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;

use super::Hooks;
use crate::component::{ComponentId, HookSlot};
use crate::error::{Result, RuntimeError};
use crate::events::{EventBus, RenderReason, RenderRequest};

/// Setter returned by [`Hooks::use_state`].
///
/// Stays valid after the component body returns; typically captured by event
/// listeners.
///
/// Changes are detected with `PartialEq`. For float state that means setting
/// `NaN` over `NaN` counts as a change and requests a render every time, so an
/// effect that keeps writing `NaN` never settles.
pub struct SetState<T> {
    cell: Arc<RwLock<T>>,
    component: ComponentId,
    events: EventBus,
}

impl<T> SetState<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Store `next`. Returns whether the value changed.
    pub fn set(&self, next: T) -> bool {
        self.update(move |_| next)
    }

    /// Compute the next value from the current one. Returns whether it changed.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let current = self.cell.read().clone();
        let next = f(&current);

        {
            let mut value = self.cell.write();
            if *value == next {
                return false;
            }
            *value = next;
        }

        tracing::trace!(component = %self.component, "state changed");
        self.events.publish(RenderRequest {
            reason: RenderReason::StateChange,
            component: Some(self.component),
            timestamp: self.events.now(),
        });
        true
    }

    /// The latest value, including updates made since the last render.
    pub fn get(&self) -> T {
        self.cell.read().clone()
    }

    pub fn component(&self) -> ComponentId {
        self.component
    }
}

impl<T> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            component: self.component,
            events: self.events.clone(),
        }
    }
}

impl<T> std::fmt::Debug for SetState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetState")
            .field("component", &self.component)
            .finish_non_exhaustive()
    }
}

impl Hooks {
    /// Read this slot's state, initialising it with `initial` on first use.
    pub fn use_state<T>(&self, initial: T) -> Result<(T, SetState<T>)>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        self.use_state_with(move || initial)
    }

    /// Like [`use_state`](Self::use_state), but `init` only runs when the
    /// slot is created.
    pub fn use_state_with<T, F>(&self, init: F) -> Result<(T, SetState<T>)>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let (component, index) = self.store.next_hook_index("use_state")?;
        let existing = self
            .store
            .with_record(component, |record| record.hook(index).cloned())
            .ok_or(RuntimeError::UnknownComponent(component))?;

        let cell = match existing {
            Some(HookSlot::State(cell)) => cell
                .downcast::<RwLock<T>>()
                .map_err(|_| RuntimeError::HookTypeMismatch { component, index })?,
            Some(HookSlot::Ref(_)) => {
                return Err(RuntimeError::HookTypeMismatch { component, index });
            }
            None => {
                let cell = Arc::new(RwLock::new(init()));
                let erased: Arc<dyn Any + Send + Sync> = cell.clone();
                self.store.with_record(component, |record| {
                    record.set_hook(index, HookSlot::State(erased))
                });
                tracing::trace!(%component, index, "state allocated");
                cell
            }
        };

        let value = cell.read().clone();
        Ok((
            value,
            SetState {
                cell,
                component,
                events: self.events.clone(),
            },
        ))
    }
}
