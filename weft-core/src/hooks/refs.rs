//! Refs

use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;

use super::deps::Dep;
use super::Hooks;
use crate::component::HookSlot;
use crate::error::{Result, RuntimeError};

/// A shared mutable box whose identity is stable for the life of its slot.
///
/// Writing to a ref never schedules a render.
pub struct Ref<T>(Arc<RwLock<T>>);

impl<T> Ref<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    pub fn set(&self, value: T) {
        *self.0.write() = value;
    }

    /// Replace the value, returning the old one.
    pub fn replace(&self, value: T) -> T {
        std::mem::replace(&mut *self.0.write(), value)
    }

    /// Read the value in place.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.0.read())
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.0.write())
    }

    /// Whether both handles point at the same box.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// The box's identity as an effect dependency.
    pub fn dep(&self) -> Dep {
        Dep::ptr(&self.0)
    }
}

impl<T: Clone> Ref<T> {
    pub fn get(&self) -> T {
        self.0.read().clone()
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Ref").field(&*self.0.read()).finish()
    }
}

impl Hooks {
    /// Return the ref stored in this slot, creating it from `initial` on the
    /// first call. Later calls ignore `initial`.
    pub fn use_ref<T>(&self, initial: T) -> Result<Ref<T>>
    where
        T: Send + Sync + 'static,
    {
        let (component, index) = self.store.next_hook_index("use_ref")?;
        let existing = self
            .store
            .with_record(component, |record| record.hook(index).cloned())
            .ok_or(RuntimeError::UnknownComponent(component))?;

        let mismatch = RuntimeError::HookTypeMismatch { component, index };
        match existing {
            Some(HookSlot::Ref(cell)) => cell
                .downcast::<RwLock<T>>()
                .map(Ref)
                .map_err(|_| mismatch),
            Some(HookSlot::State(_)) => Err(mismatch),
            None => {
                let cell = Arc::new(RwLock::new(initial));
                let erased: Arc<dyn Any + Send + Sync> = cell.clone();
                self.store
                    .with_record(component, |record| record.set_hook(index, HookSlot::Ref(erased)));
                tracing::trace!(%component, index, "ref allocated");
                Ok(Ref(cell))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_box() {
        let a = Ref::new(1);
        let b = a.clone();
        b.set(2);
        assert_eq!(a.get(), 2);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Ref::new(2)));
        assert_eq!(a.dep(), b.dep());
    }

    #[test]
    fn replace_and_with_mut() {
        let r = Ref::new(vec![1]);
        r.with_mut(|v| v.push(2));
        assert_eq!(r.replace(Vec::new()), vec![1, 2]);
        assert!(r.with(Vec::is_empty));
    }
}
