//! Effect Hook
//!
//! Effects run synchronously during the component invocation that declares
//! them, right where `use_effect` is called. Whether they run depends on the
//! dependency list:
//!
//! - `None`: every render.
//! - `Some(deps![])`: the first render only.
//! - anything else: when the list differs from the one the effect last ran
//!   with, by length or by any positional entry.
//!
//! Before an effect reruns, the cleanup returned by its previous run is
//! invoked. Remaining cleanups run when the component unmounts or the runtime
//! is torn down.

use super::deps::{should_run, Dependencies};
use super::Hooks;
use crate::component::{Cleanup, EffectSlot};
use crate::error::{Result, RuntimeError};
use crate::events::{EffectCleanup, EffectScheduled};

/// Wrap a closure as an effect cleanup.
///
/// ```rust
/// use weft_core::hooks::cleanup;
///
/// let done = cleanup(|| {});
/// assert!(done.is_some());
/// ```
pub fn cleanup(f: impl FnOnce() + Send + 'static) -> Option<Cleanup> {
    Some(Box::new(f))
}

impl Hooks {
    /// Declare an effect for this slot.
    pub fn use_effect<F>(&self, callback: F, dependencies: Option<Dependencies>) -> Result<()>
    where
        F: FnOnce() -> Option<Cleanup>,
    {
        let (component, index) = self.store.next_hook_index("use_effect")?;
        let previous = self
            .store
            .with_record(component, |record| {
                record.effect(index).map(|slot| slot.dependencies.clone())
            })
            .ok_or(RuntimeError::UnknownComponent(component))?;

        if !should_run(previous.as_ref(), dependencies.as_ref()) {
            return Ok(());
        }

        let stale = self
            .store
            .with_record(component, |record| {
                record
                    .effect_mut(index)
                    .and_then(|slot| slot.cleanup.take())
            })
            .flatten();

        if let Some(stale) = stale {
            self.events.publish(EffectCleanup {
                component,
                hook_index: index,
                timestamp: self.events.now(),
            });
            stale();
        }

        self.events.publish(EffectScheduled {
            component,
            hook_index: index,
            dependencies: dependencies.clone(),
            timestamp: self.events.now(),
        });
        tracing::trace!(%component, index, "running effect");

        let cleanup = callback();
        self.store.with_record(component, |record| {
            record.set_effect(
                index,
                EffectSlot {
                    dependencies,
                    cleanup,
                },
            )
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, ComponentStore};
    use crate::deps;
    use crate::element::{Element, Props};
    use crate::events::{EventBus, EventKind, RuntimeEvent};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fixture {
        hooks: Hooks,
        component: Component,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Fixture {
        fn new() -> Self {
            let hooks = Hooks::new(Arc::new(ComponentStore::new()), EventBus::new());
            let log = Arc::new(Mutex::new(Vec::new()));
            for kind in [EventKind::EffectScheduled, EventKind::EffectCleanup] {
                let log = log.clone();
                hooks.events().subscribe(kind, move |event| {
                    log.lock().push(event.kind().name().to_string());
                });
            }
            Self {
                hooks,
                component: Component::new("Effectful", |_, _| Ok(Element::text(""))),
                log,
            }
        }

        /// Run one invocation that declares a single effect.
        fn render(&self, dependencies: Option<Dependencies>) {
            let _scope = self
                .hooks
                .store()
                .begin_invocation(&self.component, Props::new());
            let log = self.log.clone();
            self.hooks
                .use_effect(
                    move || {
                        log.lock().push("run".into());
                        let log = log.clone();
                        cleanup(move || log.lock().push("cleanup".into()))
                    },
                    dependencies,
                )
                .unwrap();
        }

        fn take_log(&self) -> Vec<String> {
            std::mem::take(&mut *self.log.lock())
        }
    }

    #[test]
    fn empty_dependencies_run_once() {
        let f = Fixture::new();
        f.render(Some(deps![]));
        f.render(Some(deps![]));
        f.render(Some(deps![]));

        assert_eq!(f.take_log(), vec!["hook:effect-scheduled", "run"]);
    }

    #[test]
    fn missing_dependencies_run_every_time() {
        let f = Fixture::new();
        f.render(None);
        f.take_log();
        f.render(None);

        assert_eq!(
            f.take_log(),
            vec!["hook:effect-cleanup", "cleanup", "hook:effect-scheduled", "run"]
        );
    }

    #[test]
    fn changed_dependencies_rerun() {
        let f = Fixture::new();
        f.render(Some(deps![1, "a"]));
        f.render(Some(deps![1, "a"]));
        assert_eq!(f.take_log().len(), 2);

        f.render(Some(deps![2, "a"]));
        assert_eq!(
            f.take_log(),
            vec!["hook:effect-cleanup", "cleanup", "hook:effect-scheduled", "run"]
        );
    }

    #[test]
    fn scheduled_event_carries_snapshot() {
        let f = Fixture::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        f.hooks
            .events()
            .subscribe(EventKind::EffectScheduled, move |event| {
                if let RuntimeEvent::EffectScheduled(payload) = event {
                    seen_clone.lock().push(payload.dependencies.clone());
                }
            });

        f.render(None);
        f.render(Some(deps![3]));

        assert_eq!(*seen.lock(), vec![None, Some(deps![3])]);
    }

    #[test]
    fn effect_without_cleanup() {
        let hooks = Hooks::new(Arc::new(ComponentStore::new()), EventBus::new());
        let c = Component::new("Plain", |_, _| Ok(Element::text("")));
        let runs = AtomicUsize::new(0);

        for _ in 0..2 {
            let _scope = hooks.store().begin_invocation(&c, Props::new());
            hooks
                .use_effect(
                    || {
                        runs.fetch_add(1, Ordering::SeqCst);
                        None
                    },
                    None,
                )
                .unwrap();
        }

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(hooks.store().take_effect_cleanups(c.id()).is_empty());
    }

    #[test]
    fn outside_component_is_misuse() {
        let hooks = Hooks::new(Arc::new(ComponentStore::new()), EventBus::new());
        let err = hooks.use_effect(|| None, None).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::HookOutsideComponent { hook: "use_effect" }
        ));
    }
}
