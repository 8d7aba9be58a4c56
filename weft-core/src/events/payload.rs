//! Event catalog.
//!
//! These payloads are the wire contract for observers such as diagnostics
//! tooling. Every payload carries a `timestamp` in milliseconds since the
//! owning runtime was created.

use serde::{Deserialize, Serialize};

use crate::component::{ComponentId, ComponentOutput};
use crate::dom::Built;
use crate::element::Description;
use crate::hooks::Dependencies;

/// Names of the events published on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "render:request")]
    RenderRequest,
    #[serde(rename = "render:flush")]
    RenderFlush,
    #[serde(rename = "component:mounted")]
    ComponentMounted,
    #[serde(rename = "component:unmounted")]
    ComponentUnmounted,
    #[serde(rename = "dom:node-created")]
    NodeCreated,
    #[serde(rename = "hook:effect-scheduled")]
    EffectScheduled,
    #[serde(rename = "hook:effect-cleanup")]
    EffectCleanup,
}

impl EventKind {
    /// Every event kind, in catalog order.
    pub const ALL: [EventKind; 7] = [
        EventKind::RenderRequest,
        EventKind::RenderFlush,
        EventKind::ComponentMounted,
        EventKind::ComponentUnmounted,
        EventKind::NodeCreated,
        EventKind::EffectScheduled,
        EventKind::EffectCleanup,
    ];

    /// The catalog name, e.g. `"render:flush"`.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::RenderRequest => "render:request",
            EventKind::RenderFlush => "render:flush",
            EventKind::ComponentMounted => "component:mounted",
            EventKind::ComponentUnmounted => "component:unmounted",
            EventKind::NodeCreated => "dom:node-created",
            EventKind::EffectScheduled => "hook:effect-scheduled",
            EventKind::EffectCleanup => "hook:effect-cleanup",
        }
    }

    /// Look up a kind by its catalog name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a render was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderReason {
    StateChange,
    External,
    Effect,
}

impl RenderReason {
    pub fn name(&self) -> &'static str {
        match self {
            RenderReason::StateChange => "state-change",
            RenderReason::External => "external",
            RenderReason::Effect => "effect",
        }
    }
}

/// Which part of the tree a flush re-rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlushScope {
    Root,
    Components,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderRequest {
    pub reason: RenderReason,
    /// The component whose state changed. `None` invalidates the root.
    pub component: Option<ComponentId>,
    pub timestamp: f64,
}

/// Summary of one completed flush.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderFlush {
    /// Distinct reasons that contributed to this flush, in arrival order.
    pub reasons: Vec<RenderReason>,
    /// Components updated in place. Empty unless `scope` is `Components`.
    pub components: Vec<ComponentId>,
    pub scope: FlushScope,
    /// Components whose instance update could not be applied and forced a
    /// root replay.
    pub fallback: Vec<ComponentId>,
    /// Start of the render work.
    pub timestamp: f64,
    /// Duration of the render work in milliseconds.
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentMounted {
    pub component: ComponentId,
    pub output: ComponentOutput,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentUnmounted {
    pub component: ComponentId,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeCreated {
    pub description: Description,
    pub node: Built,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectScheduled {
    pub component: ComponentId,
    pub hook_index: usize,
    /// Copy of the dependency list the effect ran with; `None` when omitted.
    pub dependencies: Option<Dependencies>,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectCleanup {
    pub component: ComponentId,
    pub hook_index: usize,
    pub timestamp: f64,
}

/// Any event that can travel over the bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload")]
pub enum RuntimeEvent {
    #[serde(rename = "render:request")]
    RenderRequest(RenderRequest),
    #[serde(rename = "render:flush")]
    RenderFlush(RenderFlush),
    #[serde(rename = "component:mounted")]
    ComponentMounted(ComponentMounted),
    #[serde(rename = "component:unmounted")]
    ComponentUnmounted(ComponentUnmounted),
    #[serde(rename = "dom:node-created")]
    NodeCreated(NodeCreated),
    #[serde(rename = "hook:effect-scheduled")]
    EffectScheduled(EffectScheduled),
    #[serde(rename = "hook:effect-cleanup")]
    EffectCleanup(EffectCleanup),
}

impl RuntimeEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            RuntimeEvent::RenderRequest(_) => EventKind::RenderRequest,
            RuntimeEvent::RenderFlush(_) => EventKind::RenderFlush,
            RuntimeEvent::ComponentMounted(_) => EventKind::ComponentMounted,
            RuntimeEvent::ComponentUnmounted(_) => EventKind::ComponentUnmounted,
            RuntimeEvent::NodeCreated(_) => EventKind::NodeCreated,
            RuntimeEvent::EffectScheduled(_) => EventKind::EffectScheduled,
            RuntimeEvent::EffectCleanup(_) => EventKind::EffectCleanup,
        }
    }

    pub fn timestamp(&self) -> f64 {
        match self {
            RuntimeEvent::RenderRequest(p) => p.timestamp,
            RuntimeEvent::RenderFlush(p) => p.timestamp,
            RuntimeEvent::ComponentMounted(p) => p.timestamp,
            RuntimeEvent::ComponentUnmounted(p) => p.timestamp,
            RuntimeEvent::NodeCreated(p) => p.timestamp,
            RuntimeEvent::EffectScheduled(p) => p.timestamp,
            RuntimeEvent::EffectCleanup(p) => p.timestamp,
        }
    }
}

/// A payload type with a fixed place in the catalog.
///
/// Lets listeners subscribe with [`EventBus::on`](super::EventBus::on) and
/// receive the payload directly instead of matching on [`RuntimeEvent`].
pub trait EventPayload: Sized + 'static {
    const KIND: EventKind;

    fn from_event(event: &RuntimeEvent) -> Option<&Self>;

    fn into_event(self) -> RuntimeEvent;
}

macro_rules! impl_payload {
    ($($variant:ident),* $(,)?) => {
        $(
            impl EventPayload for $variant {
                const KIND: EventKind = EventKind::$variant;

                fn from_event(event: &RuntimeEvent) -> Option<&Self> {
                    match event {
                        RuntimeEvent::$variant(payload) => Some(payload),
                        _ => None,
                    }
                }

                fn into_event(self) -> RuntimeEvent {
                    RuntimeEvent::$variant(self)
                }
            }

            impl From<$variant> for RuntimeEvent {
                fn from(payload: $variant) -> Self {
                    RuntimeEvent::$variant(payload)
                }
            }
        )*
    };
}

impl_payload!(
    RenderRequest,
    RenderFlush,
    ComponentMounted,
    ComponentUnmounted,
    NodeCreated,
    EffectScheduled,
    EffectCleanup,
);
