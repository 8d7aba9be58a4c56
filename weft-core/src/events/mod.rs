//! Runtime Events
//!
//! Every observable step of the runtime is published on an [`EventBus`]:
//! render requests, flush summaries, component lifecycle, node creation and
//! effect lifecycle. The scheduler itself is a bus listener: a state setter
//! does not call the scheduler directly, it publishes `render:request`.
//!
//! Diagnostics tooling attaches to the same bus; see
//! [`EventRecorder`](crate::diagnostics::EventRecorder).

mod bus;
mod payload;

pub use bus::{EventBus, Listener, ListenerId, Subscription};
pub use payload::{
    ComponentMounted, ComponentUnmounted, EffectCleanup, EffectScheduled, EventKind,
    EventPayload, FlushScope, NodeCreated, RenderFlush, RenderReason, RenderRequest,
    RuntimeEvent,
};
