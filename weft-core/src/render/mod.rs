//! Rendering Pipeline
//!
//! - [`Reconciler`]: invokes components and applies their output to the
//!   document, either as a full root pass or as targeted instance updates.
//! - [`Scheduler`]: collects `render:request` events into batches and flushes
//!   each batch once per host turn.
//! - [`TaskQueue`]: the host turn itself.

mod queue;
mod reconciler;
mod scheduler;

pub use queue::{Task, TaskQueue};
pub use reconciler::Reconciler;
pub use scheduler::{PendingBatch, Scheduler};
