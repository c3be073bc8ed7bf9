//! Notification infrastructure for job lifecycle events.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`JobEvent`]: the canonical job lifecycle event envelope.
//! - [`Notifier`]: the fire-and-forget seam the worker emits through;
//!   [`BusNotifier`] fans out over the bus, [`NullNotifier`] swallows
//!   everything for tests.

pub mod bus;
pub mod notifier;

pub use bus::{
    EventBus, JobEvent, EVENT_JOB_COMPLETED, EVENT_JOB_FAILED, EVENT_JOB_WAITING_INPUT,
};
pub use notifier::{BusNotifier, JobNotification, Notifier, NullNotifier};
