//! The Pipeworks automation worker.
//!
//! [`lifecycle`] owns the per-job state machine: claim, prerequisite check,
//! execution, and exactly one terminal store write per processing pass.
//! [`scheduler`] drives batches of pending jobs through it with bounded
//! concurrency and exposes the operator-facing controls (retry, cancel,
//! status summary).

pub mod lifecycle;
pub mod scheduler;

pub use lifecycle::{JobWorker, ProcessResult, WorkerError};
pub use scheduler::{BatchOptions, BatchResult};
