//! Persistence seams for the Pipeworks automation worker.
//!
//! The worker never talks to a database directly: every mutation goes
//! through the [`JobStore`] trait's single-row operations, project artifacts
//! arrive via [`ProjectReader`], and per-workspace automation settings via
//! [`SettingsReader`]. [`MemoryStore`] is the in-process reference
//! implementation backing tests and local development; a SQL-backed
//! implementation satisfies the same contracts.

pub mod error;
pub mod memory;
pub mod models;
pub mod traits;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use models::{Artifact, Job, JobRun, NewJob, Project, StatusCounts, Ticket};
pub use traits::{JobStore, ProjectReader, SettingsReader};
