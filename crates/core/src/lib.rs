//! Pure domain logic for the Pipeworks automation worker.
//!
//! Everything in this crate is synchronous and side-effect free: job and
//! stage enums, workspace automation settings, prerequisite/output
//! validation rules, and the tolerant parsing helpers the pipeline crate
//! builds on. No internal dependencies, no I/O.

pub mod error;
pub mod json_extract;
pub mod job_type;
pub mod markdown;
pub mod outputs;
pub mod payload;
pub mod personas;
pub mod settings;
pub mod stage;
pub mod status;
pub mod types;

pub use error::CoreError;
pub use job_type::JobType;
pub use settings::{ExecutionMode, RunDecision, ValidationMode, WorkspaceSettings};
pub use stage::Stage;
pub use status::JobStatus;
