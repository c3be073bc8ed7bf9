//! Artifact generation orchestration.
//!
//! Wires the pure rules from `pipeworks-core` to the outside world: the
//! [`ArtifactGenerator`] seam to the generation backend, per-job-type
//! prerequisite checks against the project store, the bounded
//! generation-with-retry loop, and the per-type execution logic that shapes
//! tool input and job output.

pub mod execute;
pub mod generator;
pub mod http;
pub mod prereq;
pub mod retry;

pub use execute::{execute_job, ExecutionOutcome};
pub use generator::{ArtifactGenerator, GeneratorError, ScriptedGenerator};
pub use http::AgentsClient;
pub use prereq::{check_prerequisites, JobContext, PrereqOutcome};
pub use retry::{generate_validated, GenerationError, GenerationOutcome};
