//! The adapter contracts the worker consumes.
//!
//! A store implementation must give at least read-modify-write atomicity
//! per job row. [`JobStore::claim`] in particular is specified as a
//! conditional update (compare-and-swap on `pending` status with remaining
//! attempt budget) so that two scheduler instances cannot both claim one
//! job.

use async_trait::async_trait;
use serde_json::Value;

use pipeworks_core::job_type::ArtifactType;
use pipeworks_core::settings::WorkspaceSettings;
use pipeworks_core::status::RunStatus;
use pipeworks_core::types::{DbId, Timestamp};

use crate::error::StoreError;
use crate::models::{Artifact, Job, JobRun, NewJob, Project, StatusCounts, Ticket};

/// Durable job queue operations.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new pending job.
    async fn submit(&self, new: NewJob) -> Result<Job, StoreError>;

    /// Fetch one job by id.
    async fn get_job(&self, id: DbId) -> Result<Option<Job>, StoreError>;

    /// List dequeueable jobs (pending, attempts below budget), oldest
    /// created first, optionally scoped to one workspace.
    async fn list_pending(
        &self,
        workspace_id: Option<DbId>,
        limit: usize,
    ) -> Result<Vec<Job>, StoreError>;

    /// Atomically claim a pending job for execution: `pending` → `running`,
    /// attempt counter incremented, `started_at` set, progress reset.
    ///
    /// Returns `None` when the job is no longer claimable (already claimed,
    /// terminal, or out of attempt budget).
    async fn claim(&self, id: DbId, now: Timestamp) -> Result<Option<Job>, StoreError>;

    /// Record successful completion: output persisted, progress forced to 1.
    async fn complete(&self, id: DbId, output: Value) -> Result<(), StoreError>;

    /// Record terminal failure with its error message.
    async fn fail(&self, id: DbId, error: &str) -> Result<(), StoreError>;

    /// Return a job to pending after a counted (hard) attempt failure,
    /// keeping the attempt increment and recording the error for operators.
    async fn return_to_pending(&self, id: DbId, error: Option<&str>) -> Result<(), StoreError>;

    /// Release a job that soft-waited on a dependency: `running` → `pending`
    /// with the claim's attempt increment rolled back and `started_at`
    /// cleared. Dependency waiting never consumes retry budget.
    async fn release_soft_wait(&self, id: DbId, note: Option<&str>) -> Result<(), StoreError>;

    /// Park a job awaiting an external decision, persisting partial output.
    async fn mark_waiting_input(&self, id: DbId, output: Value) -> Result<(), StoreError>;

    /// Cancel a job if it is still pending or running. Returns whether the
    /// transition happened.
    async fn cancel(&self, id: DbId) -> Result<bool, StoreError>;

    /// Reset a `failed` job for explicit retry: pending, attempts zeroed,
    /// error and timestamps cleared. Returns `None` when the job is not in
    /// `failed`.
    async fn reset_for_retry(&self, id: DbId) -> Result<Option<Job>, StoreError>;

    /// Open an audit row for one execution attempt.
    async fn create_job_run(&self, job_id: DbId, attempt: i32) -> Result<DbId, StoreError>;

    /// Finalize an attempt's audit row.
    async fn update_job_run(
        &self,
        run_id: DbId,
        status: RunStatus,
        error_detail: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Audit trail for one job, oldest attempt first.
    async fn list_job_runs(&self, job_id: DbId) -> Result<Vec<JobRun>, StoreError>;

    /// Job counts by status for one workspace.
    async fn count_by_status(&self, workspace_id: DbId) -> Result<StatusCounts, StoreError>;
}

/// Read-only access to projects and their pipeline artifacts.
#[async_trait]
pub trait ProjectReader: Send + Sync {
    async fn get_project(&self, id: DbId) -> Result<Option<Project>, StoreError>;

    /// Latest artifact of a given type for a project, if any.
    async fn get_artifact(
        &self,
        project_id: DbId,
        artifact_type: ArtifactType,
    ) -> Result<Option<Artifact>, StoreError>;

    async fn list_tickets(&self, project_id: DbId) -> Result<Vec<Ticket>, StoreError>;
}

/// Read-only access to per-workspace automation settings.
#[async_trait]
pub trait SettingsReader: Send + Sync {
    async fn workspace_settings(&self, workspace_id: DbId) -> Result<WorkspaceSettings, StoreError>;
}
