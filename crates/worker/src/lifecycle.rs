//! The per-job processing state machine.
//!
//! One call to [`JobWorker::process_job`] performs at most one execution
//! attempt and ends with exactly one store transition:
//!
//! - deferred (execution mode, disabled worker): stays `pending`, no claim
//! - soft wait on a missing dependency: back to `pending`, attempt refunded
//! - hard failure with budget left: back to `pending`, attempt kept
//! - hard failure out of budget: `failed`, failure notified once
//! - needs user input: `waiting_input`, partial output persisted
//! - success: `completed`, output persisted, completion notified when the
//!   project stage clears the workspace notify threshold
//!
//! Cancellation is advisory: a cancel that lands mid-execution is honored
//! at the end of the attempt and the computed result is discarded.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use pipeworks_core::job_type::JobType;
use pipeworks_core::settings::{decide_run, RunDecision, WorkspaceSettings};
use pipeworks_core::stage::StageOrder;
use pipeworks_core::status::{JobStatus, RunStatus};
use pipeworks_core::types::DbId;

use pipeworks_events::{JobNotification, Notifier};
use pipeworks_pipeline::{
    check_prerequisites, execute_job, ArtifactGenerator, ExecutionOutcome, PrereqOutcome,
};
use pipeworks_store::{Job, JobStore, ProjectReader, SettingsReader, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Job {0} not found")]
    JobNotFound(DbId),
}

/// What one processing pass did to a job.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    pub job_id: DbId,
    pub job_type: JobType,
    /// The job's status after this pass.
    pub status: JobStatus,
    /// Informational note (defer reason, soft-wait dependency).
    pub message: Option<String>,
    /// Error text when the attempt failed.
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ProcessResult {
    pub fn succeeded(&self) -> bool {
        self.status == JobStatus::Completed
    }
}

/// Processes single jobs end to end. Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct JobWorker {
    store: Arc<dyn JobStore>,
    projects: Arc<dyn ProjectReader>,
    settings: Arc<dyn SettingsReader>,
    generator: Arc<dyn ArtifactGenerator>,
    notifier: Arc<dyn Notifier>,
}

impl JobWorker {
    pub fn new(
        store: Arc<dyn JobStore>,
        projects: Arc<dyn ProjectReader>,
        settings: Arc<dyn SettingsReader>,
        generator: Arc<dyn ArtifactGenerator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            projects,
            settings,
            generator,
            notifier,
        }
    }

    /// Run one processing pass for `job_id`.
    pub async fn process_job(&self, job_id: DbId) -> Result<ProcessResult, WorkerError> {
        let started = Instant::now();

        let Some(job) = self.store.get_job(job_id).await? else {
            return Err(WorkerError::JobNotFound(job_id));
        };
        let settings = self.settings.workspace_settings(job.workspace_id).await?;

        // Execution-mode gate, decided before any claim so deferred jobs
        // never consume attempt budget.
        if let RunDecision::Defer(reason) = decide_run(&settings, job.created_at, Utc::now()) {
            debug!(job_id, %reason, "job deferred");
            return Ok(result(&job, JobStatus::Pending, Some(reason), None, started));
        }

        let Some(job) = self.store.claim(job_id, Utc::now()).await? else {
            // Lost the race, or the job moved on since we listed it.
            let current = self.store.get_job(job_id).await?;
            let status = current.map(|j| j.status).unwrap_or(JobStatus::Pending);
            debug!(job_id, status = status.as_str(), "job not claimable");
            return Ok(result(
                &job,
                status,
                Some("job was not claimable".to_string()),
                None,
                started,
            ));
        };

        // Once claimed, the job must leave `running` whatever happens: an
        // unexpected store or reader error fails the attempt instead of
        // stranding the claim.
        match self.run_claimed(&job, &settings, started).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                warn!(job_id, %err, "unexpected error while executing, failing the attempt");
                self.finalize_failure(&job, None, &err.to_string(), &settings, started)
                    .await
            }
        }
    }

    /// Everything between a successful claim and the terminal store write.
    async fn run_claimed(
        &self,
        job: &Job,
        settings: &WorkspaceSettings,
        started: Instant,
    ) -> Result<ProcessResult, WorkerError> {
        let run_id = self.store.create_job_run(job.id, job.attempts).await?;

        let ctx = match check_prerequisites(job, self.projects.as_ref()).await? {
            PrereqOutcome::Ready(ctx) => ctx,
            PrereqOutcome::SoftWait(reason) => {
                info!(job_id = job.id, %reason, "job soft-waiting on dependency");
                self.store.release_soft_wait(job.id, Some(&reason)).await?;
                self.store
                    .update_job_run(run_id, RunStatus::Failed, Some(&format!("deferred: {reason}")))
                    .await?;
                return Ok(result(job, JobStatus::Pending, Some(reason), None, started));
            }
            PrereqOutcome::HardError(reason) => {
                return self
                    .finalize_failure(job, Some(run_id), &reason, settings, started)
                    .await;
            }
        };

        let execution = execute_job(job, &ctx, settings, self.generator.as_ref()).await;

        // Advisory cancellation: a cancel issued mid-execution wins over
        // whatever the attempt produced.
        if let Some(current) = self.store.get_job(job.id).await? {
            if current.status == JobStatus::Cancelled {
                info!(job_id = job.id, "job cancelled mid-execution, discarding result");
                self.store
                    .update_job_run(run_id, RunStatus::Failed, Some("cancelled while running"))
                    .await?;
                return Ok(result(
                    job,
                    JobStatus::Cancelled,
                    Some("cancelled while running".to_string()),
                    None,
                    started,
                ));
            }
        }

        match execution {
            Ok(ExecutionOutcome::Completed(output)) => {
                self.store.complete(job.id, output).await?;
                self.store
                    .update_job_run(run_id, RunStatus::Completed, None)
                    .await?;
                info!(job_id = job.id, job_type = job.job_type.as_str(), "job completed");
                self.notify(job, settings, JobStatus::Completed, None).await;
                Ok(result(job, JobStatus::Completed, None, None, started))
            }
            Ok(ExecutionOutcome::RequiresInput(ask)) => {
                self.store.mark_waiting_input(job.id, ask).await?;
                self.store
                    .update_job_run(run_id, RunStatus::WaitingInput, None)
                    .await?;
                info!(job_id = job.id, "job waiting for user input");
                self.notify(job, settings, JobStatus::WaitingInput, None).await;
                Ok(result(
                    job,
                    JobStatus::WaitingInput,
                    Some("waiting for user input".to_string()),
                    None,
                    started,
                ))
            }
            Err(err) => {
                self.finalize_failure(job, Some(run_id), &err.to_string(), settings, started)
                    .await
            }
        }
    }

    /// A counted attempt failed: retry while budget remains, otherwise fail
    /// terminally and notify once. `run_id` is `None` when the failure
    /// happened before an audit row could be opened.
    async fn finalize_failure(
        &self,
        job: &Job,
        run_id: Option<DbId>,
        error: &str,
        settings: &WorkspaceSettings,
        started: Instant,
    ) -> Result<ProcessResult, WorkerError> {
        if let Some(run_id) = run_id {
            self.store
                .update_job_run(run_id, RunStatus::Failed, Some(error))
                .await?;
        }

        if job.attempts >= job.max_attempts {
            warn!(
                job_id = job.id,
                attempts = job.attempts,
                %error,
                "job failed terminally"
            );
            self.store.fail(job.id, error).await?;
            self.notify(job, settings, JobStatus::Failed, Some(error)).await;
            return Ok(result(
                job,
                JobStatus::Failed,
                None,
                Some(error.to_string()),
                started,
            ));
        }

        warn!(
            job_id = job.id,
            attempt = job.attempts,
            max_attempts = job.max_attempts,
            %error,
            "attempt failed, returning job to queue"
        );
        self.store.return_to_pending(job.id, Some(error)).await?;
        Ok(result(
            job,
            JobStatus::Pending,
            Some(format!(
                "attempt {} of {} failed",
                job.attempts, job.max_attempts
            )),
            Some(error.to_string()),
            started,
        ))
    }

    /// Emit at most one notification for a terminal transition. Completions
    /// are gated on the workspace notify threshold; failures and input
    /// requests always go out. Never fails: the job is already finalized by
    /// the time this runs, and notification delivery is fire-and-forget.
    async fn notify(
        &self,
        job: &Job,
        settings: &WorkspaceSettings,
        status: JobStatus,
        error: Option<&str>,
    ) {
        let project = match job.project_id {
            Some(project_id) => match self.projects.get_project(project_id).await {
                Ok(project) => project,
                Err(err) => {
                    warn!(job_id = job.id, %err, "could not resolve project for notification");
                    None
                }
            },
            None => None,
        };

        if status == JobStatus::Completed {
            if let Some(project) = &project {
                let order = StageOrder::new(&settings.stage_order);
                if !order.should_notify(settings.notify_from_stage, project.current_stage) {
                    debug!(
                        job_id = job.id,
                        stage = project.current_stage.as_str(),
                        "completion below notify threshold, suppressed"
                    );
                    return;
                }
            }
        }

        self.notifier
            .notify(
                JobNotification {
                    job_id: job.id,
                    workspace_id: job.workspace_id,
                    project_id: job.project_id,
                    job_type: job.job_type,
                    status,
                    error: error.map(str::to_string),
                },
                project.as_ref().map(|p| p.name.as_str()),
            )
            .await;
    }

    pub(crate) fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }
}

fn result(
    job: &Job,
    status: JobStatus,
    message: Option<String>,
    error: Option<String>,
    started: Instant,
) -> ProcessResult {
    ProcessResult {
        job_id: job.id,
        job_type: job.job_type,
        status,
        message,
        error,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}
