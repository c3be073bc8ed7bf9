//! Batch scheduling over the per-job state machine.
//!
//! A scheduler pass lists dequeueable jobs, oldest first, and runs them in
//! concurrency-bounded waves: each wave's tasks are joined to completion
//! before the next wave starts, so a workspace never has more than
//! `concurrency` jobs executing at once. Operator controls (retry, cancel,
//! status summary) live here too.

use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use pipeworks_core::status::JobStatus;
use pipeworks_core::types::DbId;
use pipeworks_store::{JobStore, StatusCounts};

use crate::lifecycle::{JobWorker, ProcessResult, WorkerError};

/// Limits for one scheduler pass.
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Most jobs one pass will dequeue.
    pub max_jobs: usize,
    /// Jobs executing at the same time.
    pub concurrency: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_jobs: 50,
            concurrency: 3,
        }
    }
}

/// Tally of one scheduler pass.
#[derive(Debug)]
pub struct BatchResult {
    /// Jobs a pass was run for, whatever the outcome.
    pub processed: usize,
    /// Jobs that reached `completed`.
    pub succeeded: usize,
    /// Jobs that reached terminal `failed`.
    pub failed: usize,
    pub results: Vec<ProcessResult>,
    pub total_duration_ms: u64,
}

impl JobWorker {
    /// Run one scheduler pass over pending jobs, optionally scoped to a
    /// workspace.
    pub async fn process_pending_jobs(
        &self,
        workspace_id: Option<DbId>,
        options: BatchOptions,
    ) -> Result<BatchResult, WorkerError> {
        let started = Instant::now();
        let concurrency = options.concurrency.max(1);
        let pending = self
            .store()
            .list_pending(workspace_id, options.max_jobs)
            .await?;
        debug!(
            count = pending.len(),
            ?workspace_id,
            "scheduler pass starting"
        );

        let mut results = Vec::with_capacity(pending.len());
        for wave in pending.chunks(concurrency) {
            let mut tasks = JoinSet::new();
            for job in wave {
                let worker = self.clone();
                let job_id = job.id;
                tasks.spawn(async move { worker.process_job(job_id).await });
            }
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Ok(result)) => results.push(result),
                    Ok(Err(err)) => warn!(%err, "job pass errored"),
                    Err(err) => warn!(%err, "job task panicked"),
                }
            }
        }

        let succeeded = results.iter().filter(|r| r.succeeded()).count();
        let failed = results
            .iter()
            .filter(|r| r.status == JobStatus::Failed)
            .count();
        let batch = BatchResult {
            processed: results.len(),
            succeeded,
            failed,
            results,
            total_duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            processed = batch.processed,
            succeeded = batch.succeeded,
            failed = batch.failed,
            duration_ms = batch.total_duration_ms,
            "scheduler pass finished"
        );
        Ok(batch)
    }

    /// Process the single oldest pending job, if any.
    pub async fn process_next_job(
        &self,
        workspace_id: Option<DbId>,
    ) -> Result<Option<ProcessResult>, WorkerError> {
        let Some(job) = self.store().list_pending(workspace_id, 1).await?.pop() else {
            return Ok(None);
        };
        Ok(Some(self.process_job(job.id).await?))
    }

    /// Reset a failed job's attempt budget and process it immediately.
    /// Returns `None` when the job is not in `failed`.
    pub async fn retry_job(&self, job_id: DbId) -> Result<Option<ProcessResult>, WorkerError> {
        let Some(job) = self.store().reset_for_retry(job_id).await? else {
            debug!(job_id, "retry requested for a job not in failed");
            return Ok(None);
        };
        info!(job_id, job_type = job.job_type.as_str(), "retrying failed job");
        Ok(Some(self.process_job(job.id).await?))
    }

    /// Cancel a pending or running job. Returns whether anything changed.
    /// A running job's in-flight attempt finishes but its result is
    /// discarded.
    pub async fn cancel_job(&self, job_id: DbId) -> Result<bool, WorkerError> {
        let cancelled = self.store().cancel(job_id).await?;
        if cancelled {
            info!(job_id, "job cancelled");
        }
        Ok(cancelled)
    }

    /// Job counts by status for one workspace.
    pub async fn job_status_summary(&self, workspace_id: DbId) -> Result<StatusCounts, WorkerError> {
        Ok(self.store().count_by_status(workspace_id).await?)
    }
}
