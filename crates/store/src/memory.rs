//! In-memory reference implementation of the store seams.
//!
//! Every operation takes one write or read lock over the whole state, which
//! gives the per-row atomicity the contracts require. The claim operation
//! is a genuine compare-and-swap: a second concurrent claim of the same job
//! observes `running` and gets `None`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use pipeworks_core::job_type::ArtifactType;
use pipeworks_core::settings::WorkspaceSettings;
use pipeworks_core::stage::Stage;
use pipeworks_core::status::{JobStatus, RunStatus};
use pipeworks_core::types::{DbId, Timestamp};

use crate::error::StoreError;
use crate::models::{Artifact, Job, JobRun, NewJob, Project, StatusCounts, Ticket};
use crate::traits::{JobStore, ProjectReader, SettingsReader};

#[derive(Default)]
struct Inner {
    jobs: HashMap<DbId, Job>,
    runs: HashMap<DbId, JobRun>,
    projects: HashMap<DbId, Project>,
    artifacts: Vec<Artifact>,
    tickets: Vec<Ticket>,
    settings: HashMap<DbId, WorkspaceSettings>,
    next_id: DbId,
}

impl Inner {
    fn allocate_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory store backing tests and local development.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a project. Test/dev helper.
    pub async fn insert_project(
        &self,
        workspace_id: DbId,
        name: &str,
        current_stage: Stage,
    ) -> Project {
        let mut inner = self.inner.write().await;
        let id = inner.allocate_id();
        let project = Project {
            id,
            workspace_id,
            name: name.to_string(),
            current_stage,
        };
        inner.projects.insert(id, project.clone());
        project
    }

    /// Seed an artifact. Test/dev helper.
    pub async fn insert_artifact(
        &self,
        project_id: DbId,
        artifact_type: ArtifactType,
        content: &str,
    ) -> Artifact {
        let mut inner = self.inner.write().await;
        let id = inner.allocate_id();
        let artifact = Artifact {
            id,
            project_id,
            artifact_type,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        inner.artifacts.push(artifact.clone());
        artifact
    }

    /// Seed a ticket. Test/dev helper.
    pub async fn insert_ticket(&self, project_id: DbId, title: &str) -> Ticket {
        let mut inner = self.inner.write().await;
        let id = inner.allocate_id();
        let ticket = Ticket {
            id,
            project_id,
            title: title.to_string(),
            description: None,
        };
        inner.tickets.push(ticket.clone());
        ticket
    }

    /// Set a workspace's automation settings. Test/dev helper.
    pub async fn set_settings(&self, workspace_id: DbId, settings: WorkspaceSettings) {
        self.inner.write().await.settings.insert(workspace_id, settings);
    }

    /// Backdate a job's creation time, for age-based execution-mode tests.
    pub async fn set_created_at(&self, job_id: DbId, created_at: Timestamp) {
        if let Some(job) = self.inner.write().await.jobs.get_mut(&job_id) {
            job.created_at = created_at;
        }
    }
}

fn job_mut<'a>(inner: &'a mut Inner, id: DbId) -> Result<&'a mut Job, StoreError> {
    inner
        .jobs
        .get_mut(&id)
        .ok_or(StoreError::NotFound { entity: "job", id })
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn submit(&self, new: NewJob) -> Result<Job, StoreError> {
        let mut inner = self.inner.write().await;
        let id = inner.allocate_id();
        let job = Job {
            id,
            workspace_id: new.workspace_id,
            project_id: new.project_id,
            job_type: new.job_type,
            status: JobStatus::Pending,
            input: new.input.clone(),
            output: None,
            error: None,
            attempts: 0,
            max_attempts: new.max_attempts_or_default(),
            progress: 0.0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        inner.jobs.insert(id, job.clone());
        Ok(job)
    }

    async fn get_job(&self, id: DbId) -> Result<Option<Job>, StoreError> {
        Ok(self.inner.read().await.jobs.get(&id).cloned())
    }

    async fn list_pending(
        &self,
        workspace_id: Option<DbId>,
        limit: usize,
    ) -> Result<Vec<Job>, StoreError> {
        let inner = self.inner.read().await;
        let mut ready: Vec<Job> = inner
            .jobs
            .values()
            .filter(|job| job.is_dequeueable())
            .filter(|job| workspace_id.is_none_or(|ws| job.workspace_id == ws))
            .cloned()
            .collect();
        // Oldest first; ids break creation-time ties deterministically.
        ready.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        ready.truncate(limit);
        Ok(ready)
    }

    async fn claim(&self, id: DbId, now: Timestamp) -> Result<Option<Job>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(job) = inner.jobs.get_mut(&id) else {
            return Ok(None);
        };
        if !job.is_dequeueable() {
            return Ok(None);
        }
        job.status = JobStatus::Running;
        job.attempts += 1;
        job.started_at = Some(now);
        job.progress = 0.0;
        Ok(Some(job.clone()))
    }

    async fn complete(&self, id: DbId, output: Value) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let job = job_mut(&mut inner, id)?;
        job.status = JobStatus::Completed;
        job.output = Some(output);
        job.error = None;
        job.progress = 1.0;
        job.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn fail(&self, id: DbId, error: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let job = job_mut(&mut inner, id)?;
        job.status = JobStatus::Failed;
        job.error = Some(error.to_string());
        job.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn return_to_pending(&self, id: DbId, error: Option<&str>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let job = job_mut(&mut inner, id)?;
        job.status = JobStatus::Pending;
        job.started_at = None;
        if let Some(error) = error {
            job.error = Some(error.to_string());
        }
        Ok(())
    }

    async fn release_soft_wait(&self, id: DbId, note: Option<&str>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let job = job_mut(&mut inner, id)?;
        job.status = JobStatus::Pending;
        // Dependency waits never consume attempt budget.
        job.attempts = (job.attempts - 1).max(0);
        job.started_at = None;
        job.error = note.map(str::to_string);
        Ok(())
    }

    async fn mark_waiting_input(&self, id: DbId, output: Value) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let job = job_mut(&mut inner, id)?;
        job.status = JobStatus::WaitingInput;
        job.output = Some(output);
        Ok(())
    }

    async fn cancel(&self, id: DbId) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let job = job_mut(&mut inner, id)?;
        if !job.status.is_cancellable() {
            return Ok(false);
        }
        job.status = JobStatus::Cancelled;
        job.completed_at = Some(Utc::now());
        Ok(true)
    }

    async fn reset_for_retry(&self, id: DbId) -> Result<Option<Job>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(job) = inner.jobs.get_mut(&id) else {
            return Ok(None);
        };
        if job.status != JobStatus::Failed {
            return Ok(None);
        }
        job.status = JobStatus::Pending;
        job.attempts = 0;
        job.error = None;
        job.progress = 0.0;
        job.started_at = None;
        job.completed_at = None;
        Ok(Some(job.clone()))
    }

    async fn create_job_run(&self, job_id: DbId, attempt: i32) -> Result<DbId, StoreError> {
        let mut inner = self.inner.write().await;
        let id = inner.allocate_id();
        inner.runs.insert(
            id,
            JobRun {
                id,
                job_id,
                attempt,
                status: RunStatus::Running,
                error_detail: None,
                started_at: Utc::now(),
                finished_at: None,
            },
        );
        Ok(id)
    }

    async fn update_job_run(
        &self,
        run_id: DbId,
        status: RunStatus,
        error_detail: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let run = inner.runs.get_mut(&run_id).ok_or(StoreError::NotFound {
            entity: "job_run",
            id: run_id,
        })?;
        run.status = status;
        run.error_detail = error_detail.map(str::to_string);
        run.finished_at = Some(Utc::now());
        Ok(())
    }

    async fn list_job_runs(&self, job_id: DbId) -> Result<Vec<JobRun>, StoreError> {
        let inner = self.inner.read().await;
        let mut runs: Vec<JobRun> = inner
            .runs
            .values()
            .filter(|run| run.job_id == job_id)
            .cloned()
            .collect();
        runs.sort_by_key(|run| run.attempt);
        Ok(runs)
    }

    async fn count_by_status(&self, workspace_id: DbId) -> Result<StatusCounts, StoreError> {
        let inner = self.inner.read().await;
        let mut counts = StatusCounts::default();
        for job in inner.jobs.values() {
            if job.workspace_id == workspace_id {
                counts.record(job.status);
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl ProjectReader for MemoryStore {
    async fn get_project(&self, id: DbId) -> Result<Option<Project>, StoreError> {
        Ok(self.inner.read().await.projects.get(&id).cloned())
    }

    async fn get_artifact(
        &self,
        project_id: DbId,
        artifact_type: ArtifactType,
    ) -> Result<Option<Artifact>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .artifacts
            .iter()
            .filter(|a| a.project_id == project_id && a.artifact_type == artifact_type)
            .max_by_key(|a| a.created_at)
            .cloned())
    }

    async fn list_tickets(&self, project_id: DbId) -> Result<Vec<Ticket>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .tickets
            .iter()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SettingsReader for MemoryStore {
    async fn workspace_settings(&self, workspace_id: DbId) -> Result<WorkspaceSettings, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .settings
            .get(&workspace_id)
            .cloned()
            .unwrap_or_default())
    }
}
