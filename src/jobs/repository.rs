use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

use super::{Job, JobCompletion, JobId, JobStatus};
use crate::error::{DublineError, ErrorKind, Result};

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: &Job) -> Result<()>;

    async fn get(&self, id: JobId) -> Result<Option<Job>>;

    async fn set_status(&self, id: JobId, status: JobStatus) -> Result<()>;

    async fn complete(&self, id: JobId, completion: JobCompletion) -> Result<()>;

    async fn fail(&self, id: JobId, kind: ErrorKind, message: &str) -> Result<()>;
}

const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_MAX_FINISHED: usize = 1000;

/// Nothing is persisted across restarts. Finished jobs are dropped once they
/// outlive the retention window or exceed the finished-job cap, oldest first.
pub struct InMemoryJobRepository {
    jobs: RwLock<HashMap<JobId, Job>>,
    retention: Duration,
    max_finished: usize,
}

impl Default for InMemoryJobRepository {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETENTION, DEFAULT_MAX_FINISHED)
    }
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Duration, max_finished: usize) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            retention,
            max_finished,
        }
    }

    /// Evict finished jobs past retention, then the oldest beyond the cap.
    fn evict_finished(&self, jobs: &mut HashMap<JobId, Job>, now: DateTime<Utc>) {
        let before = jobs.len();
        jobs.retain(|_, job| {
            !job.status.is_terminal()
                || now
                    .signed_duration_since(job.updated_at)
                    .to_std()
                    .map_or(true, |age| age < self.retention)
        });

        let mut finished: Vec<(DateTime<Utc>, JobId)> = jobs
            .values()
            .filter(|job| job.status.is_terminal())
            .map(|job| (job.updated_at, job.id))
            .collect();
        if finished.len() > self.max_finished {
            finished.sort_by_key(|(updated_at, _)| *updated_at);
            let excess = finished.len() - self.max_finished;
            for (_, id) in finished.into_iter().take(excess) {
                jobs.remove(&id);
            }
        }

        let evicted = before - jobs.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = jobs.len(), "Evicted finished jobs");
        }
    }

    async fn update<F>(&self, id: JobId, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Job) + Send,
    {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| DublineError::Queue(format!("Job not found: {}", id)))?;
        apply(job);
        job.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn create(&self, job: &Job) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(DublineError::Queue(format!("Job already exists: {}", job.id)));
        }
        self.evict_finished(&mut jobs, Utc::now());
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn set_status(&self, id: JobId, status: JobStatus) -> Result<()> {
        tracing::debug!(job_id = %id, status = %status, "Job status transition");
        self.update(id, |job| job.status = status).await
    }

    async fn complete(&self, id: JobId, completion: JobCompletion) -> Result<()> {
        self.update(id, |job| {
            job.status = JobStatus::Completed;
            job.warnings = completion.warnings;
            job.artifacts = completion.artifacts;
            job.translated_summary = completion.translated_summary;
        })
        .await
    }

    async fn fail(&self, id: JobId, kind: ErrorKind, message: &str) -> Result<()> {
        let message = message.to_string();
        self.update(id, |job| {
            job.status = JobStatus::Failed;
            job.error_kind = Some(kind);
            job.error_message = Some(message);
        })
        .await
    }
}
