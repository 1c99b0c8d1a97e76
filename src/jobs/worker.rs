use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::Instrument;

use super::{JobCompletion, JobId, JobRepository, JobStatus};
use crate::error::{DublineError, Result};
use crate::notify::Notifier;
use crate::pipeline::{DubRequest, Pipeline, Stage, StageListener};
use crate::summarize::Summarizer;
use crate::workspace::RunWorkspace;

#[derive(Debug, Clone)]
pub enum JobPayload {
    Dub {
        request: DubRequest,
        email: Option<String>,
    },
    Summarize {
        url: String,
        language: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct JobMessage {
    pub job_id: JobId,
    pub payload: JobPayload,
}

/// Mirrors pipeline stages into the job repository
struct RepositoryListener {
    job_id: JobId,
    repository: Arc<dyn JobRepository>,
}

#[async_trait]
impl StageListener for RepositoryListener {
    async fn on_stage(&self, stage: Stage) {
        let Some(status) = JobStatus::from_stage(stage) else {
            return;
        };
        if let Err(e) = self.repository.set_status(self.job_id, status).await {
            tracing::warn!(error = %e, "Failed to record job status");
        }
    }
}

/// Everything a single job needs; cloned into each spawned task
#[derive(Clone)]
pub struct JobRunner {
    pub pipeline: Arc<Pipeline>,
    pub summarizer: Arc<Summarizer>,
    pub repository: Arc<dyn JobRepository>,
    pub notifier: Option<Arc<dyn Notifier>>,
    pub workspace_root: PathBuf,
    pub keep_artifacts: bool,
}

impl JobRunner {
    pub async fn process(&self, msg: JobMessage) {
        let job_id = msg.job_id;
        let result = match msg.payload {
            JobPayload::Dub { request, email } => self.process_dub(job_id, request, email).await,
            JobPayload::Summarize { url, language } => {
                self.process_summary(job_id, url, language).await
            }
        };

        match result {
            Ok(completion) => {
                if let Err(e) = self.repository.complete(job_id, completion).await {
                    tracing::error!(error = %e, "Failed to record job completion");
                } else {
                    tracing::info!("Job completed");
                }
            }
            Err(e) => {
                tracing::error!(kind = e.kind().as_str(), error = %e, "Job failed");
                if let Err(repo_err) = self.repository.fail(job_id, e.kind(), &e.to_string()).await {
                    tracing::error!(error = %repo_err, "Failed to record job failure");
                }
            }
        }
    }

    fn listener(&self, job_id: JobId) -> RepositoryListener {
        RepositoryListener {
            job_id,
            repository: Arc::clone(&self.repository),
        }
    }

    async fn process_dub(
        &self,
        job_id: JobId,
        request: DubRequest,
        email: Option<String>,
    ) -> Result<JobCompletion> {
        let workspace = RunWorkspace::create(&self.workspace_root, job_id.as_uuid()).await?;
        let outcome = match self.pipeline.run(&request, &workspace, &self.listener(job_id)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.discard(workspace).await;
                return Err(e);
            }
        };

        let mut warnings = outcome.warnings.clone();
        let mut delivered = false;
        match (email.as_deref(), &self.notifier) {
            (Some(recipient), Some(notifier)) => {
                self.repository.set_status(job_id, JobStatus::Delivering).await?;
                notifier.deliver(recipient, &outcome.deliverables()).await?;
                delivered = true;
            }
            (Some(_), None) => {
                warnings.push("mail delivery is disabled; artifacts kept on disk".to_string());
            }
            (None, _) => {}
        }

        // Without delivery the run directory is the only copy of the results.
        if delivered {
            self.discard(workspace).await;
        }

        Ok(JobCompletion {
            warnings,
            artifacts: outcome.artifacts,
            translated_summary: None,
        })
    }

    async fn process_summary(
        &self,
        job_id: JobId,
        url: String,
        language: Option<String>,
    ) -> Result<JobCompletion> {
        let workspace = RunWorkspace::create(&self.workspace_root, job_id.as_uuid()).await?;
        let result = self
            .summarizer
            .summarize(&url, language.as_deref(), &workspace, &self.listener(job_id))
            .await;
        self.discard(workspace).await;

        Ok(JobCompletion {
            translated_summary: Some(result?),
            ..Default::default()
        })
    }

    async fn discard(&self, workspace: RunWorkspace) {
        if self.keep_artifacts {
            return;
        }
        if let Err(e) = workspace.cleanup().await {
            tracing::warn!(error = %e, "Failed to remove run workspace");
        }
    }
}

/// Drains the job channel, running at most `max_concurrent` jobs at once
pub struct JobWorker {
    receiver: mpsc::Receiver<JobMessage>,
    runner: JobRunner,
    limit: Arc<Semaphore>,
}

impl JobWorker {
    pub fn new(receiver: mpsc::Receiver<JobMessage>, runner: JobRunner, max_concurrent: usize) -> Self {
        Self {
            receiver,
            runner,
            limit: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub async fn run(mut self) {
        tracing::info!("Job worker started");
        while let Some(msg) = self.receiver.recv().await {
            let permit = match Arc::clone(&self.limit).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::error!(error = %e, "Job limiter closed");
                    break;
                }
            };

            let span = tracing::info_span!("job", job_id = %msg.job_id);
            let runner = self.runner.clone();
            tokio::spawn(
                async move {
                    let _permit = permit;
                    runner.process(msg).await;
                }
                .instrument(span),
            );
        }
        tracing::info!("Job worker stopped: channel closed");
    }
}

/// Submitting side of the job channel
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<JobMessage>,
    repository: Arc<dyn JobRepository>,
}

impl JobQueue {
    pub fn new(sender: mpsc::Sender<JobMessage>, repository: Arc<dyn JobRepository>) -> Self {
        Self { sender, repository }
    }

    /// Bounded channel plus its queue handle
    pub fn channel(capacity: usize, repository: Arc<dyn JobRepository>) -> (Self, mpsc::Receiver<JobMessage>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self::new(sender, repository), receiver)
    }

    pub fn repository(&self) -> &Arc<dyn JobRepository> {
        &self.repository
    }

    /// Claim a queue slot without blocking; fails when the queue is full.
    pub fn reserve(&self) -> Result<QueueSlot<'_>> {
        let permit = self.sender.try_reserve().map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DublineError::Queue("job queue is full".to_string()),
            mpsc::error::TrySendError::Closed(_) => DublineError::Queue("job worker is not running".to_string()),
        })?;
        Ok(QueueSlot {
            permit,
            repository: &self.repository,
        })
    }
}

pub struct QueueSlot<'a> {
    permit: mpsc::Permit<'a, JobMessage>,
    repository: &'a Arc<dyn JobRepository>,
}

impl QueueSlot<'_> {
    /// Record the job and hand it to the worker.
    pub async fn submit(self, job: &super::Job, payload: JobPayload) -> Result<JobId> {
        self.repository.create(job).await?;
        self.permit.send(JobMessage {
            job_id: job.id,
            payload,
        });
        Ok(job.id)
    }
}
