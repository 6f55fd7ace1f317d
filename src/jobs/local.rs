use crate::jobs::{BackgroundJob, JobId, JobRunner, JobScheduler};
use crate::review::error::ReviewError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Finished jobs are evicted once this many jobs are tracked
const RETAINED_JOBS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed(_))
    }
}

struct JobEntry {
    sequence: u64,
    title: String,
    submitted_at: DateTime<Utc>,
    status: Arc<watch::Sender<JobStatus>>,
}

/// Job service that runs jobs as tasks on a tokio runtime.
///
/// A job with a predecessor waits until that predecessor reaches a terminal
/// state. Predecessor ids this scheduler never issued (e.g. the host's own render
/// jobs) are treated as finished, which also covers jobs evicted by
/// `prune_finished`.
#[derive(Clone)]
pub struct LocalJobScheduler {
    runtime_handle: tokio::runtime::Handle,
    runner: Arc<dyn JobRunner>,
    jobs: Arc<Mutex<HashMap<JobId, JobEntry>>>,
    next_sequence: Arc<AtomicU64>,
}

impl LocalJobScheduler {
    pub fn new(runtime_handle: tokio::runtime::Handle, runner: Arc<dyn JobRunner>) -> Self {
        Self {
            runtime_handle,
            runner,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            next_sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    fn subscribe(&self, job_id: &JobId) -> Option<watch::Receiver<JobStatus>> {
        self.jobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(job_id)
            .map(|entry| entry.status.subscribe())
    }

    pub fn status(&self, job_id: &JobId) -> Option<JobStatus> {
        self.jobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(job_id)
            .map(|entry| entry.status.borrow().clone())
    }

    /// Wait for a job to succeed or fail. `None` for unknown ids.
    pub async fn wait_for(&self, job_id: &JobId) -> Option<JobStatus> {
        let mut rx = self.subscribe(job_id)?;
        let waited = rx
            .wait_for(JobStatus::is_terminal)
            .await
            .map(|status| status.clone());
        match waited {
            Ok(status) => Some(status),
            Err(_) => Some(rx.borrow().clone()),
        }
    }

    /// Forget jobs that have succeeded or failed. Returns how many were removed.
    pub fn prune_finished(&self) -> usize {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        let before = jobs.len();
        jobs.retain(|_, entry| !entry.status.borrow().is_terminal());
        before - jobs.len()
    }

    /// Titles and submission times of all known jobs, oldest first
    pub fn jobs(&self) -> Vec<(JobId, String, DateTime<Utc>)> {
        let mut jobs: Vec<_> = self
            .jobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(id, entry)| {
                (
                    entry.sequence,
                    (id.clone(), entry.title.clone(), entry.submitted_at),
                )
            })
            .collect();
        jobs.sort_by_key(|(sequence, _)| *sequence);
        jobs.into_iter().map(|(_, job)| job).collect()
    }
}

impl JobScheduler for LocalJobScheduler {
    fn submit(&self, job: BackgroundJob) -> Result<JobId, ReviewError> {
        let job_id = JobId::generate();
        let (status_tx, _) = watch::channel(JobStatus::Queued);
        let status_tx = Arc::new(status_tx);

        let predecessor = match &job.predecessor {
            Some(predecessor_id) => {
                let rx = self.subscribe(predecessor_id);
                if rx.is_none() {
                    debug!(
                        "Predecessor {} is not a local job, treating as finished",
                        predecessor_id
                    );
                }
                rx
            }
            None => None,
        };

        if self.jobs.lock().unwrap_or_else(|e| e.into_inner()).len() >= RETAINED_JOBS {
            let pruned = self.prune_finished();
            debug!("Evicted {} finished job(s)", pruned);
        }

        self.jobs.lock().unwrap_or_else(|e| e.into_inner()).insert(
            job_id.clone(),
            JobEntry {
                sequence: self.next_sequence.fetch_add(1, Ordering::SeqCst),
                title: job.title.clone(),
                submitted_at: Utc::now(),
                status: status_tx.clone(),
            },
        );

        if let Some(host) = &job.execution_host {
            debug!("Job {} requested host '{}', running locally", job_id, host);
        }

        info!(
            "Submitted job {} '{}' ({}), after: {}",
            job_id,
            job.title,
            job.operation.name(),
            job.predecessor
                .as_ref()
                .map(JobId::to_string)
                .unwrap_or_else(|| "none".to_string())
        );

        let runner = self.runner.clone();
        let task_id = job_id.clone();
        self.runtime_handle.spawn(async move {
            if let Some(mut rx) = predecessor {
                if rx.wait_for(JobStatus::is_terminal).await.is_err() {
                    warn!("Predecessor of job {} vanished, starting anyway", task_id);
                }
            }

            status_tx.send_replace(JobStatus::Running);
            debug!("Job {} running", task_id);

            let status = match runner.run(job.operation).await {
                Ok(()) => {
                    info!("Job {} '{}' succeeded", task_id, job.title);
                    JobStatus::Succeeded
                }
                Err(e) => {
                    error!("Job {} '{}' failed: {}", task_id, job.title, e);
                    JobStatus::Failed(e.to_string())
                }
            };
            status_tx.send_replace(status);
        });

        Ok(job_id)
    }
}
