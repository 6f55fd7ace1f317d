// # Background Jobs
//
// Deferred work is handed to a job service as a `BackgroundJob`. The only
// ordering the pipeline asks for is "run after job X", expressed by id, so any
// backend that honours predecessors can execute publish jobs: the in-process
// `LocalJobScheduler`, or an external queue that runs the `review_publish`
// binary against a serialized `JobOperation`.

mod local;

pub use local::{JobStatus, LocalJobScheduler};

use crate::review::error::ReviewError;
use crate::review::types::AssetExportInfo;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque job id issued by a job service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn generate() -> Self {
        JobId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        JobId(id)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        JobId(id.to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Arguments of a publish job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishPayload {
    pub asset: AssetExportInfo,
    pub comment: String,
}

/// Work a job performs when it runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "arguments", rename_all = "snake_case")]
pub enum JobOperation {
    PublishVersion(PublishPayload),
}

impl JobOperation {
    pub fn name(&self) -> &'static str {
        match self {
            JobOperation::PublishVersion(_) => "publish_version",
        }
    }
}

/// A unit of deferred work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundJob {
    pub title: String,
    pub description: String,
    /// Must not start before this job has finished, successfully or not
    pub predecessor: Option<JobId>,
    pub operation: JobOperation,
    /// Host to run on; `None` lets the service choose
    pub execution_host: Option<String>,
}

/// Job service the orchestrator submits to. Submission must not block on execution.
pub trait JobScheduler: Send + Sync {
    fn submit(&self, job: BackgroundJob) -> Result<JobId, ReviewError>;
}

/// Executes a job's operation
#[async_trait::async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, operation: JobOperation) -> Result<(), ReviewError>;
}
