// Test support utilities for both unit and integration tests

use crate::jobs::{BackgroundJob, JobId, JobScheduler};
use crate::remote::{Filter, RecordId, RemoteEntity, RemoteError, RemoteRecord, RemoteService};
use crate::review::collaborators::{CommentPrompt, MetricsSink, SummaryReporter};
use crate::review::error::ReviewError;
use crate::review::thumbnail::FrameReader;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// A file upload seen by `MockRemoteService`
#[derive(Debug, Clone, PartialEq)]
pub struct UploadCall {
    pub entity: RemoteEntity,
    pub file_path: PathBuf,
    pub field: String,
}

/// Mock remote service for testing
///
/// Keeps records in memory and logs uploads instead of talking to a server.
pub struct MockRemoteService {
    records: Mutex<Vec<RemoteRecord>>,
    uploads: Mutex<Vec<UploadCall>>,
    thumbnails: Mutex<Vec<RemoteEntity>>,
    next_id: AtomicI64,
    writes: AtomicUsize,
    unavailable: AtomicBool,
    fail_uploads: AtomicBool,
    consume_uploads: AtomicBool,
}

impl Default for MockRemoteService {
    fn default() -> Self {
        MockRemoteService {
            records: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            thumbnails: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
            writes: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
            fail_uploads: AtomicBool::new(false),
            consume_uploads: AtomicBool::new(false),
        }
    }
}

impl MockRemoteService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record directly, bypassing the write counter
    pub fn seed(&self, entity_type: &str, fields: Value) -> RemoteRecord {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let record = RemoteRecord {
            entity_type: entity_type.to_string(),
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            fields,
        };
        self.records.lock().unwrap().push(record.clone());
        record
    }

    pub fn records_of_type(&self, entity_type: &str) -> Vec<RemoteRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.entity_type == entity_type)
            .cloned()
            .collect()
    }

    pub fn record(&self, entity: &RemoteEntity) -> Option<RemoteRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.entity_type == entity.entity_type && r.id == entity.id)
            .cloned()
    }

    pub fn uploads(&self) -> Vec<UploadCall> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn thumbnail_uploads(&self) -> Vec<RemoteEntity> {
        self.thumbnails.lock().unwrap().clone()
    }

    /// Number of creates and uploads performed
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Delete the source file of each successful media upload, so the
    /// caller's own cleanup of that file fails
    pub fn set_consume_uploads(&self, consume: bool) {
        self.consume_uploads.store(consume, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RemoteError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("mock service offline".to_string()));
        }
        Ok(())
    }

    fn check_upload(&self, file_path: &Path) -> Result<(), RemoteError> {
        self.check_available()?;
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(RemoteError::Status {
                status: 502,
                body: "upload rejected".to_string(),
            });
        }
        if !file_path.exists() {
            return Err(RemoteError::Io(std::io::Error::from(
                std::io::ErrorKind::NotFound,
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RemoteService for MockRemoteService {
    async fn find_one(
        &self,
        entity_type: &str,
        filters: &[Filter],
    ) -> Result<Option<RemoteRecord>, RemoteError> {
        self.check_available()?;
        // Let concurrent resolvers interleave between find and create
        tokio::task::yield_now().await;

        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .find(|r| {
                r.entity_type == entity_type
                    && filters
                        .iter()
                        .all(|f| f.relation == "is" && r.fields.get(&f.field) == Some(&f.value))
            })
            .cloned())
    }

    async fn create(
        &self,
        entity_type: &str,
        fields: Map<String, Value>,
    ) -> Result<RemoteRecord, RemoteError> {
        self.check_available()?;
        tokio::task::yield_now().await;

        self.writes.fetch_add(1, Ordering::SeqCst);
        let record = RemoteRecord {
            entity_type: entity_type.to_string(),
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            fields,
        };
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn upload(
        &self,
        entity_type: &str,
        id: RecordId,
        file_path: &Path,
        field: &str,
    ) -> Result<(), RemoteError> {
        self.check_upload(file_path)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.uploads.lock().unwrap().push(UploadCall {
            entity: RemoteEntity::new(entity_type, id),
            file_path: file_path.to_path_buf(),
            field: field.to_string(),
        });
        if self.consume_uploads.load(Ordering::SeqCst) {
            tokio::fs::remove_file(file_path).await?;
        }
        Ok(())
    }

    async fn upload_thumbnail(
        &self,
        entity_type: &str,
        id: RecordId,
        file_path: &Path,
    ) -> Result<(), RemoteError> {
        self.check_upload(file_path)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.thumbnails
            .lock()
            .unwrap()
            .push(RemoteEntity::new(entity_type, id));
        Ok(())
    }
}

/// Job scheduler that only records what was submitted
#[derive(Default)]
pub struct RecordingScheduler {
    jobs: Mutex<Vec<(JobId, BackgroundJob)>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> Vec<(JobId, BackgroundJob)> {
        self.jobs.lock().unwrap().clone()
    }
}

impl JobScheduler for RecordingScheduler {
    fn submit(&self, job: BackgroundJob) -> Result<JobId, ReviewError> {
        let mut jobs = self.jobs.lock().unwrap();
        let job_id = JobId(format!("job-{}", jobs.len() + 1));
        jobs.push((job_id.clone(), job));
        Ok(job_id)
    }
}

/// Frame reader double: writes a stub JPEG, or fails like a non-zero exit
pub struct FakeFrameReader {
    exit_code: Option<i32>,
    calls: AtomicUsize,
}

impl FakeFrameReader {
    pub fn succeeding() -> Self {
        Self {
            exit_code: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(exit_code: i32) -> Self {
        Self {
            exit_code: Some(exit_code),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl FrameReader for FakeFrameReader {
    async fn read_frame(
        &self,
        _media_path: &Path,
        _width: u32,
        _height: u32,
        output_path: &Path,
    ) -> Result<(), ReviewError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.exit_code {
            None => {
                tokio::fs::write(output_path, [0xFF, 0xD8, 0xFF, 0xD9]).await?;
                Ok(())
            }
            Some(code) => Err(ReviewError::ExternalTool {
                tool: "read_frame".to_string(),
                exit_code: Some(code),
                stderr: "cannot open clip".to_string(),
            }),
        }
    }
}

/// Comment prompt with a canned answer; `None` simulates cancel
pub struct CannedComment(pub Option<String>);

impl CommentPrompt for CannedComment {
    fn request_comment(&self) -> Option<String> {
        self.0.clone()
    }
}

#[derive(Default)]
pub struct RecordingSummary {
    reports: Mutex<Vec<bool>>,
}

impl RecordingSummary {
    pub fn reports(&self) -> Vec<bool> {
        self.reports.lock().unwrap().clone()
    }
}

impl SummaryReporter for RecordingSummary {
    fn report(&self, success: bool) {
        self.reports.lock().unwrap().push(success);
    }
}

/// Metrics sink that counts events and can be told to fail
#[derive(Default)]
pub struct RecordingMetrics {
    events: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingMetrics {
    pub fn failing() -> Self {
        let metrics = Self::default();
        metrics.fail.store(true, Ordering::SeqCst);
        metrics
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl MetricsSink for RecordingMetrics {
    fn emit(&self, event: &str) -> Result<(), ReviewError> {
        self.events.lock().unwrap().push(event.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(ReviewError::Job("metrics endpoint unreachable".to_string()));
        }
        Ok(())
    }
}
