// # Remote Service
//
// Find/create/upload surface of the project-management service that review
// records are published to. The pipeline only talks to `RemoteService`, so the
// HTTP client can be swapped for an in-memory double in tests.

mod http;

pub use http::HttpRemoteService;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub type RecordId = i64;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Remote service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Unexpected response: {0}")]
    Decode(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Remote service unavailable: {0}")]
    Unavailable(String),
}

impl RemoteError {
    /// Whether the caller may retry the same request later
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Request(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            RemoteError::Status { status, .. } => *status == 429 || *status >= 500,
            RemoteError::Unavailable(_) => true,
            RemoteError::Decode(_) | RemoteError::Serialization(_) | RemoteError::Io(_) => false,
        }
    }
}

/// Reference to a remote object: `{type, id}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteEntity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub id: RecordId,
}

impl RemoteEntity {
    pub fn new(entity_type: impl Into<String>, id: RecordId) -> Self {
        Self {
            entity_type: entity_type.into(),
            id,
        }
    }

    /// Link value used when another record points at this entity
    pub fn link(&self) -> Value {
        json!({ "type": self.entity_type, "id": self.id })
    }
}

/// A record returned by the remote service. Fields other than type/id are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RemoteRecord {
    pub fn entity(&self) -> RemoteEntity {
        RemoteEntity::new(self.entity_type.clone(), self.id)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Single `[field, relation, value]` query condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub relation: String,
    pub value: Value,
}

impl Filter {
    /// Equality condition
    pub fn is(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            relation: "is".to_string(),
            value: value.into(),
        }
    }

    /// Wire form used by the search endpoint
    pub fn to_json(&self) -> Value {
        json!([self.field, self.relation, self.value])
    }
}

/// Trait for remote service operations (allows mocking for tests)
#[async_trait::async_trait]
pub trait RemoteService: Send + Sync {
    async fn find_one(
        &self,
        entity_type: &str,
        filters: &[Filter],
    ) -> Result<Option<RemoteRecord>, RemoteError>;

    async fn create(
        &self,
        entity_type: &str,
        fields: Map<String, Value>,
    ) -> Result<RemoteRecord, RemoteError>;

    /// Upload a file into a named file slot of an existing record
    async fn upload(
        &self,
        entity_type: &str,
        id: RecordId,
        file_path: &Path,
        field: &str,
    ) -> Result<(), RemoteError>;

    async fn upload_thumbnail(
        &self,
        entity_type: &str,
        id: RecordId,
        file_path: &Path,
    ) -> Result<(), RemoteError>;
}

/// Shared handle to the configured remote service
#[derive(Clone)]
pub struct RemoteManager {
    service: Arc<dyn RemoteService>,
}

impl std::fmt::Debug for RemoteManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteManager")
            .field("service", &"<dyn RemoteService>")
            .finish()
    }
}

impl RemoteManager {
    /// Connect to the HTTP remote service
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, RemoteError> {
        let service = HttpRemoteService::new(base_url, api_key)?;
        Ok(Self::from_service(Arc::new(service)))
    }

    /// Wrap an existing service implementation
    pub fn from_service(service: Arc<dyn RemoteService>) -> Self {
        RemoteManager { service }
    }

    pub async fn find_one(
        &self,
        entity_type: &str,
        filters: &[Filter],
    ) -> Result<Option<RemoteRecord>, RemoteError> {
        self.service.find_one(entity_type, filters).await
    }

    pub async fn create(
        &self,
        entity_type: &str,
        fields: Map<String, Value>,
    ) -> Result<RemoteRecord, RemoteError> {
        self.service.create(entity_type, fields).await
    }

    pub async fn upload(
        &self,
        entity: &RemoteEntity,
        file_path: &Path,
        field: &str,
    ) -> Result<(), RemoteError> {
        self.service
            .upload(&entity.entity_type, entity.id, file_path, field)
            .await
    }

    pub async fn upload_thumbnail(
        &self,
        entity: &RemoteEntity,
        file_path: &Path,
    ) -> Result<(), RemoteError> {
        self.service
            .upload_thumbnail(&entity.entity_type, entity.id, file_path)
            .await
    }
}
