use crate::remote::{Filter, RecordId, RemoteError, RemoteRecord, RemoteService};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::{debug, info, warn};

const USER_AGENT: &str = "review_export/0.1";

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// JSON-over-HTTP client for the project-management service
#[derive(Clone)]
pub struct HttpRemoteService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpRemoteService {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, RemoteError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn check(response: Response) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!("✗ Remote service error: {} {}", status, body);
        Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn upload_file(
        &self,
        entity_type: &str,
        id: RecordId,
        file_path: &Path,
        field: &str,
    ) -> Result<(), RemoteError> {
        let url = format!(
            "{}/entity/{}/{}/{}/_upload",
            self.base_url, entity_type, id, field
        );

        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());
        let file = tokio::fs::File::open(file_path).await?;
        let size = file.metadata().await?.len();

        info!(
            "📡 Uploading {} ({} bytes) to {} {} slot '{}'",
            file_name, size, entity_type, id, field
        );

        // Streamed from disk; exported movies can be large
        let part = Part::stream_with_length(Body::from(file), size).file_name(file_name);
        let form = Form::new().part("file", part);
        let response = self
            .authorized(self.client.post(&url).multipart(form))
            .send()
            .await?;
        Self::check(response).await?;

        debug!("Upload to {} complete", url);
        Ok(())
    }
}

#[async_trait::async_trait]
impl RemoteService for HttpRemoteService {
    async fn find_one(
        &self,
        entity_type: &str,
        filters: &[Filter],
    ) -> Result<Option<RemoteRecord>, RemoteError> {
        let url = format!("{}/entity/{}/_search", self.base_url, entity_type);
        let body = json!({
            "filters": filters.iter().map(Filter::to_json).collect::<Vec<_>>(),
            "page": { "size": 1 },
        });

        debug!("📡 Remote search: POST {} {}", url, body);

        let response = self
            .authorized(self.client.post(&url).json(&body))
            .send()
            .await?;
        let response = Self::check(response).await?;

        let envelope: DataEnvelope<Vec<RemoteRecord>> = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(format!("search response: {}", e)))?;

        Ok(envelope.data.into_iter().next())
    }

    async fn create(
        &self,
        entity_type: &str,
        fields: Map<String, Value>,
    ) -> Result<RemoteRecord, RemoteError> {
        let url = format!("{}/entity/{}", self.base_url, entity_type);

        debug!("📡 Remote create: POST {} with {} field(s)", url, fields.len());

        let response = self
            .authorized(self.client.post(&url).json(&Value::Object(fields)))
            .send()
            .await?;
        let response = Self::check(response).await?;

        let envelope: DataEnvelope<RemoteRecord> = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(format!("create response: {}", e)))?;

        info!(
            "✓ Created {} {}",
            envelope.data.entity_type, envelope.data.id
        );
        Ok(envelope.data)
    }

    async fn upload(
        &self,
        entity_type: &str,
        id: RecordId,
        file_path: &Path,
        field: &str,
    ) -> Result<(), RemoteError> {
        self.upload_file(entity_type, id, file_path, field).await
    }

    async fn upload_thumbnail(
        &self,
        entity_type: &str,
        id: RecordId,
        file_path: &Path,
    ) -> Result<(), RemoteError> {
        self.upload_file(entity_type, id, file_path, "image").await
    }
}
