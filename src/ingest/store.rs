use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::config::StorageSettings;
use crate::errors::RagError;

/// An object fetched from storage. `content_type` is whatever the store
/// reports; extraction dispatches on the key's extension, not this.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub last_modified: Option<String>,
}

/// External boundary to the document bucket. Delivery is best-effort: a
/// fetch observed twice ingests twice, which the content-addressed index
/// absorbs as an overwrite.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<StoredObject, RagError>;
}

/// Object store reachable through an S3-compatible HTTP gateway
/// (`GET {base_url}/{bucket}/{key}`).
pub struct HttpObjectStore {
    base_url: String,
    timeout_secs: u64,
    client: Client,
}

impl HttpObjectStore {
    pub fn new(settings: &StorageSettings) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| RagError::Storage(e.to_string()))?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout_secs: settings.timeout_secs,
            client,
        })
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<StoredObject, RagError> {
        let url = format!("{}/{}/{}", self.base_url, bucket, key);
        let res = self.client.get(&url).send().await.map_err(|e| {
            RagError::from_transport("object fetch", self.timeout_secs, e, RagError::Storage)
        })?;

        match res.status() {
            status if status.is_success() => {
                let content_type = header_value(&res, reqwest::header::CONTENT_TYPE);
                let last_modified = header_value(&res, reqwest::header::LAST_MODIFIED);
                let bytes = res
                    .bytes()
                    .await
                    .map_err(|e| RagError::Storage(e.to_string()))?;

                Ok(StoredObject {
                    bytes: bytes.to_vec(),
                    content_type,
                    last_modified,
                })
            }
            StatusCode::NOT_FOUND => Err(RagError::NotFound(format!("{bucket}/{key}"))),
            status => Err(RagError::Storage(format!(
                "object fetch failed for {bucket}/{key}: {status}"
            ))),
        }
    }
}

fn header_value(res: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    res.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}
