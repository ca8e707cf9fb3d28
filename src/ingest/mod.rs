//! Document ingestion.
//!
//! This module provides:
//! - `DocumentProcessor`: direct uploads and object-storage files →
//!   plain-text records in the document index
//! - `extract`: per-file-type text extraction
//! - `store`: the object-storage boundary

mod extract;
mod store;

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::errors::RagError;
use crate::index::DocumentIndex;

pub use extract::{extract_text, FileKind};
pub use store::{HttpObjectStore, ObjectStore, StoredObject};

/// Outcome of one ingestion, echoed back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub document_id: String,
    pub title: String,
    pub content_length: usize,
    pub metadata: Value,
}

/// Converts incoming documents to text, stamps ingestion metadata, and
/// writes them to the document index. Ingestion is not transactional: an
/// embedding failure aborts before anything is written, and a repeated
/// delivery overwrites the same content-addressed record.
#[derive(Clone)]
pub struct DocumentProcessor {
    index: Arc<DocumentIndex>,
    store: Arc<dyn ObjectStore>,
}

impl DocumentProcessor {
    pub fn new(index: Arc<DocumentIndex>, store: Arc<dyn ObjectStore>) -> Self {
        Self { index, store }
    }

    /// Ingest a caller-supplied `(title, content)` pair, merging caller
    /// metadata over the ingestion stamps.
    pub async fn process_direct(
        &self,
        title: &str,
        content: &str,
        metadata: Option<Value>,
    ) -> Result<IngestReport, RagError> {
        if title.trim().is_empty() {
            return Err(RagError::InvalidInput("title must not be empty".into()));
        }
        if content.trim().is_empty() {
            return Err(RagError::InvalidInput("content must not be empty".into()));
        }

        let mut stamped = Map::new();
        stamped.insert("processed_at".to_string(), json!(Utc::now()));
        stamped.insert("source".to_string(), json!("direct_upload"));
        stamped.insert("content_length".to_string(), json!(content.len()));
        if let Some(Value::Object(extra)) = metadata {
            for (key, value) in extra {
                stamped.insert(key, value);
            }
        }

        let metadata = Value::Object(stamped);
        let document_id = self.index.index(title, content, metadata.clone()).await?;

        Ok(IngestReport {
            document_id,
            title: title.to_string(),
            content_length: content.len(),
            metadata,
        })
    }

    /// Fetch `bucket/key` from object storage, extract text by file type,
    /// and ingest it under the key's basename as title.
    pub async fn process_object(&self, bucket: &str, key: &str) -> Result<IngestReport, RagError> {
        let kind = FileKind::from_key(key).ok_or_else(|| {
            RagError::InvalidInput(format!("unsupported file type for key {key}"))
        })?;

        tracing::info!("Processing object {}/{}", bucket, key);
        let object = self.store.fetch(bucket, key).await?;
        let content = extract_text(&object.bytes, kind)?;
        if content.trim().is_empty() {
            return Err(RagError::Extraction(format!(
                "no text extracted from {bucket}/{key}"
            )));
        }

        let mut metadata = Map::new();
        metadata.insert("source".to_string(), json!(format!("s3://{bucket}/{key}")));
        metadata.insert("file_size".to_string(), json!(object.bytes.len()));
        metadata.insert("file_type".to_string(), json!(kind.label()));
        metadata.insert("processed_at".to_string(), json!(Utc::now()));
        if let Some(last_modified) = object.last_modified {
            metadata.insert("last_modified".to_string(), json!(last_modified));
        }

        let title = basename(key);
        let metadata = Value::Object(metadata);
        let document_id = self.index.index(&title, &content, metadata.clone()).await?;

        Ok(IngestReport {
            document_id,
            title,
            content_length: content.len(),
            metadata,
        })
    }
}

fn basename(key: &str) -> String {
    Path::new(key)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basename_strips_prefixes() {
        assert_eq!(basename("guides/aws/s3-intro.txt"), "s3-intro.txt");
        assert_eq!(basename("top-level.md"), "top-level.md");
    }
}
