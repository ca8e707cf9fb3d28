//! Document index client.
//!
//! Talks to an OpenSearch-compatible search cluster over HTTP. Holds the one
//! bit-exact persisted contract of the system: the index mapping (analyzed
//! `title`/`content` text fields with a `title.keyword` sub-field, a fixed-
//! dimensionality `embedding` dense vector, an open `metadata` object and two
//! date fields). Embeddings are written at index time and never read back;
//! the retrieval path is deliberately text-only.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::config::IndexSettings;
use crate::errors::RagError;
use crate::llm::ModelProvider;
use crate::types::{document_id, DocumentRecord, RetrievalCandidate};

pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Partial update for an existing record. `content` changes recompute the
/// embedding; `title`/`metadata` changes do not.
#[derive(Debug, Clone, Default)]
pub struct DocumentUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub metadata: Option<Value>,
}

#[derive(Clone)]
pub struct DocumentIndex {
    client: Client,
    base_url: String,
    index_name: String,
    username: String,
    password: String,
    language: String,
    embedding_dims: usize,
    timeout_secs: u64,
    provider: Arc<dyn ModelProvider>,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Deserialize)]
struct SearchHits {
    hits: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source")]
    source: Value,
}

impl DocumentIndex {
    pub fn new(
        settings: &IndexSettings,
        provider: Arc<dyn ModelProvider>,
    ) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| RagError::Indexing(e.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.endpoint.trim_end_matches('/').to_string(),
            index_name: settings.index_name.clone(),
            username: settings.username.clone(),
            password: settings.password.clone(),
            language: settings.language.clone(),
            embedding_dims: settings.embedding_dims,
            timeout_secs: settings.timeout_secs,
            provider,
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}{}", self.base_url, self.index_name, path)
    }

    fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.basic_auth(&self.username, Some(&self.password))
    }

    /// Structured existence check. Replaces the error-string sniffing the
    /// search path would otherwise need to detect a missing index.
    async fn exists(&self) -> Result<bool, RagError> {
        let res = self
            .with_auth(self.client.head(self.url("")))
            .send()
            .await
            .map_err(|e| {
                RagError::from_transport("index lookup", self.timeout_secs, e, RagError::Indexing)
            })?;

        match res.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(RagError::Indexing(format!(
                "index existence check failed: {status}"
            ))),
        }
    }

    /// Idempotently create the index with the required mapping. A concurrent
    /// creation racing this call is success, not an error.
    pub async fn ensure_schema(&self) -> Result<(), RagError> {
        if self.exists().await? {
            return Ok(());
        }

        tracing::info!("Creating index {}", self.index_name);
        let res = self
            .with_auth(self.client.put(self.url("")))
            .json(&self.schema_body())
            .send()
            .await
            .map_err(|e| {
                RagError::from_transport("index creation", self.timeout_secs, e, RagError::Indexing)
            })?;

        if res.status().is_success() {
            return Ok(());
        }

        let status = res.status();
        let body: Value = res.json().await.unwrap_or_default();
        if error_type(&body) == Some("resource_already_exists_exception") {
            return Ok(());
        }

        Err(RagError::Indexing(format!(
            "index creation failed: {status}: {body}"
        )))
    }

    fn schema_body(&self) -> Value {
        let lang = &self.language;
        let analyzer_name = format!("{lang}_analyzer");
        let stop_name = format!("{lang}_stop");
        let stemmer_name = format!("{lang}_stemmer");

        let mut analyzers = Map::new();
        analyzers.insert(
            analyzer_name.clone(),
            json!({
                "tokenizer": "standard",
                "filter": ["lowercase", stop_name.clone(), stemmer_name.clone()]
            }),
        );

        let mut filters = Map::new();
        filters.insert(
            stop_name,
            json!({ "type": "stop", "stopwords": format!("_{lang}_") }),
        );
        filters.insert(
            stemmer_name,
            json!({ "type": "stemmer", "language": lang }),
        );

        json!({
            "settings": {
                "number_of_shards": 1,
                "number_of_replicas": 0,
                "analysis": {
                    "analyzer": Value::Object(analyzers),
                    "filter": Value::Object(filters)
                }
            },
            "mappings": {
                "properties": {
                    "title": {
                        "type": "text",
                        "analyzer": analyzer_name.clone(),
                        "fields": {
                            "keyword": {
                                "type": "keyword"
                            }
                        }
                    },
                    "content": {
                        "type": "text",
                        "analyzer": analyzer_name
                    },
                    "embedding": {
                        "type": "dense_vector",
                        "dims": self.embedding_dims
                    },
                    "metadata": {
                        "type": "object"
                    },
                    "created_at": {
                        "type": "date"
                    },
                    "updated_at": {
                        "type": "date"
                    }
                }
            }
        })
    }

    /// Write or overwrite the record addressed by `(title, content)` and
    /// return its id. The embedding is computed first; if that fails nothing
    /// is written. `created_at` is only set when the record is new.
    pub async fn index(
        &self,
        title: &str,
        content: &str,
        metadata: Value,
    ) -> Result<String, RagError> {
        // Writing to a missing index would auto-create it with a dynamic
        // mapping, bypassing the schema contract.
        self.ensure_schema().await?;

        let embedding = self.embed_checked(content).await?;
        let doc_id = document_id(title, content);
        let now = Utc::now();

        let fields = json!({
            "title": title,
            "content": content,
            "embedding": embedding,
            "metadata": metadata,
            "updated_at": now,
        });
        let mut upsert = fields.as_object().cloned().unwrap_or_default();
        upsert.insert("created_at".to_string(), json!(now));

        let body = json!({
            "doc": fields,
            "upsert": Value::Object(upsert),
        });

        let res = self
            .with_auth(self.client.post(self.url(&format!("/_update/{doc_id}"))))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                RagError::from_transport("index write", self.timeout_secs, e, RagError::Indexing)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::Indexing(format!(
                "index write failed: {status}: {text}"
            )));
        }

        tracing::info!("Indexed document '{}' as {}", title, doc_id);
        Ok(doc_id)
    }

    /// Best-match full-text search over `title` (2x boost) and `content`
    /// with fuzzy matching. A missing index self-heals: the schema is
    /// created and an empty result set is returned instead of an error.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RetrievalCandidate>, RagError> {
        if !self.exists().await? {
            tracing::info!(
                "Index {} missing on search, creating and returning empty results",
                self.index_name
            );
            self.ensure_schema().await?;
            return Ok(Vec::new());
        }

        let body = json!({
            "size": limit,
            "query": {
                "multi_match": {
                    "query": query,
                    "fields": ["title^2", "content"],
                    "type": "best_fields",
                    "fuzziness": "AUTO"
                }
            },
            "_source": ["title", "content", "metadata", "created_at"]
        });

        let hits = self.run_search(&body, RagError::Search).await?;
        Ok(hits
            .into_iter()
            .map(|hit| RetrievalCandidate {
                id: hit.id,
                title: str_field(&hit.source, "title"),
                content: str_field(&hit.source, "content"),
                metadata: obj_field(&hit.source, "metadata"),
                score: hit.score.unwrap_or(0.0),
            })
            .collect())
    }

    /// List stored records (without embeddings), newest unordered batch up
    /// to `limit`.
    pub async fn list(&self, limit: usize) -> Result<Vec<DocumentRecord>, RagError> {
        let body = json!({
            "size": limit,
            "query": { "match_all": {} },
            "_source": ["title", "content", "metadata", "created_at", "updated_at"]
        });

        let hits = self.run_search(&body, RagError::Search).await?;
        Ok(hits
            .into_iter()
            .map(|hit| DocumentRecord {
                id: hit.id,
                title: str_field(&hit.source, "title"),
                content: str_field(&hit.source, "content"),
                metadata: obj_field(&hit.source, "metadata"),
                created_at: date_field(&hit.source, "created_at"),
                updated_at: date_field(&hit.source, "updated_at"),
            })
            .collect())
    }

    pub async fn delete(&self, doc_id: &str) -> Result<(), RagError> {
        let res = self
            .with_auth(self.client.delete(self.url(&format!("/_doc/{doc_id}"))))
            .send()
            .await
            .map_err(|e| {
                RagError::from_transport("index delete", self.timeout_secs, e, RagError::Indexing)
            })?;

        match res.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(RagError::NotFound(doc_id.to_string())),
            status => {
                let text = res.text().await.unwrap_or_default();
                Err(RagError::Indexing(format!(
                    "delete failed: {status}: {text}"
                )))
            }
        }
    }

    /// Partial update. Only a `content` change recomputes the embedding;
    /// `updated_at` is always refreshed. The id never changes here, even
    /// when the new `(title, content)` pair would address differently.
    pub async fn update(&self, doc_id: &str, update: DocumentUpdate) -> Result<(), RagError> {
        let mut doc = Map::new();
        doc.insert("updated_at".to_string(), json!(Utc::now()));

        if let Some(title) = update.title {
            doc.insert("title".to_string(), json!(title));
        }
        if let Some(content) = update.content {
            let embedding = self.embed_checked(&content).await?;
            doc.insert("content".to_string(), json!(content));
            doc.insert("embedding".to_string(), json!(embedding));
        }
        if let Some(metadata) = update.metadata {
            doc.insert("metadata".to_string(), metadata);
        }

        let body = json!({ "doc": Value::Object(doc) });
        let res = self
            .with_auth(self.client.post(self.url(&format!("/_update/{doc_id}"))))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                RagError::from_transport("index update", self.timeout_secs, e, RagError::Indexing)
            })?;

        match res.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(RagError::NotFound(doc_id.to_string())),
            status => {
                let text = res.text().await.unwrap_or_default();
                Err(RagError::Indexing(format!(
                    "update failed: {status}: {text}"
                )))
            }
        }
    }

    async fn embed_checked(&self, content: &str) -> Result<Vec<f32>, RagError> {
        let embedding = self.provider.embed(content).await?;
        if embedding.len() != self.embedding_dims {
            return Err(RagError::Indexing(format!(
                "embedding dimensionality mismatch: provider returned {}, index expects {}",
                embedding.len(),
                self.embedding_dims
            )));
        }
        Ok(embedding)
    }

    async fn run_search(
        &self,
        body: &Value,
        ctor: fn(String) -> RagError,
    ) -> Result<Vec<SearchHit>, RagError> {
        let res = self
            .with_auth(self.client.post(self.url("/_search")))
            .json(body)
            .send()
            .await
            .map_err(|e| RagError::from_transport("search", self.timeout_secs, e, ctor))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ctor(format!("query failed: {status}: {text}")));
        }

        let payload: SearchResponse = res.json().await.map_err(|e| ctor(e.to_string()))?;
        Ok(payload.hits.hits)
    }
}

fn error_type(body: &Value) -> Option<&str> {
    body.get("error")?.get("type")?.as_str()
}

fn str_field(source: &Value, key: &str) -> String {
    source
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn obj_field(source: &Value, key: &str) -> Value {
    source
        .get(key)
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()))
}

fn date_field(source: &Value, key: &str) -> Option<DateTime<Utc>> {
    source
        .get(key)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}
