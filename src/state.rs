use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::{AppPaths, Settings};
use crate::index::DocumentIndex;
use crate::ingest::{DocumentProcessor, HttpObjectStore};
use crate::llm::OpenAiCompatProvider;
use crate::rag::{RagService, Retriever};

/// All long-lived components, built once at startup and shared by handle.
/// Components receive their dependencies explicitly; nothing is created
/// lazily behind a global.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Settings,
    pub index: Arc<DocumentIndex>,
    pub rag: RagService,
    pub processor: DocumentProcessor,
    #[allow(dead_code)]
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn initialize() -> anyhow::Result<Arc<Self>> {
        let paths = Arc::new(AppPaths::new());
        let settings = Settings::load(&paths)?;

        let provider = Arc::new(OpenAiCompatProvider::new(&settings.model)?);
        let index = Arc::new(DocumentIndex::new(&settings.index, provider.clone())?);
        let store = Arc::new(HttpObjectStore::new(&settings.storage)?);

        let rag = RagService::new(Retriever::new(index.clone()), provider);
        let processor = DocumentProcessor::new(index.clone(), store);
        let started_at = Utc::now();

        Ok(Arc::new(AppState {
            paths,
            settings,
            index,
            rag,
            processor,
            started_at,
        }))
    }
}
