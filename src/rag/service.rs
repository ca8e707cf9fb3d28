use std::sync::Arc;

use chrono::Utc;

use super::context::build_prompt;
use super::retriever::Retriever;
use crate::errors::RagError;
use crate::llm::ModelProvider;
use crate::types::{ConversationTurn, RagResponse, RetrievalCandidate, SourceCitation};

const PREVIEW_MAX_CHARS: usize = 200;
const UNTITLED: &str = "Untitled";

/// Orchestrates one grounded chat turn: retrieve candidates, assemble the
/// prompt, invoke the generation model, then derive confidence and source
/// citations from the retrieval scores.
///
/// Failures surface typed to the caller; this service never substitutes a
/// fabricated answer for a failed step.
#[derive(Clone)]
pub struct RagService {
    retriever: Retriever,
    provider: Arc<dyn ModelProvider>,
}

impl RagService {
    pub fn new(retriever: Retriever, provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            retriever,
            provider,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub async fn generate_response(
        &self,
        question: &str,
        history: &[ConversationTurn],
        max_results: Option<i64>,
    ) -> Result<RagResponse, RagError> {
        let candidates = self.retriever.retrieve(question, max_results).await?;
        tracing::debug!("Retrieved {} candidates", candidates.len());

        let prompt = build_prompt(question, &candidates, history);
        let answer = self.provider.generate(&prompt).await?;

        Ok(RagResponse {
            answer,
            sources: prepare_sources(&candidates),
            confidence: confidence(&candidates),
            timestamp: Utc::now(),
        })
    }
}

/// Heuristic retrieval-strength score: `min(mean(score), 1.0)` rounded to
/// two decimals, 0.0 when nothing was retrieved. Not a calibrated
/// probability — it assumes relevance scores are roughly bounded near 1.0,
/// which depends on the search engine's scoring scale. A single highly
/// relevant hit scoring far above 1.0 saturates at 1.0, and many sub-1.0
/// scores read as weak even when every hit is on topic.
fn confidence(candidates: &[RetrievalCandidate]) -> f64 {
    if candidates.is_empty() {
        return 0.0;
    }

    let total: f64 = candidates.iter().map(|c| c.score).sum();
    let mean = total / candidates.len() as f64;
    (mean.min(1.0) * 100.0).round() / 100.0
}

fn prepare_sources(candidates: &[RetrievalCandidate]) -> Vec<SourceCitation> {
    candidates
        .iter()
        .map(|candidate| SourceCitation {
            title: if candidate.title.is_empty() {
                UNTITLED.to_string()
            } else {
                candidate.title.clone()
            },
            content_preview: preview(&candidate.content),
            score: candidate.score,
            metadata: candidate.metadata.clone(),
        })
        .collect()
}

fn preview(content: &str) -> String {
    let mut truncated: String = content.chars().take(PREVIEW_MAX_CHARS).collect();
    if content.chars().count() > PREVIEW_MAX_CHARS {
        truncated.push_str("...");
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexSettings;
    use crate::index::DocumentIndex;
    use async_trait::async_trait;
    use serde_json::json;

    fn candidate(content: &str, score: f64) -> RetrievalCandidate {
        RetrievalCandidate {
            id: "id".to_string(),
            title: "Doc".to_string(),
            content: content.to_string(),
            metadata: json!({"source": "test"}),
            score,
        }
    }

    #[test]
    fn confidence_is_zero_without_candidates() {
        assert_eq!(confidence(&[]), 0.0);
    }

    #[test]
    fn confidence_is_capped_mean_rounded() {
        let candidates = vec![candidate("a", 0.25), candidate("b", 0.75)];
        assert_eq!(confidence(&candidates), 0.5);

        let rounded = vec![candidate("a", 0.5), candidate("b", 0.25)];
        assert_eq!(confidence(&rounded), 0.38);

        let high = vec![candidate("a", 3.0), candidate("b", 5.0)];
        assert_eq!(confidence(&high), 1.0);
    }

    #[test]
    fn confidence_stays_in_unit_interval() {
        for scores in [vec![0.0], vec![0.01, 0.02], vec![100.0], vec![0.5; 7]] {
            let candidates: Vec<_> = scores.iter().map(|s| candidate("c", *s)).collect();
            let value = confidence(&candidates);
            assert!((0.0..=1.0).contains(&value), "confidence {value} out of range");
        }
    }

    #[test]
    fn preview_truncates_at_200_chars() {
        let long = "x".repeat(250);
        let cited = preview(&long);
        assert_eq!(cited.len(), 203);
        assert!(cited.ends_with("..."));
        assert_eq!(cited.chars().take(200).count(), 200);

        let short = "y".repeat(150);
        assert_eq!(preview(&short), short);
    }

    #[test]
    fn sources_keep_retrieval_order_and_default_title() {
        let mut first = candidate("first body", 0.9);
        first.title = String::new();
        let second = candidate("second body", 0.1);

        let sources = prepare_sources(&[first, second]);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].title, "Untitled");
        assert_eq!(sources[0].content_preview, "first body");
        assert_eq!(sources[1].content_preview, "second body");
    }

    struct StaticProvider;

    #[async_trait]
    impl crate::llm::ModelProvider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, RagError> {
            Ok(vec![0.0; 1536])
        }

        async fn generate(&self, prompt: &str) -> Result<String, RagError> {
            assert!(prompt.contains("User question:"));
            Ok("a grounded answer".to_string())
        }
    }

    fn live_service(index_name: &str) -> (RagService, Arc<DocumentIndex>) {
        let provider = Arc::new(StaticProvider);
        let settings = IndexSettings {
            index_name: index_name.to_string(),
            ..IndexSettings::default()
        };
        let index = Arc::new(DocumentIndex::new(&settings, provider.clone()).unwrap());
        (RagService::new(Retriever::new(index.clone()), provider), index)
    }

    // Full pipeline against a live cluster with the generation model
    // stubbed out. Run with `cargo test -- --ignored`.

    #[tokio::test]
    #[ignore]
    async fn live_indexed_document_is_cited() {
        let (service, index) = live_service("docent-pipeline-test");
        index.ensure_schema().await.unwrap();

        let id = index
            .index("AWS S3", "S3 is object storage built to retrieve any amount of data", serde_json::json!({}))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;

        let response = service
            .generate_response("object storage", &[], None)
            .await
            .unwrap();

        assert!(!response.answer.is_empty());
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.sources[0].title, "AWS S3");
        assert!(response.confidence > 0.0);

        index.delete(&id).await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn live_empty_index_yields_zero_confidence() {
        let (service, index) = live_service("docent-empty-test");
        index.ensure_schema().await.unwrap();

        let response = service
            .generate_response("completely unknown topic", &[], None)
            .await
            .unwrap();

        assert_eq!(response.confidence, 0.0);
        assert!(response.sources.is_empty());
        assert!(!response.answer.is_empty());
    }
}
