use std::sync::Arc;

use crate::errors::RagError;
use crate::index::DocumentIndex;
use crate::types::RetrievalCandidate;

pub const DEFAULT_MAX_RESULTS: usize = 5;
pub const MAX_RESULTS_CEILING: usize = 50;

/// Thin wrapper over [`DocumentIndex::search`] that normalizes the caller's
/// result limit.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<DocumentIndex>,
}

impl Retriever {
    pub fn new(index: Arc<DocumentIndex>) -> Self {
        Self { index }
    }

    pub async fn retrieve(
        &self,
        query: &str,
        max_results: Option<i64>,
    ) -> Result<Vec<RetrievalCandidate>, RagError> {
        let limit = normalize_limit(max_results);
        self.index.search(query, limit).await
    }
}

/// Missing, zero, or negative limits fall back to the default rather than
/// erroring; oversized limits clamp to the ceiling.
fn normalize_limit(requested: Option<i64>) -> usize {
    match requested {
        Some(n) if n > 0 => (n as usize).min(MAX_RESULTS_CEILING),
        _ => DEFAULT_MAX_RESULTS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_limit_uses_default() {
        assert_eq!(normalize_limit(None), DEFAULT_MAX_RESULTS);
    }

    #[test]
    fn zero_and_negative_fall_back_to_default() {
        assert_eq!(normalize_limit(Some(0)), DEFAULT_MAX_RESULTS);
        assert_eq!(normalize_limit(Some(-3)), DEFAULT_MAX_RESULTS);
    }

    #[test]
    fn oversized_limit_clamps_to_ceiling() {
        assert_eq!(normalize_limit(Some(500)), MAX_RESULTS_CEILING);
    }

    #[test]
    fn reasonable_limit_passes_through() {
        assert_eq!(normalize_limit(Some(3)), 3);
    }
}
