use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// A stored document as returned by listing. The embedding lives only inside
/// the index and is never read back out.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    pub id: String,
    pub title: String,
    pub content: String,
    pub metadata: Value,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One search hit for a single query. The score is the index's relevance
/// score for that query only; it is not comparable across queries.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalCandidate {
    pub id: String,
    pub title: String,
    pub content: String,
    pub metadata: Value,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Capitalized label used when rendering history into a prompt.
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One turn of caller-supplied conversation history. Read-only input; the
/// orchestrator may truncate but never persists it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceCitation {
    pub title: String,
    pub content_preview: String,
    pub score: f64,
    pub metadata: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    pub answer: String,
    pub sources: Vec<SourceCitation>,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

/// Content-addressed document id: SHA-256 over the title bytes followed by
/// the content bytes, hex-encoded. Identical `(title, content)` always maps
/// to the same id, so re-indexing the same pair overwrites rather than
/// duplicating.
pub fn document_id(title: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_is_deterministic() {
        let a = document_id("AWS S3", "S3 is object storage");
        let b = document_id("AWS S3", "S3 is object storage");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn document_id_changes_with_content() {
        let a = document_id("AWS S3", "S3 is object storage");
        let b = document_id("AWS S3", "S3 is block storage");
        assert_ne!(a, b);
    }

    #[test]
    fn document_id_changes_with_title() {
        let a = document_id("AWS S3", "object storage");
        let b = document_id("Amazon S3", "object storage");
        assert_ne!(a, b);
    }

    #[test]
    fn role_deserializes_lowercase() {
        let turn: ConversationTurn =
            serde_json::from_str(r#"{"role": "user", "content": "hi"}"#).unwrap();
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.role.display_name(), "User");
    }
}
