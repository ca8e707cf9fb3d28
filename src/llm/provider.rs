use async_trait::async_trait;

use crate::errors::RagError;

#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// return the provider name (e.g. "openai-compat")
    fn name(&self) -> &str;

    /// convert text into a fixed-length dense vector. Single call, no
    /// internal retry; an error here aborts the caller's whole operation.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;

    /// complete a prompt with the generation model (non-streaming)
    async fn generate(&self, prompt: &str) -> Result<String, RagError>;
}
