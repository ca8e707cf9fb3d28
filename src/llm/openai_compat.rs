use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::provider::ModelProvider;
use crate::config::ModelSettings;
use crate::errors::RagError;

/// Remote model client for OpenAI-compatible gateways (`/v1/embeddings`,
/// `/v1/chat/completions`). One instance serves both the embedding model and
/// the generation model; which one is invoked depends on the call.
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    base_url: String,
    api_key: Option<String>,
    embedding_model: String,
    generation_model: String,
    max_tokens: u32,
    temperature: f64,
    timeout_secs: u64,
    client: Client,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl OpenAiCompatProvider {
    pub fn new(settings: &ModelSettings) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| RagError::Generation(e.to_string()))?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            embedding_model: settings.embedding_model.clone(),
            generation_model: settings.generation_model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout_secs: settings.timeout_secs,
            client,
        })
    }

    fn request(&self, url: &str, body: &serde_json::Value) -> reqwest::RequestBuilder {
        let mut req = self.client.post(url).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }
}

#[async_trait]
impl ModelProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.embedding_model,
            "input": [text],
        });

        let res = self.request(&url, &body).send().await.map_err(|e| {
            RagError::from_transport("embedding", self.timeout_secs, e, RagError::Embedding)
        })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!("{status}: {text}")));
        }

        let payload: EmbeddingsResponse = res
            .json()
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        payload
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| RagError::Embedding("empty embedding response".to_string()))
    }

    async fn generate(&self, prompt: &str) -> Result<String, RagError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.generation_model,
            "messages": [{"role": "user", "content": prompt}],
            "stream": false,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        let res = self.request(&url, &body).send().await.map_err(|e| {
            RagError::from_transport("generation", self.timeout_secs, e, RagError::Generation)
        })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::Generation(format!("{status}: {text}")));
        }

        let payload: ChatCompletionResponse = res
            .json()
            .await
            .map_err(|e| RagError::Generation(e.to_string()))?;

        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| RagError::Generation("empty completion".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelSettings;

    #[test]
    fn base_url_is_normalized() {
        let settings = ModelSettings {
            base_url: "http://localhost:1234/".to_string(),
            ..ModelSettings::default()
        };
        let provider = OpenAiCompatProvider::new(&settings).unwrap();
        assert_eq!(provider.base_url, "http://localhost:1234");
    }

    #[tokio::test]
    #[ignore]
    async fn live_embed_and_generate() {
        let provider = OpenAiCompatProvider::new(&ModelSettings::default()).unwrap();

        let vector = provider.embed("object storage").await.unwrap();
        assert!(!vector.is_empty());

        let answer = provider.generate("Reply with one word: ping").await.unwrap();
        assert!(!answer.is_empty());
    }
}
