//! OpenAI-compatible embeddings client

use crate::config::Config;
use crate::error::AssistantError;
use crate::vector::Embedder;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

pub struct OpenAiEmbedder {
    client: Client,
    api_key: String,
    telemetry_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(
        api_key: String,
        telemetry_key: Option<String>,
        base_url: &str,
        model: String,
    ) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key,
            telemetry_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.credentials.openai_api_key.clone(),
            Some(config.credentials.helicone_api_key.clone()),
            &config.base_url,
            config.embedding_model.clone(),
        )
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        debug!(model = %self.model, inputs = texts.len(), "Requesting embeddings");

        let mut builder = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request);

        if let Some(key) = &self.telemetry_key {
            builder = builder.header("Helicone-Auth", format!("Bearer {}", key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AssistantError::Embedding(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Embedding error response ({}): {}", status, error_text);
            return Err(AssistantError::Embedding(format!(
                "Embedding endpoint returned {}: {}",
                status, error_text
            )));
        }

        let mut body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Embedding(format!("Embedding parse error: {}", e)))?;

        // The API may answer out of input order
        body.data.sort_by_key(|d| d.index);
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let input = vec!["Bull Market".to_string(), "Bear Market".to_string()];
        let request = EmbeddingRequest {
            model: "text-embedding-ada-002",
            input: &input,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"model": "text-embedding-ada-002", "input": ["Bull Market", "Bear Market"]})
        );
    }

    #[tokio::test]
    async fn test_empty_input_skips_request() {
        let embedder = OpenAiEmbedder::new(
            "sk-test".to_string(),
            None,
            "http://127.0.0.1:9",
            "text-embedding-ada-002".to_string(),
        )
        .unwrap();

        assert!(embedder.embed_documents(&[]).await.unwrap().is_empty());
    }
}
