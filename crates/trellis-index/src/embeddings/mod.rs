//! Embedding provider trait and implementations.
//!
//! The engine treats embedding as a black box: text in, fixed-length vector
//! out. Two providers ship with the crate:
//! - [`OpenAiCompatibleEmbeddings`]: any `/embeddings` endpoint speaking the
//!   OpenAI wire format
//! - [`HashingEmbeddings`]: deterministic offline feature hashing

mod hashing;

pub use hashing::HashingEmbeddings;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Default OpenAI-compatible embeddings endpoint.
pub const DEFAULT_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default dimensions of [`DEFAULT_EMBEDDING_MODEL`].
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

/// Errors that can occur during embedding generation.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited after {0} retries")]
    RateLimited(u32),

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Trait for embedding providers.
///
/// Implementations should be Send + Sync to allow use in async contexts.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed multiple texts in a batch, preserving order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the number of dimensions
    fn dimensions(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the maximum batch size supported.
    fn max_batch_size(&self) -> usize {
        32
    }
}

/// Embed `texts` in chunks of the provider's maximum batch size.
pub async fn embed_all<E: EmbeddingProvider + ?Sized>(
    provider: &E,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    let mut out = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(provider.max_batch_size().max(1)) {
        let vectors = provider.embed_batch(chunk).await?;
        if vectors.len() != chunk.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                chunk.len(),
                vectors.len()
            ))
            .into());
        }
        out.extend(vectors);
    }
    Ok(out)
}

/// Request body for embedding API
#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

/// Response from embedding API
#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

/// Individual embedding data in response
#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// Embedding provider for OpenAI-compatible `/embeddings` endpoints.
pub struct OpenAiCompatibleEmbeddings {
    api_key: Option<String>,
    model: String,
    dimensions: usize,
    client: Client,
    base_url: String,
    /// Ask the server to shorten vectors to `dimensions`
    request_dimensions: bool,
}

impl OpenAiCompatibleEmbeddings {
    /// Create a provider with default model and dimensions unless overridden.
    pub fn new(api_key: Option<String>, model: Option<String>, dimensions: Option<usize>) -> Self {
        Self {
            api_key,
            request_dimensions: dimensions.is_some(),
            model: model.unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            dimensions: dimensions.unwrap_or(DEFAULT_EMBEDDING_DIMENSIONS),
            client: Client::new(),
            base_url: DEFAULT_EMBEDDINGS_URL.to_string(),
        }
    }

    /// Set a custom base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Send embedding request with retry logic for rate limits.
    async fn send_request(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = texts.len();
        let request_body = EmbeddingRequest {
            model: self.model.clone(),
            input: texts,
            dimensions: self.request_dimensions.then_some(self.dimensions),
        };

        let mut retry_count = 0u32;
        let max_retries = 3u32;
        let mut backoff_secs = 1u64;

        loop {
            debug!(
                texts = expected,
                url = %self.base_url,
                "Sending embedding request"
            );

            let mut request = self
                .client
                .post(&self.base_url)
                .header("Content-Type", "application/json")
                .json(&request_body);
            if let Some(key) = &self.api_key {
                request = request.header("Authorization", format!("Bearer {}", key));
            }

            let response = request
                .send()
                .await
                .map_err(|e| EmbeddingError::NetworkError(e.to_string()))?;

            let status = response.status();

            if status.is_success() {
                let embedding_response: EmbeddingResponse = response
                    .json()
                    .await
                    .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

                // Sort by index to ensure correct order
                let mut embeddings: Vec<(usize, Vec<f32>)> = embedding_response
                    .data
                    .into_iter()
                    .map(|d| (d.index, d.embedding))
                    .collect();
                embeddings.sort_by_key(|(idx, _)| *idx);

                let embeddings: Vec<Vec<f32>> = embeddings.into_iter().map(|(_, emb)| emb).collect();
                self.check_response(&embeddings, expected)?;
                return Ok(embeddings);
            }

            if status.as_u16() == 429 {
                retry_count += 1;
                if retry_count > max_retries {
                    return Err(EmbeddingError::RateLimited(max_retries).into());
                }

                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(backoff_secs);

                warn!(
                    "Rate limited, retrying after {} seconds (attempt {}/{})",
                    retry_after, retry_count, max_retries
                );

                tokio::time::sleep(tokio::time::Duration::from_secs(retry_after)).await;
                backoff_secs *= 2;
                continue;
            }

            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EmbeddingError::ApiError(format!("{}: {}", status.as_u16(), error_body)).into());
        }
    }

    fn check_response(&self, embeddings: &[Vec<f32>], expected: usize) -> Result<()> {
        if embeddings.len() != expected {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                expected,
                embeddings.len()
            ))
            .into());
        }
        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dimensions) {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} dimensions, got {}",
                self.dimensions,
                bad.len()
            ))
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatibleEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("no embedding returned".into()).into())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!("Embedding batch of {} texts", texts.len());
        self.send_request(texts.to_vec()).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
