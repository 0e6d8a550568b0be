//! Chat completions-based extractor compatible with LM Studio, Ollama and
//! OpenAI-compatible APIs.
//!
//! The model is asked for a JSON array of
//! `{subject, subject_type, predicate, object, object_type, confidence}`
//! objects. Responses wrapped in `<think>` tags or markdown fences are
//! tolerated.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::TripleExtractor;
use crate::model::Triple;

const SYSTEM_PROMPT: &str = "Extract factual relations from the user's text as a JSON array. \
Each element must be an object with the keys \"subject\", \"subject_type\", \"predicate\", \
\"object\", \"object_type\" and optionally \"confidence\" (0 to 1). Use short canonical entity \
names, types such as Person, Organization, Location or Concept, and a lowercase verb phrase as \
predicate. Do not use pronouns as entities. Answer with the JSON array only.";

/// Longest text (in chars) sent in one request.
const MAX_INPUT_CHARS: usize = 12_000;

/// LLM-backed triple extractor.
pub struct ChatExtractor {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl ChatExtractor {
    pub fn new(base_url: String, model: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            model,
            api_key,
        }
    }

    /// Parse the model response into triples.
    /// Handles responses that may be wrapped in <think> tags or code fences.
    fn parse_triples(response: &str) -> Result<Vec<Triple>> {
        let cleaned = response.split("</think>").last().unwrap_or(response).trim();
        let start = cleaned
            .find('[')
            .ok_or_else(|| anyhow!("No JSON array in extractor response"))?;
        let end = cleaned
            .rfind(']')
            .filter(|end| *end > start)
            .ok_or_else(|| anyhow!("Unterminated JSON array in extractor response"))?;

        let raw: Vec<RawTriple> = serde_json::from_str(&cleaned[start..=end])
            .context("Failed to parse extracted triples")?;

        Ok(raw
            .into_iter()
            .map(|r| {
                let triple = Triple::new(
                    r.subject,
                    r.subject_type.unwrap_or_else(|| "Concept".to_string()),
                    r.predicate,
                    r.object,
                    r.object_type.unwrap_or_else(|| "Concept".to_string()),
                );
                match r.confidence {
                    Some(c) => triple.with_confidence(c),
                    None => triple,
                }
            })
            .collect())
    }
}

#[derive(Deserialize)]
struct RawTriple {
    subject: String,
    #[serde(default)]
    subject_type: Option<String>,
    predicate: String,
    object: String,
    #[serde(default)]
    object_type: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[async_trait]
impl TripleExtractor for ChatExtractor {
    async fn extract(&self, text: &str) -> Result<Vec<Triple>> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));

        let char_count = text.chars().count();
        if char_count > MAX_INPUT_CHARS {
            warn!(chars = char_count, limit = MAX_INPUT_CHARS, "Truncating extraction input");
        }
        let input: String = text.chars().take(MAX_INPUT_CHARS).collect();

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: input,
                },
            ],
            max_tokens: 2048,
            temperature: 0.0,
        };

        let mut req_builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            req_builder = req_builder.bearer_auth(key);
        }

        let resp = req_builder
            .send()
            .await
            .with_context(|| format!("Extractor request to {} failed", url))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("Extractor API error ({}): {}", status.as_u16(), body));
        }

        let completion: ChatCompletionResponse = resp
            .json()
            .await
            .context("Failed to parse extractor response")?;
        let content = completion
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| anyhow!("Extractor returned no choices"))?;

        let triples = Self::parse_triples(content)?;
        debug!(model = %self.model, triples = triples.len(), "Chat extraction complete");
        Ok(triples)
    }

    fn name(&self) -> &str {
        "chat"
    }
}
