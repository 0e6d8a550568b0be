//! Triple extraction from raw text.
//!
//! Extraction is a black box to the store: text in, `(subject, predicate,
//! object)` triples out. Providers:
//! - [`HeuristicExtractor`]: offline, capitalized-span pattern matching
//! - [`ChatExtractor`]: OpenAI-compatible chat completion returning JSON

mod chat;
mod heuristic;

pub use chat::ChatExtractor;
pub use heuristic::{preprocess, HeuristicExtractor};

use anyhow::Result;
use async_trait::async_trait;

use crate::model::Triple;

/// Trait for triple extractors.
#[async_trait]
pub trait TripleExtractor: Send + Sync {
    /// Extract relation triples from `text`.
    async fn extract(&self, text: &str) -> Result<Vec<Triple>>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}
