//! Wiring from configuration to engine components.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};

use trellis_config::{Config, EmbeddingConfig, ExtractionConfig};
use trellis_index::{
    BoostAggregation, BoostConfig, ChatExtractor, EmbeddingProvider, HashingEmbeddings,
    HeuristicExtractor, OpenAiCompatibleEmbeddings, QueryRequest, TraversalConfig, Trellis,
    TripleExtractor,
};

pub fn build_embedder(cfg: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match cfg.provider.as_str() {
        "hashing" => Arc::new(HashingEmbeddings::new(cfg.dimensions)),
        "openai" => {
            let mut provider = OpenAiCompatibleEmbeddings::new(
                cfg.resolved_api_key(),
                cfg.model.clone(),
                Some(cfg.dimensions),
            );
            if let Some(url) = &cfg.base_url {
                provider = provider.with_base_url(url.clone());
            }
            Arc::new(provider)
        }
        other => return Err(anyhow!("Unknown embedding provider: {}", other)),
    };
    debug!(model = embedder.model_name(), dims = embedder.dimensions(), "Embedding provider ready");
    Ok(embedder)
}

pub fn build_extractor(cfg: &ExtractionConfig) -> Result<Arc<dyn TripleExtractor>> {
    match cfg.provider.as_str() {
        "heuristic" => Ok(Arc::new(HeuristicExtractor::new())),
        "chat" => {
            let base_url = cfg
                .base_url
                .clone()
                .ok_or_else(|| anyhow!("extraction.base_url is required for the chat extractor"))?;
            let model = cfg
                .model
                .clone()
                .ok_or_else(|| anyhow!("extraction.model is required for the chat extractor"))?;
            Ok(Arc::new(ChatExtractor::new(base_url, model, cfg.api_key.clone())))
        }
        other => Err(anyhow!("Unknown extraction provider: {}", other)),
    }
}

fn boost_config(config: &Config) -> Result<BoostConfig> {
    let aggregation: BoostAggregation = config
        .scoring
        .aggregation
        .parse()
        .context("Invalid scoring.aggregation")?;
    Ok(BoostConfig::default()
        .with_decay_exponent(config.scoring.decay_exponent)
        .with_aggregation(aggregation))
}

fn traversal_config(config: &Config) -> TraversalConfig {
    TraversalConfig::new()
        .with_max_hops_ceiling(config.graph.max_hops_ceiling)
        .with_symmetric(config.graph.symmetric)
}

/// Open the store in the configured data directory.
pub async fn build_trellis(config: &Config) -> Result<Trellis> {
    let data_dir = config.data_dir();
    info!("Opening store in {:?}", data_dir);

    let trellis = Trellis::builder(build_embedder(&config.embedding)?)
        .with_extractor(build_extractor(&config.extraction)?)
        .with_traversal(traversal_config(config))
        .with_boost(boost_config(config)?)
        .open(&data_dir)
        .await
        .with_context(|| format!("Failed to open store in {:?}", data_dir))?;
    Ok(trellis)
}

/// A request carrying the configured query defaults.
pub fn default_request(config: &Config, query: &str) -> QueryRequest {
    let q = &config.query;
    QueryRequest::new(query)
        .with_alpha(q.alpha)
        .with_beta(q.beta)
        .with_k_anchors(q.k_anchors)
        .with_max_hops(q.max_hops)
        .with_limit(q.limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashing_embedder_uses_configured_dimensions() {
        let mut cfg = Config::default().embedding;
        cfg.dimensions = 64;
        let embedder = build_embedder(&cfg).unwrap();
        assert_eq!(embedder.dimensions(), 64);
    }

    #[test]
    fn test_unknown_providers_rejected() {
        let mut cfg = Config::default().embedding;
        cfg.provider = "word2vec".into();
        assert!(build_embedder(&cfg).is_err());

        let mut cfg = Config::default().extraction;
        cfg.provider = "chat".into();
        assert!(build_extractor(&cfg).is_err());
    }

    #[test]
    fn test_default_request_follows_config() {
        let mut config = Config::default();
        config.query.beta = 0.9;
        config.query.limit = 4;
        let request = default_request(&config, "rockets");
        assert_eq!(request.query, "rockets");
        assert_eq!(request.beta, 0.9);
        assert_eq!(request.limit, 4);
        assert_eq!(request.alpha, 1.0);
    }

    #[test]
    fn test_boost_config_parses_aggregation() {
        let mut config = Config::default();
        config.scoring.aggregation = "sum_at_min_hop".into();
        config.scoring.decay_exponent = 2.0;
        let boost = boost_config(&config).unwrap();
        assert_eq!(boost.aggregation, BoostAggregation::SumAtMinHop);
        assert_eq!(boost.decay_exponent, 2.0);
    }
}
