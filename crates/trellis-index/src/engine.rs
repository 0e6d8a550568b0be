//! Graph-boosted hybrid query engine.
//!
//! A query runs in four steps:
//!
//! 1. **Anchor search**: top `k_anchors` nodes by cosine similarity to the
//!    query embedding.
//! 2. **Expansion**: bounded BFS from every anchor. A node reached from
//!    several anchors keeps its minimum hop distance and, at that hop, the
//!    best (or summed) path weight.
//! 3. **Boost**: `graph_boost = path_weight / (1 + hop)^decay_exponent`.
//!    Anchors get no boost, so a node is never counted twice.
//! 4. **Fusion**: `final = vector_score * alpha + graph_boost * beta`, ranked
//!    by final score, then hop distance, then node id.
//!
//! Nodes that only the graph surfaced (no vector score, positive boost) are
//! flagged as hidden gems.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Error, Result, Stage};
use crate::model::NodeId;
use crate::store::EntityStore;

/// Default weight of the vector score.
pub const DEFAULT_ALPHA: f32 = 1.0;
/// Default weight of the graph boost.
pub const DEFAULT_BETA: f32 = 0.5;
/// Default number of anchors.
pub const DEFAULT_K_ANCHORS: usize = 10;
/// Default expansion depth.
pub const DEFAULT_MAX_HOPS: usize = 2;
/// Default number of results.
pub const DEFAULT_LIMIT: usize = 20;

/// Which signals contribute to the final score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Vector similarity only (beta forced to 0)
    Vector,
    /// Graph boost only (alpha forced to 0)
    Graph,
    #[default]
    Hybrid,
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QueryMode::Vector => "vector",
            QueryMode::Graph => "graph",
            QueryMode::Hybrid => "hybrid",
        })
    }
}

impl FromStr for QueryMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "vector" => Ok(QueryMode::Vector),
            "graph" => Ok(QueryMode::Graph),
            "hybrid" => Ok(QueryMode::Hybrid),
            other => Err(Error::invalid(format!("unknown query mode '{}'", other))),
        }
    }
}

/// A retrieval request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryRequest {
    pub query: String,
    pub mode: QueryMode,
    /// Weight of the vector score
    pub alpha: f32,
    /// Weight of the graph boost
    pub beta: f32,
    pub k_anchors: usize,
    pub max_hops: usize,
    pub limit: usize,
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            mode: QueryMode::Hybrid,
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
            k_anchors: DEFAULT_K_ANCHORS,
            max_hops: DEFAULT_MAX_HOPS,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl QueryRequest {
    /// Create a hybrid request with default parameters.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: QueryMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_beta(mut self, beta: f32) -> Self {
        self.beta = beta;
        self
    }

    pub fn with_k_anchors(mut self, k_anchors: usize) -> Self {
        self.k_anchors = k_anchors;
        self
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// `(alpha, beta)` after applying the mode.
    pub fn effective_weights(&self) -> (f32, f32) {
        match self.mode {
            QueryMode::Vector => (self.alpha, 0.0),
            QueryMode::Graph => (0.0, self.beta),
            QueryMode::Hybrid => (self.alpha, self.beta),
        }
    }

    /// Reject malformed or out-of-range parameters.
    ///
    /// A `limit` of 0 is an error rather than an empty page: no caller
    /// asks for zero results on purpose, and an empty answer would hide the
    /// misconfiguration.
    pub fn validate(&self, max_hops_ceiling: usize) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(Error::invalid("query text is empty"));
        }
        if !self.alpha.is_finite() {
            return Err(Error::invalid(format!("alpha must be finite, got {}", self.alpha)));
        }
        if !self.beta.is_finite() {
            return Err(Error::invalid(format!("beta must be finite, got {}", self.beta)));
        }
        if self.k_anchors < 1 {
            return Err(Error::out_of_range("k_anchors", self.k_anchors, ">= 1"));
        }
        if self.limit < 1 {
            return Err(Error::out_of_range("limit", self.limit, ">= 1"));
        }
        if self.max_hops > max_hops_ceiling {
            return Err(Error::out_of_range(
                "max_hops",
                self.max_hops,
                format!("0..={}", max_hops_ceiling),
            ));
        }
        Ok(())
    }
}

/// How path weights of a node reached at the same minimum hop combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostAggregation {
    /// Strongest single path
    #[default]
    MaxWeight,
    /// Sum over anchors reaching the node at its minimum hop
    SumAtMinHop,
}

impl FromStr for BoostAggregation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "max_weight" | "max" => Ok(BoostAggregation::MaxWeight),
            "sum_at_min_hop" | "sum" => Ok(BoostAggregation::SumAtMinHop),
            other => Err(Error::invalid(format!("unknown boost aggregation '{}'", other))),
        }
    }
}

/// Graph boost shaping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostConfig {
    /// Exponent of the `(1 + hop)` distance decay
    pub decay_exponent: f32,
    pub aggregation: BoostAggregation,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            decay_exponent: 1.0,
            aggregation: BoostAggregation::MaxWeight,
        }
    }
}

impl BoostConfig {
    pub fn with_decay_exponent(mut self, decay_exponent: f32) -> Self {
        self.decay_exponent = decay_exponent;
        self
    }

    pub fn with_aggregation(mut self, aggregation: BoostAggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.decay_exponent.is_finite() || self.decay_exponent < 0.0 {
            return Err(Error::out_of_range(
                "decay_exponent",
                self.decay_exponent,
                "finite and >= 0",
            ));
        }
        Ok(())
    }
}

/// Boost contributed by a path of `path_weight` at `hop` hops.
pub fn graph_boost(path_weight: f32, hop: usize, decay_exponent: f32) -> f32 {
    if hop == 0 {
        return 0.0;
    }
    path_weight / (1.0 + hop as f32).powf(decay_exponent)
}

/// One ranked result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResultEntry {
    pub node_id: NodeId,
    pub label: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Cosine similarity for anchors, 0.0 otherwise
    pub vector_score: f32,
    pub graph_boost: f32,
    pub final_score: f32,
    /// 0 for anchors
    pub hop_distance: usize,
    pub is_hidden_gem: bool,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    vector_score: Option<f32>,
    hop: usize,
    path_weight: f32,
}

/// Scores a store against a query embedding.
#[derive(Debug, Clone, Default)]
pub struct HybridQueryEngine {
    boost: BoostConfig,
}

impl HybridQueryEngine {
    pub fn new(boost: BoostConfig) -> Self {
        Self { boost }
    }

    pub fn boost_config(&self) -> &BoostConfig {
        &self.boost
    }

    /// Rank nodes of `store` for `request`, given the embedded query text.
    ///
    /// `cancel` is checked before anchor search, between anchors and before
    /// fusion.
    pub fn search(
        &self,
        store: &EntityStore,
        request: &QueryRequest,
        query_embedding: &[f32],
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<QueryResultEntry>> {
        request.validate(store.graph_index().config().max_hops_ceiling)?;
        self.boost.validate()?;
        if query_embedding.iter().any(|v| !v.is_finite()) {
            return Err(Error::invalid("query embedding contains non-finite values"));
        }

        checkpoint(cancel, Stage::AnchorSearch)?;
        let anchors = store
            .vector_index()
            .query_top_k(query_embedding, request.k_anchors)?;
        if anchors.is_empty() {
            debug!("No anchors found, returning empty result");
            return Ok(Vec::new());
        }

        let mut candidates: HashMap<NodeId, Candidate> = anchors
            .iter()
            .map(|hit| {
                (
                    hit.node_id.clone(),
                    Candidate {
                        vector_score: Some(hit.score),
                        hop: 0,
                        path_weight: 1.0,
                    },
                )
            })
            .collect();

        for anchor in &anchors {
            checkpoint(cancel, Stage::Expansion)?;
            let reached = store
                .graph_index()
                .neighbors(&anchor.node_id, request.max_hops)?;
            for r in reached.into_iter().filter(|r| r.hop_distance > 0) {
                self.aggregate(&mut candidates, r.node_id, r.hop_distance, r.path_weight);
            }
        }

        checkpoint(cancel, Stage::Fusion)?;
        let (alpha, beta) = request.effective_weights();
        let mut results: Vec<QueryResultEntry> = Vec::with_capacity(candidates.len());
        for (node_id, candidate) in candidates {
            let Some(node) = store.get_node(&node_id) else {
                warn!(node_id = %node_id, "Graph returned a node missing from the store, skipping");
                continue;
            };
            let vector_score = candidate.vector_score.unwrap_or(0.0);
            let boost = match candidate.vector_score {
                Some(_) => 0.0,
                None => graph_boost(candidate.path_weight, candidate.hop, self.boost.decay_exponent),
            };
            results.push(QueryResultEntry {
                node_id,
                label: node.label.clone(),
                entity_type: node.entity_type.clone(),
                vector_score,
                graph_boost: boost,
                final_score: vector_score * alpha + boost * beta,
                hop_distance: candidate.hop,
                is_hidden_gem: candidate.vector_score.is_none() && boost > 0.0,
            });
        }

        results.sort_by(|a, b| {
            b.final_score
                .total_cmp(&a.final_score)
                .then_with(|| a.hop_distance.cmp(&b.hop_distance))
                .then_with(|| a.node_id.cmp(&b.node_id))
        });
        results.truncate(request.limit);

        debug!(
            anchors = anchors.len(),
            returned = results.len(),
            hidden_gems = results.iter().filter(|r| r.is_hidden_gem).count(),
            mode = %request.mode,
            "Hybrid query complete"
        );
        Ok(results)
    }

    fn aggregate(
        &self,
        candidates: &mut HashMap<NodeId, Candidate>,
        node_id: NodeId,
        hop: usize,
        path_weight: f32,
    ) {
        let entry = candidates.entry(node_id).or_insert(Candidate {
            vector_score: None,
            hop,
            path_weight: 0.0,
        });
        // Anchors keep their vector score and no boost.
        if entry.vector_score.is_some() {
            return;
        }
        if hop < entry.hop {
            entry.hop = hop;
            entry.path_weight = path_weight;
        } else if hop == entry.hop {
            entry.path_weight = match self.boost.aggregation {
                BoostAggregation::MaxWeight => entry.path_weight.max(path_weight),
                BoostAggregation::SumAtMinHop => entry.path_weight + path_weight,
            };
        }
    }
}

fn checkpoint(cancel: Option<&CancellationToken>, stage: Stage) -> Result<()> {
    match cancel {
        Some(token) if token.is_cancelled() => {
            debug!(%stage, "Query cancelled");
            Err(Error::Cancelled { stage })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TraversalConfig;
    use crate::model::Triple;

    fn build_store(triples: &[Triple], vectors: &[(&str, [f32; 3])]) -> EntityStore {
        let embeddings: HashMap<String, Vec<f32>> = vectors
            .iter()
            .map(|(label, v)| (label.to_string(), v.to_vec()))
            .collect();
        let mut store = EntityStore::new(TraversalConfig::default());
        store.ingest_triples(triples, &embeddings).unwrap();
        store
    }

    /// Musk -founded-> SpaceX -builds-> Starship, Musk -leads-> Tesla
    fn musk_store() -> EntityStore {
        build_store(
            &[
                Triple::new("Elon Musk", "Person", "founded", "SpaceX", "Organization"),
                Triple::new("Elon Musk", "Person", "leads", "Tesla", "Organization"),
                Triple::new("SpaceX", "Organization", "builds", "Starship", "Concept"),
            ],
            &[
                ("Elon Musk", [1.0, 0.0, 0.0]),
                ("SpaceX", [0.0, 1.0, 0.0]),
                ("Tesla", [0.0, 0.0, 1.0]),
                ("Starship", [0.0, 1.0, 1.0]),
            ],
        )
    }

    fn run(store: &EntityStore, request: &QueryRequest, embedding: &[f32]) -> Vec<QueryResultEntry> {
        HybridQueryEngine::default()
            .search(store, request, embedding, None)
            .unwrap()
    }

    fn ids(results: &[QueryResultEntry]) -> Vec<&str> {
        results.iter().map(|r| r.node_id.as_str()).collect()
    }

    #[test]
    fn test_founder_query_surfaces_company() {
        let store = musk_store();
        let request = QueryRequest::new("Who is Elon Musk?").with_k_anchors(1);
        let results = run(&store, &request, &[1.0, 0.0, 0.0]);

        assert_eq!(
            ids(&results),
            vec![
                "person:elon musk",
                "organization:spacex",
                "organization:tesla",
                "concept:starship"
            ]
        );

        let musk = &results[0];
        assert!((musk.final_score - 1.0).abs() < 1e-6);
        assert_eq!(musk.graph_boost, 0.0);
        assert!(!musk.is_hidden_gem);

        let spacex = &results[1];
        assert_eq!(spacex.label, "SpaceX");
        assert_eq!(spacex.entity_type, "Organization");
        assert_eq!(spacex.hop_distance, 1);
        assert_eq!(spacex.vector_score, 0.0);
        assert!((spacex.graph_boost - 0.5).abs() < 1e-6);
        assert!((spacex.final_score - 0.25).abs() < 1e-6);
        assert!(spacex.is_hidden_gem);

        let starship = &results[3];
        assert_eq!(starship.hop_distance, 2);
        assert!((starship.graph_boost - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_anchor_is_not_double_counted() {
        let store = musk_store();
        let request = QueryRequest::new("musk spacex").with_k_anchors(2);
        let results = run(&store, &request, &[1.0, 1.0, 0.0]);

        let spacex = results
            .iter()
            .find(|r| r.node_id == "organization:spacex")
            .unwrap();
        assert_eq!(spacex.hop_distance, 0);
        assert_eq!(spacex.graph_boost, 0.0);
        assert!((spacex.final_score - spacex.vector_score).abs() < 1e-6);
        assert!(!spacex.is_hidden_gem);

        // Reached from SpaceX at hop 1 and from Musk at hop 2: min hop wins.
        let starship = results.iter().find(|r| r.node_id == "concept:starship").unwrap();
        assert_eq!(starship.hop_distance, 1);
        assert!((starship.graph_boost - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_hidden_gems_have_no_vector_score() {
        let store = musk_store();
        let request = QueryRequest::new("Elon").with_k_anchors(1);
        for entry in run(&store, &request, &[1.0, 0.0, 0.0]) {
            assert_eq!(
                entry.is_hidden_gem,
                entry.vector_score == 0.0 && entry.graph_boost > 0.0,
                "{}",
                entry.node_id
            );
            assert_eq!(entry.is_hidden_gem, entry.hop_distance > 0);
        }
    }

    #[test]
    fn test_raising_beta_never_lowers_scores() {
        let store = musk_store();
        let embedding = [0.9, 0.2, 0.1];
        let low = run(&store, &QueryRequest::new("q").with_k_anchors(2).with_beta(0.1), &embedding);
        let high = run(&store, &QueryRequest::new("q").with_k_anchors(2).with_beta(2.0), &embedding);

        for entry in &low {
            let other = high.iter().find(|r| r.node_id == entry.node_id).unwrap();
            assert!(other.final_score >= entry.final_score);
        }
    }

    #[test]
    fn test_results_are_deterministic() {
        let store = musk_store();
        let request = QueryRequest::new("q").with_k_anchors(3);
        let first = run(&store, &request, &[0.3, 0.3, 0.3]);
        for _ in 0..5 {
            assert_eq!(run(&store, &request, &[0.3, 0.3, 0.3]), first);
        }
    }

    #[test]
    fn test_zero_hops_returns_only_anchors() {
        let store = musk_store();
        let request = QueryRequest::new("q").with_k_anchors(2).with_max_hops(0);
        let results = run(&store, &request, &[1.0, 0.0, 0.0]);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.hop_distance == 0 && r.graph_boost == 0.0));
    }

    #[test]
    fn test_k_larger_than_store_uses_every_node() {
        let store = musk_store();
        let request = QueryRequest::new("q").with_k_anchors(50);
        let results = run(&store, &request, &[1.0, 0.0, 0.0]);
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| !r.is_hidden_gem));
    }

    #[test]
    fn test_limit_truncates() {
        let store = musk_store();
        let request = QueryRequest::new("q").with_k_anchors(1).with_limit(2);
        let results = run(&store, &request, &[1.0, 0.0, 0.0]);
        assert_eq!(ids(&results), vec!["person:elon musk", "organization:spacex"]);
    }

    #[test]
    fn test_modes_force_weights() {
        let store = musk_store();
        let embedding = [1.0, 0.0, 0.0];

        let vector = run(
            &store,
            &QueryRequest::new("q").with_k_anchors(1).with_mode(QueryMode::Vector),
            &embedding,
        );
        assert_eq!(vector[0].node_id, "person:elon musk");
        assert!(vector[1..].iter().all(|r| r.final_score == 0.0));

        let graph = run(
            &store,
            &QueryRequest::new("q").with_k_anchors(1).with_mode(QueryMode::Graph),
            &embedding,
        );
        assert_eq!(graph[0].node_id, "organization:spacex");
        let musk = graph.iter().find(|r| r.node_id == "person:elon musk").unwrap();
        assert_eq!(musk.final_score, 0.0);
    }

    #[test]
    fn test_sum_aggregation_rewards_shared_neighbors() {
        let store = build_store(
            &[
                Triple::new("Ada", "Person", "knows", "Hub", "Concept"),
                Triple::new("Bob", "Person", "knows", "Hub", "Concept"),
            ],
            &[
                ("Ada", [1.0, 0.0, 0.0]),
                ("Bob", [0.0, 1.0, 0.0]),
                ("Hub", [0.0, 0.0, 1.0]),
            ],
        );
        let request = QueryRequest::new("q").with_k_anchors(2);
        let embedding = [1.0, 1.0, 0.0];

        let max = HybridQueryEngine::default()
            .search(&store, &request, &embedding, None)
            .unwrap();
        let sum = HybridQueryEngine::new(
            BoostConfig::default().with_aggregation(BoostAggregation::SumAtMinHop),
        )
        .search(&store, &request, &embedding, None)
        .unwrap();

        let hub_max = max.iter().find(|r| r.node_id == "concept:hub").unwrap();
        let hub_sum = sum.iter().find(|r| r.node_id == "concept:hub").unwrap();
        assert!((hub_max.graph_boost - 0.5).abs() < 1e-6);
        assert!((hub_sum.graph_boost - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_decay_exponent() {
        assert_eq!(graph_boost(2.0, 0, 1.0), 0.0);
        assert!((graph_boost(1.0, 1, 1.0) - 0.5).abs() < 1e-6);
        assert!((graph_boost(1.0, 2, 2.0) - 1.0 / 9.0).abs() < 1e-6);
        assert!((graph_boost(3.0, 2, 0.0) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_boost_monotonic_in_weight_and_hop() {
        let weights = [0.25f32, 0.5, 1.0, 2.0, 3.5, 10.0];
        for decay in [0.0f32, 0.5, 1.0, 2.0, 3.0] {
            for &w in &weights {
                assert_eq!(graph_boost(w, 0, decay), 0.0);
                for hop in 1..5 {
                    let near = graph_boost(w, hop, decay);
                    let far = graph_boost(w, hop + 1, decay);
                    assert!(near > 0.0);
                    if decay > 0.0 {
                        assert!(far < near, "w={} hop={} decay={}", w, hop, decay);
                    } else {
                        assert_eq!(far, near);
                    }
                }
            }
            for hop in 1..=5 {
                for pair in weights.windows(2) {
                    assert!(
                        graph_boost(pair[1], hop, decay) > graph_boost(pair[0], hop, decay),
                        "hop={} decay={}",
                        hop,
                        decay
                    );
                }
            }
        }
    }

    #[test]
    fn test_non_finite_query_embedding_rejected() {
        let store = musk_store();
        let engine = HybridQueryEngine::default();
        let request = QueryRequest::new("q");

        for bad in [[f32::NAN, 0.0, 0.0], [0.0, f32::INFINITY, 0.0]] {
            assert!(matches!(
                engine.search(&store, &request, &bad, None),
                Err(Error::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_invalid_requests_rejected() {
        let store = musk_store();
        let engine = HybridQueryEngine::default();
        let embedding = [1.0, 0.0, 0.0];
        let check = |request: QueryRequest| engine.search(&store, &request, &embedding, None);

        assert!(matches!(check(QueryRequest::new("  ")), Err(Error::InvalidInput(_))));
        assert!(matches!(
            check(QueryRequest::new("q").with_max_hops(3)),
            Err(Error::OutOfRange { name: "max_hops", .. })
        ));
        assert!(matches!(
            check(QueryRequest::new("q").with_k_anchors(0)),
            Err(Error::OutOfRange { name: "k_anchors", .. })
        ));
        assert!(matches!(
            check(QueryRequest::new("q").with_limit(0)),
            Err(Error::OutOfRange { name: "limit", .. })
        ));
        assert!(matches!(
            check(QueryRequest::new("q").with_alpha(f32::NAN)),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            engine.search(&store, &QueryRequest::new("q"), &[1.0, 0.0], None),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_empty_store_returns_nothing() {
        let store = EntityStore::new(TraversalConfig::default());
        assert!(run(&store, &QueryRequest::new("anything"), &[1.0, 0.0, 0.0]).is_empty());
    }

    #[test]
    fn test_cancelled_query() {
        let store = musk_store();
        let token = CancellationToken::new();
        token.cancel();
        let err = HybridQueryEngine::default()
            .search(&store, &QueryRequest::new("q"), &[1.0, 0.0, 0.0], Some(&token))
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled { stage: Stage::AnchorSearch }));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Graph".parse::<QueryMode>().unwrap(), QueryMode::Graph);
        assert!("fuzzy".parse::<QueryMode>().is_err());
        assert_eq!(
            serde_json::to_string(&QueryMode::Hybrid).unwrap(),
            "\"hybrid\""
        );
        assert_eq!(
            "sum_at_min_hop".parse::<BoostAggregation>().unwrap(),
            BoostAggregation::SumAtMinHop
        );
    }
}
