//! Hybrid retrieval over a knowledge graph and a vector store.
//!
//! This crate provides:
//! - Canonical entity/relation storage with merge-or-create identity resolution
//! - An exact cosine-similarity vector index keyed by node id
//! - A directed, weighted graph index with bounded multi-hop expansion
//! - Graph-boosted semantic search that surfaces "hidden gems": entities the
//!   graph connects to the query's anchors even though their text is unlike it
//! - Embedding (HTTP and offline hashing) and triple extraction (heuristic and
//!   chat-based) providers
//! - JSON snapshot persistence with versioned backups

pub mod embeddings;
pub mod engine;
pub mod error;
pub mod extraction;
pub mod graph;
pub mod model;
pub mod storage;
pub mod store;
pub mod trellis;
pub mod vector;

// Re-exports
pub use embeddings::{EmbeddingProvider, HashingEmbeddings, OpenAiCompatibleEmbeddings};
pub use engine::{
    graph_boost, BoostAggregation, BoostConfig, HybridQueryEngine, QueryMode, QueryRequest,
    QueryResultEntry,
};
pub use error::{Error, Result, Stage};
pub use extraction::{ChatExtractor, HeuristicExtractor, TripleExtractor};
pub use graph::{GraphIndex, Reached, TraversalConfig};
pub use model::{Edge, Node, NodeId, Triple};
pub use storage::{SnapshotMetadata, SnapshotStorage, StoreSnapshot};
pub use store::{
    EntityStore, ExactMatchResolver, GraphExport, IdentityResolver, IngestReport, StoreStats,
};
pub use trellis::{Trellis, TrellisBuilder};
pub use vector::{VectorHit, VectorIndex};
