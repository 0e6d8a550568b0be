//! The `Trellis` facade: shared store plus embedding and extraction providers.
//!
//! All provider I/O happens outside the lock. A batch is extracted and
//! embedded first, then applied under a single write guard; a query is
//! embedded first, then evaluated under a single read guard. Readers never
//! see half of a batch.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use trellis_index::{HashingEmbeddings, QueryRequest, Trellis};
//!
//! # async fn demo() -> trellis_index::Result<()> {
//! let trellis = Trellis::builder(Arc::new(HashingEmbeddings::default())).build();
//! trellis.ingest("Elon Musk founded SpaceX. SpaceX builds Starship.").await?;
//!
//! for hit in trellis.query(QueryRequest::new("Elon Musk")).await? {
//!     println!("{} {:.3} gem={}", hit.label, hit.final_score, hit.is_hidden_gem);
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::embeddings::{embed_all, EmbeddingProvider};
use crate::engine::{BoostConfig, HybridQueryEngine, QueryRequest, QueryResultEntry};
use crate::error::{Error, Result, Stage};
use crate::extraction::{HeuristicExtractor, TripleExtractor};
use crate::graph::TraversalConfig;
use crate::model::{NodeId, Triple};
use crate::storage::SnapshotStorage;
use crate::store::{
    EntityStore, ExactMatchResolver, GraphExport, IdentityResolver, IngestReport, StoreStats,
};

/// SHA-256 hex digest identifying an ingestion batch.
pub fn batch_id(input: &[u8]) -> String {
    hex::encode(Sha256::digest(input))
}

/// Configures and creates a [`Trellis`].
pub struct TrellisBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    extractor: Arc<dyn TripleExtractor>,
    traversal: TraversalConfig,
    boost: BoostConfig,
    resolver: Box<dyn IdentityResolver>,
}

impl TrellisBuilder {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            extractor: Arc::new(HeuristicExtractor::new()),
            traversal: TraversalConfig::default(),
            boost: BoostConfig::default(),
            resolver: Box::new(ExactMatchResolver),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TripleExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_traversal(mut self, traversal: TraversalConfig) -> Self {
        self.traversal = traversal;
        self
    }

    pub fn with_boost(mut self, boost: BoostConfig) -> Self {
        self.boost = boost;
        self
    }

    pub fn with_resolver(mut self, resolver: Box<dyn IdentityResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Create an empty instance.
    pub fn build(self) -> Trellis {
        let store = EntityStore::with_resolver(self.traversal.clone(), self.resolver);
        Trellis::from_parts(store, self.embedder, self.extractor, self.traversal, self.boost)
    }

    /// Create an instance from the snapshot saved in `dir`, or an empty one
    /// if nothing was saved there yet.
    ///
    /// Nodes whose vector is missing from the snapshot are re-embedded from
    /// their label.
    pub async fn open(self, dir: impl AsRef<Path>) -> Result<Trellis> {
        let storage = SnapshotStorage::init(dir.as_ref()).map_err(Error::Persistence)?;
        let Some(snapshot) = storage.load().map_err(Error::Persistence)? else {
            info!("No snapshot in {:?}, starting empty", storage.storage_dir());
            return Ok(self.build());
        };

        let missing = snapshot.nodes_missing_vectors();
        let mut recovered: HashMap<NodeId, Vec<f32>> = HashMap::new();
        if !missing.is_empty() {
            warn!(nodes = missing.len(), "Snapshot is missing vectors, re-embedding labels");
            let labels: Vec<String> = missing.iter().map(|(_, label)| label.clone()).collect();
            let vectors = embed_all(self.embedder.as_ref(), &labels)
                .await
                .map_err(|e| Error::provider(Stage::Embed, e))?;
            recovered = missing.into_iter().map(|(id, _)| id).zip(vectors).collect();
        }

        let store = EntityStore::restore(snapshot, recovered, self.traversal.clone(), self.resolver)?;
        Ok(Trellis::from_parts(
            store,
            self.embedder,
            self.extractor,
            self.traversal,
            self.boost,
        ))
    }
}

/// Hybrid graph + vector retrieval over a shared entity store.
#[derive(Clone)]
pub struct Trellis {
    state: Arc<RwLock<EntityStore>>,
    embedder: Arc<dyn EmbeddingProvider>,
    extractor: Arc<dyn TripleExtractor>,
    traversal: TraversalConfig,
    engine: HybridQueryEngine,
}

impl Trellis {
    pub fn builder(embedder: Arc<dyn EmbeddingProvider>) -> TrellisBuilder {
        TrellisBuilder::new(embedder)
    }

    fn from_parts(
        store: EntityStore,
        embedder: Arc<dyn EmbeddingProvider>,
        extractor: Arc<dyn TripleExtractor>,
        traversal: TraversalConfig,
        boost: BoostConfig,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(store)),
            embedder,
            extractor,
            traversal,
            engine: HybridQueryEngine::new(boost),
        }
    }

    /// Extract triples from `text` and ingest them.
    pub async fn ingest(&self, text: &str) -> Result<IngestReport> {
        if text.trim().is_empty() {
            return Err(Error::invalid("ingest text is empty"));
        }
        let batch_id = batch_id(text.as_bytes());

        let triples = self.extractor.extract(text).await.map_err(|e| {
            warn!(batch_id = %batch_id, extractor = self.extractor.name(), "Extraction failed: {:#}", e);
            Error::provider(Stage::Extract, e)
        })?;
        debug!(batch_id = %batch_id, triples = triples.len(), "Extracted triples");

        self.apply(batch_id, &triples).await
    }

    /// Ingest pre-extracted triples.
    pub async fn ingest_triples(&self, triples: &[Triple]) -> Result<IngestReport> {
        let encoded = serde_json::to_vec(triples)
            .map_err(|e| Error::invalid(format!("unencodable triples: {}", e)))?;
        self.apply(batch_id(&encoded), triples).await
    }

    async fn apply(&self, batch_id: String, triples: &[Triple]) -> Result<IngestReport> {
        let forms = EntityStore::surface_forms(triples);
        let vectors = embed_all(self.embedder.as_ref(), &forms).await.map_err(|e| {
            warn!(batch_id = %batch_id, "Embedding failed, batch abandoned: {:#}", e);
            Error::provider(Stage::Embed, e)
        })?;
        let embeddings: HashMap<String, Vec<f32>> = forms.into_iter().zip(vectors).collect();

        let mut store = self.state.write().await;
        let mut report = store.ingest_triples(triples, &embeddings).map_err(|e| {
            warn!(batch_id = %batch_id, "Batch rejected: {}", e);
            e
        })?;
        report.batch_id = batch_id;
        Ok(report)
    }

    /// Run a hybrid query.
    pub async fn query(&self, request: QueryRequest) -> Result<Vec<QueryResultEntry>> {
        self.run_query(&request, None).await
    }

    /// Run a hybrid query that stops early once `cancel` fires.
    pub async fn query_with_cancel(
        &self,
        request: QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<QueryResultEntry>> {
        self.run_query(&request, Some(cancel)).await
    }

    async fn run_query(
        &self,
        request: &QueryRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<QueryResultEntry>> {
        request.validate(self.traversal.max_hops_ceiling)?;
        if cancel.map_or(false, |c| c.is_cancelled()) {
            return Err(Error::Cancelled { stage: Stage::Embed });
        }

        let embedding = self
            .embedder
            .embed(&request.query)
            .await
            .map_err(|e| Error::provider(Stage::Embed, e))?;

        let store = self.state.read().await;
        self.engine.search(&store, request, &embedding, cancel)
    }

    pub async fn export_graph(&self) -> GraphExport {
        self.state.read().await.export_graph()
    }

    pub async fn stats(&self) -> StoreStats {
        self.state.read().await.stats()
    }

    /// Remove a node with its edges and vector. Returns `false` if unknown.
    pub async fn remove_node(&self, id: &str) -> bool {
        self.state.write().await.remove_node(id)
    }

    pub async fn reset(&self) {
        self.state.write().await.reset();
    }

    /// Persist the current state to `dir`. Returns the saved version.
    pub async fn save(&self, dir: impl AsRef<Path>) -> Result<u32> {
        let mut snapshot = self.state.read().await.snapshot();
        let mut storage = SnapshotStorage::init(dir.as_ref()).map_err(Error::Persistence)?;
        storage.save(&mut snapshot).map_err(Error::Persistence)
    }
}
