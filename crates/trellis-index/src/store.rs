//! Entity/relation store: the source of truth for nodes and edges.
//!
//! Extracted triples are canonicalized here. Every subject and object is
//! resolved to a node identity (merge-or-create), and every relation is
//! upserted as a weighted edge. The store also owns the two derived views,
//! the [`VectorIndex`] and the [`GraphIndex`], and updates them in a fixed
//! order (node record, then vector, then graph) so a node never shows up in
//! one index without the other.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::graph::{GraphIndex, TraversalConfig};
use crate::model::{self, clean_surface_form, normalize_predicate, Edge, EdgeKey, Node, NodeId, Triple};
use crate::storage::{StoreSnapshot, VectorRecord};
use crate::vector::VectorIndex;

/// Strategy mapping an extracted mention to a node identity.
pub trait IdentityResolver: Send + Sync {
    /// Resolve a mention to the id of the node it denotes.
    fn resolve(&self, label: &str, entity_type: &str) -> NodeId;
}

/// Exact normalized-label + normalized-type matching.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatchResolver;

impl IdentityResolver for ExactMatchResolver {
    fn resolve(&self, label: &str, entity_type: &str) -> NodeId {
        model::node_id(label, entity_type)
    }
}

/// Counts describing what one ingestion batch changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// SHA-256 digest of the batch input
    pub batch_id: String,
    pub triples_received: usize,
    pub nodes_created: usize,
    pub nodes_merged: usize,
    pub edges_created: usize,
    pub edges_updated: usize,
    pub triples_rejected: usize,
    pub self_loops_dropped: usize,
}

/// Node entry of a [`GraphExport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportNode {
    pub id: NodeId,
    pub label: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub mention_count: u64,
}

/// Edge entry of a [`GraphExport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub predicate: String,
    pub weight: f32,
}

/// Node-link view of the whole graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<ExportNode>,
    pub edges: Vec<ExportEdge>,
}

/// Sizes of the store and its derived indexes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub nodes: usize,
    pub edges: usize,
    pub vectors: usize,
}

/// Nodes, edges and their derived vector/graph indexes.
pub struct EntityStore {
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<EdgeKey, Edge>,
    vectors: VectorIndex,
    graph: GraphIndex,
    resolver: Box<dyn IdentityResolver>,
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .field("vectors", &self.vectors.len())
            .finish()
    }
}

impl EntityStore {
    /// Create an empty store using exact-match identity resolution.
    pub fn new(traversal: TraversalConfig) -> Self {
        Self::with_resolver(traversal, Box::new(ExactMatchResolver))
    }

    /// Create an empty store with a custom identity resolver.
    pub fn with_resolver(traversal: TraversalConfig, resolver: Box<dyn IdentityResolver>) -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            vectors: VectorIndex::new(),
            graph: GraphIndex::new(traversal),
            resolver,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Look up an edge by its `(source, predicate, target)` key.
    pub fn get_edge(&self, source: &str, predicate: &str, target: &str) -> Option<&Edge> {
        self.edges.get(&(
            source.to_string(),
            normalize_predicate(predicate),
            target.to_string(),
        ))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn vector_index(&self) -> &VectorIndex {
        &self.vectors
    }

    pub fn graph_index(&self) -> &GraphIndex {
        &self.graph
    }

    /// A node is ready for querying once both indexes hold it.
    pub fn is_ready(&self, id: &str) -> bool {
        self.nodes.contains_key(id) && self.vectors.contains(id) && self.graph.contains_node(id)
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            vectors: self.vectors.len(),
        }
    }

    /// Distinct cleaned surface forms an ingestion of `triples` may need
    /// embeddings for, in first-seen order.
    pub fn surface_forms(triples: &[Triple]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut forms = Vec::new();
        for triple in triples.iter().filter(|t| t.validate().is_ok()) {
            for label in [&triple.subject, &triple.object] {
                let surface = clean_surface_form(label);
                if seen.insert(surface.clone()) {
                    forms.push(surface);
                }
            }
        }
        forms
    }

    /// Apply a batch of triples.
    ///
    /// `embeddings` maps each cleaned surface form (see
    /// [`EntityStore::surface_forms`]) to its vector. The batch is checked
    /// up front; if any needed embedding is missing or has the wrong
    /// dimension, nothing is written.
    pub fn ingest_triples(
        &mut self,
        triples: &[Triple],
        embeddings: &HashMap<String, Vec<f32>>,
    ) -> Result<IngestReport> {
        self.check_embeddings(triples, embeddings)?;

        let mut report = IngestReport {
            triples_received: triples.len(),
            ..IngestReport::default()
        };

        for triple in triples {
            if let Err(reason) = triple.validate() {
                debug!(?triple, %reason, "Rejecting malformed triple");
                report.triples_rejected += 1;
                continue;
            }

            let subject_id = self.resolver.resolve(&triple.subject, &triple.subject_type);
            let object_id = self.resolver.resolve(&triple.object, &triple.object_type);
            if subject_id == object_id {
                debug!(node_id = %subject_id, "Dropping self-loop");
                report.self_loops_dropped += 1;
                continue;
            }

            self.upsert_node(&subject_id, &triple.subject, &triple.subject_type, embeddings, &mut report)?;
            self.upsert_node(&object_id, &triple.object, &triple.object_type, embeddings, &mut report)?;
            self.upsert_edge(&subject_id, &object_id, &triple.predicate, triple.confidence, &mut report);
        }

        info!(
            nodes_created = report.nodes_created,
            nodes_merged = report.nodes_merged,
            edges_created = report.edges_created,
            edges_updated = report.edges_updated,
            triples_rejected = report.triples_rejected,
            self_loops_dropped = report.self_loops_dropped,
            "Applied ingestion batch"
        );
        Ok(report)
    }

    fn check_embeddings(
        &self,
        triples: &[Triple],
        embeddings: &HashMap<String, Vec<f32>>,
    ) -> Result<()> {
        let mut dimension = self.vectors.dimensions();
        for surface in Self::surface_forms(triples) {
            let vector = embeddings
                .get(&surface)
                .ok_or_else(|| Error::invalid(format!("no embedding supplied for '{}'", surface)))?;
            if vector.is_empty() || vector.iter().any(|v| !v.is_finite()) {
                return Err(Error::invalid(format!("invalid embedding for '{}'", surface)));
            }
            match dimension {
                Some(dim) if dim != vector.len() => {
                    return Err(Error::invalid(format!(
                        "embedding dimension mismatch for '{}': expected {}, got {}",
                        surface,
                        dim,
                        vector.len()
                    )));
                }
                Some(_) => {}
                None => dimension = Some(vector.len()),
            }
        }
        Ok(())
    }

    fn upsert_node(
        &mut self,
        id: &str,
        label: &str,
        entity_type: &str,
        embeddings: &HashMap<String, Vec<f32>>,
        report: &mut IngestReport,
    ) -> Result<()> {
        let surface = clean_surface_form(label);

        if let Some(node) = self.nodes.get_mut(id) {
            report.nodes_merged += 1;
            if let Some(new_label) = node.record_mention(&surface) {
                if let Some(vector) = embeddings.get(&new_label) {
                    debug!(node_id = id, label = %new_label, "Canonical label changed, re-embedding");
                    node.embedding = vector.clone();
                    self.vectors.upsert(id, vector)?;
                }
            }
            return Ok(());
        }

        let vector = embeddings
            .get(&surface)
            .cloned()
            .ok_or_else(|| Error::invalid(format!("no embedding supplied for '{}'", surface)))?;
        self.vectors.upsert(id, &vector)?;
        self.graph.add_node(id);
        self.nodes
            .insert(id.to_string(), Node::new(id, &surface, entity_type, vector));
        report.nodes_created += 1;
        Ok(())
    }

    fn upsert_edge(
        &mut self,
        source: &str,
        target: &str,
        predicate: &str,
        confidence: Option<f32>,
        report: &mut IngestReport,
    ) {
        let key = (source.to_string(), normalize_predicate(predicate), target.to_string());
        let weight = match self.edges.get_mut(&key) {
            Some(edge) => {
                edge.observe(confidence);
                report.edges_updated += 1;
                edge.weight
            }
            None => {
                let edge = Edge::new(source, target, predicate, confidence);
                let weight = edge.weight;
                self.edges.insert(key.clone(), edge);
                report.edges_created += 1;
                weight
            }
        };
        self.graph.add_edge(source, target, &key.1, weight);
    }

    /// Remove a node, its incident edges and its vector.
    ///
    /// Returns `false` if the node did not exist.
    pub fn remove_node(&mut self, id: &str) -> bool {
        if self.nodes.remove(id).is_none() {
            return false;
        }
        let before = self.edges.len();
        self.edges
            .retain(|(source, _, target), _| source != id && target != id);
        self.vectors.remove(id);
        self.graph.remove_node(id);
        info!(node_id = id, edges_removed = before - self.edges.len(), "Removed node");
        true
    }

    /// Delete every node, edge and vector.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.vectors.clear();
        self.graph.clear();
        info!("Store reset");
    }

    /// Node-link export sorted by node id and edge key.
    pub fn export_graph(&self) -> GraphExport {
        let mut nodes: Vec<ExportNode> = self
            .nodes
            .values()
            .map(|n| ExportNode {
                id: n.id.clone(),
                label: n.label.clone(),
                entity_type: n.entity_type.clone(),
                mention_count: n.mention_count,
            })
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));

        let mut keys: Vec<&EdgeKey> = self.edges.keys().collect();
        keys.sort();
        let edges = keys
            .into_iter()
            .map(|key| {
                let e = &self.edges[key];
                ExportEdge {
                    source: e.source_id.clone(),
                    target: e.target_id.clone(),
                    predicate: e.predicate.clone(),
                    weight: e.weight,
                }
            })
            .collect();

        GraphExport { nodes, edges }
    }

    /// Capture the persisted tables (nodes, edges, vectors).
    pub fn snapshot(&self) -> StoreSnapshot {
        let mut nodes: Vec<Node> = self
            .nodes
            .values()
            .map(|n| Node {
                embedding: Vec::new(),
                ..n.clone()
            })
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));

        let mut vectors: Vec<VectorRecord> = self
            .nodes
            .values()
            .map(|n| VectorRecord {
                node_id: n.id.clone(),
                embedding: n.embedding.clone(),
            })
            .collect();
        vectors.sort_by(|a, b| a.node_id.cmp(&b.node_id));

        let mut edges: Vec<Edge> = self.edges.values().cloned().collect();
        edges.sort_by_key(|e| e.key());

        StoreSnapshot {
            version: 0,
            nodes,
            edges,
            vectors,
        }
    }

    /// Rebuild a store (and both indexes) from a snapshot.
    ///
    /// `recovered` supplies vectors for nodes the snapshot has none for (see
    /// [`StoreSnapshot::nodes_missing_vectors`]). Vectors of unknown nodes
    /// and edges with a missing endpoint are dropped with a warning.
    pub fn restore(
        snapshot: StoreSnapshot,
        recovered: HashMap<NodeId, Vec<f32>>,
        traversal: TraversalConfig,
        resolver: Box<dyn IdentityResolver>,
    ) -> Result<Self> {
        let mut store = Self::with_resolver(traversal, resolver);

        // Empty records count as missing; re-embedded vectors win.
        let mut vectors: HashMap<NodeId, Vec<f32>> = snapshot
            .vectors
            .into_iter()
            .filter(|record| !record.embedding.is_empty())
            .map(|record| (record.node_id, record.embedding))
            .collect();
        vectors.extend(recovered);

        for mut node in snapshot.nodes {
            let vector = vectors.remove(&node.id).ok_or_else(|| {
                Error::invalid(format!("no vector available for node '{}'", node.id))
            })?;
            store.vectors.upsert(node.id.as_str(), &vector)?;
            store.graph.add_node(node.id.as_str());
            node.embedding = vector;
            store.nodes.insert(node.id.clone(), node);
        }
        for orphan in vectors.keys() {
            warn!(node_id = %orphan, "Dropping vector for unknown node");
        }

        for edge in snapshot.edges {
            let consistent = edge.source_id != edge.target_id
                && store.nodes.contains_key(&edge.source_id)
                && store.nodes.contains_key(&edge.target_id);
            if !consistent {
                warn!(
                    source = %edge.source_id,
                    target = %edge.target_id,
                    predicate = %edge.predicate,
                    "Dropping inconsistent edge from snapshot"
                );
                continue;
            }
            store
                .graph
                .add_edge(&edge.source_id, &edge.target_id, &edge.predicate, edge.weight);
            store.edges.insert(edge.key(), edge);
        }

        info!(
            nodes = store.nodes.len(),
            edges = store.edges.len(),
            "Restored store from snapshot"
        );
        Ok(store)
    }
}
