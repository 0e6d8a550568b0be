//! In-memory vector index over node embeddings.
//!
//! Exact cosine similarity search. The index is a derived view keyed by
//! node id; the entity store decides what goes in and what comes out.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::NodeId;

/// A similarity hit returned by [`VectorIndex::query_top_k`].
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub node_id: NodeId,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
}

/// Stored unit-length copy of a node embedding.
#[derive(Debug, Clone)]
struct StoredVector {
    unit: Vec<f32>,
}

/// Exact cosine-similarity index keyed by node id.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    vectors: HashMap<NodeId, StoredVector>,
    dimensions: Option<usize>,
}

impl VectorIndex {
    /// Create an empty index. The dimension is fixed by the first upsert.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Whether a vector is stored for `node_id`.
    pub fn contains(&self, node_id: &str) -> bool {
        self.vectors.contains_key(node_id)
    }

    /// Dimension of stored vectors, once known.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    /// Insert or replace the vector for a node.
    pub fn upsert(&mut self, node_id: impl Into<NodeId>, embedding: &[f32]) -> Result<()> {
        self.check_dimensions(embedding.len())?;
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(Error::invalid("embedding contains non-finite values"));
        }
        self.dimensions.get_or_insert(embedding.len());
        self.vectors.insert(
            node_id.into(),
            StoredVector {
                unit: normalize(embedding),
            },
        );
        Ok(())
    }

    /// Delete a vector. No-op if absent.
    pub fn remove(&mut self, node_id: &str) {
        self.vectors.remove(node_id);
    }

    /// Remove all vectors (the dimension stays fixed).
    pub fn clear(&mut self) {
        self.vectors.clear();
    }

    /// Top-`k` nodes by cosine similarity to `embedding`.
    ///
    /// Results are ordered by descending similarity with ties broken by the
    /// smaller node id. Returns everything when fewer than `k` are stored.
    pub fn query_top_k(&self, embedding: &[f32], k: usize) -> Result<Vec<VectorHit>> {
        if k < 1 {
            return Err(Error::out_of_range("k", k, ">= 1"));
        }
        if self.vectors.is_empty() {
            return Ok(Vec::new());
        }
        self.check_dimensions(embedding.len())?;

        let query = normalize(embedding);
        let mut hits: Vec<VectorHit> = self
            .vectors
            .iter()
            .map(|(id, stored)| VectorHit {
                node_id: id.clone(),
                score: dot(&query, &stored.unit).clamp(-1.0, 1.0),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.node_id.cmp(&b.node_id))
        });
        hits.truncate(k);

        debug!(k, returned = hits.len(), "Vector top-k query");
        Ok(hits)
    }

    fn check_dimensions(&self, len: usize) -> Result<()> {
        match self.dimensions {
            Some(dim) if dim != len => Err(Error::invalid(format!(
                "embedding dimension mismatch: expected {}, got {}",
                dim, len
            ))),
            _ if len == 0 => Err(Error::invalid("embedding is empty")),
            _ => Ok(()),
        }
    }
}

/// Scale a vector to unit length; zero vectors stay zero.
fn normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vec![0.0; v.len()];
    }
    v.iter().map(|x| x / norm).collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Cosine similarity between two vectors (0.0 if either has zero norm).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    dot(&normalize(a), &normalize(b))
}
