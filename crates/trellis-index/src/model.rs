//! Data model for the knowledge graph: canonical entity nodes, directed
//! relation edges and the extracted triples they are built from.
//!
//! Identity is derived from normalized text so that two extractions of
//! "Elon  Musk" and "elon musk" with the same type land on the same node.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Unique identifier for a node (`"{type}:{name}"`, both normalized).
pub type NodeId = String;

/// Key identifying an edge: `(source_id, predicate, target_id)`.
pub type EdgeKey = (NodeId, String, NodeId);

/// Trim, collapse internal whitespace and lowercase.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Trim and collapse internal whitespace, preserving case.
pub fn clean_surface_form(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a relation label (lowercased, trimmed).
pub fn normalize_predicate(predicate: &str) -> String {
    normalize_text(predicate)
}

/// Build a node id from a raw label and entity type.
pub fn node_id(label: &str, entity_type: &str) -> NodeId {
    format!("{}:{}", normalize_text(entity_type), normalize_text(label))
}

/// A (subject, predicate, object) relation produced by an extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub subject_type: String,
    pub predicate: String,
    pub object: String,
    pub object_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl Triple {
    /// Create a new triple without a confidence score.
    pub fn new(
        subject: impl Into<String>,
        subject_type: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
        object_type: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            subject_type: subject_type.into(),
            predicate: predicate.into(),
            object: object.into(),
            object_type: object_type.into(),
            confidence: None,
        }
    }

    /// Attach an extractor confidence score.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Check the triple is well formed, returning the reason if not.
    pub fn validate(&self) -> Result<(), String> {
        if normalize_text(&self.subject).is_empty() {
            return Err("missing subject label".to_string());
        }
        if normalize_text(&self.object).is_empty() {
            return Err("missing object label".to_string());
        }
        if normalize_predicate(&self.predicate).is_empty() {
            return Err("missing predicate".to_string());
        }
        if let Some(c) = self.confidence {
            if !c.is_finite() || !(0.0..=1.0).contains(&c) {
                return Err(format!("confidence {} outside [0, 1]", c));
            }
        }
        Ok(())
    }
}

/// A canonical entity in the knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Stable identifier derived from normalized type + label
    pub id: NodeId,
    /// Display name (most frequent surface form)
    pub label: String,
    /// Entity category, e.g. "Person", "Organization"
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Embedding of the current label
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// Number of supporting extractions
    pub mention_count: u64,
    /// Surface form -> times observed
    #[serde(default)]
    pub label_counts: HashMap<String, u64>,
}

impl Node {
    /// Create a node from its first mention.
    pub fn new(
        id: impl Into<NodeId>,
        label: &str,
        entity_type: &str,
        embedding: Vec<f32>,
    ) -> Self {
        let surface = clean_surface_form(label);
        let mut label_counts = HashMap::new();
        label_counts.insert(surface.clone(), 1);

        Self {
            id: id.into(),
            label: surface,
            entity_type: entity_type.trim().to_string(),
            embedding,
            mention_count: 1,
            label_counts,
        }
    }

    /// Record another mention of this entity.
    ///
    /// Returns the new canonical label when the mention makes a different
    /// surface form strictly the most frequent one.
    pub fn record_mention(&mut self, surface: &str) -> Option<String> {
        self.mention_count += 1;
        let surface = clean_surface_form(surface);
        let count = {
            let entry = self.label_counts.entry(surface.clone()).or_insert(0);
            *entry += 1;
            *entry
        };

        if surface == self.label {
            return None;
        }
        let current = self.label_counts.get(&self.label).copied().unwrap_or(0);
        if count > current {
            self.label = surface.clone();
            Some(surface)
        } else {
            None
        }
    }
}

/// A directed, labeled relation between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub source_id: NodeId,
    pub target_id: NodeId,
    /// Normalized relation label
    pub predicate: String,
    /// Accumulated evidence (1.0 per observation)
    pub weight: f32,
    /// Mean extractor confidence over observations that carried one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub(crate) confidence_observations: u32,
}

impl Edge {
    /// Create an edge from its first observation.
    pub fn new(
        source_id: impl Into<NodeId>,
        target_id: impl Into<NodeId>,
        predicate: &str,
        confidence: Option<f32>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            predicate: normalize_predicate(predicate),
            weight: 1.0,
            confidence,
            confidence_observations: u32::from(confidence.is_some()),
        }
    }

    /// Key under which this edge is stored.
    pub fn key(&self) -> EdgeKey {
        (
            self.source_id.clone(),
            self.predicate.clone(),
            self.target_id.clone(),
        )
    }

    /// Strengthen the edge with a repeated observation.
    pub fn observe(&mut self, confidence: Option<f32>) {
        self.weight += 1.0;
        if let Some(c) = confidence {
            let n = self.confidence_observations as f32;
            let mean = self.confidence.unwrap_or(0.0);
            self.confidence = Some((mean * n + c) / (n + 1.0));
            self.confidence_observations += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_normalization() {
        assert_eq!(node_id("  Elon   Musk ", "Person"), "person:elon musk");
        assert_eq!(node_id("elon musk", "PERSON"), node_id("Elon Musk", "person"));
        assert_ne!(node_id("Apple", "Organization"), node_id("Apple", "Concept"));
    }

    #[test]
    fn test_triple_validation() {
        assert!(Triple::new("A", "T", "likes", "B", "T").validate().is_ok());
        assert!(Triple::new("  ", "T", "likes", "B", "T").validate().is_err());
        assert!(Triple::new("A", "T", "likes", "", "T").validate().is_err());
        assert!(Triple::new("A", "T", " ", "B", "T").validate().is_err());
        assert!(Triple::new("A", "T", "likes", "B", "T")
            .with_confidence(1.5)
            .validate()
            .is_err());
        assert!(Triple::new("A", "T", "likes", "B", "T")
            .with_confidence(f32::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_most_frequent_label_wins() {
        let mut node = Node::new("organization:spacex", "SpaceX", "Organization", vec![]);
        assert_eq!(node.record_mention("Spacex"), None);
        assert_eq!(node.label, "SpaceX");
        assert_eq!(node.record_mention("Spacex"), Some("Spacex".to_string()));
        assert_eq!(node.label, "Spacex");
        assert_eq!(node.mention_count, 3);
    }

    #[test]
    fn test_label_tie_keeps_current() {
        let mut node = Node::new("organization:nasa", "NASA", "Organization", vec![]);
        assert_eq!(node.record_mention("Nasa"), None);
        assert_eq!(node.label, "NASA");
    }

    #[test]
    fn test_edge_observe_averages_confidence() {
        let mut edge = Edge::new("a", "b", " Founded ", Some(0.8));
        assert_eq!(edge.predicate, "founded");
        edge.observe(Some(0.4));
        assert_eq!(edge.weight, 2.0);
        assert!((edge.confidence.unwrap() - 0.6).abs() < 1e-6);

        edge.observe(None);
        assert_eq!(edge.weight, 3.0);
        assert!((edge.confidence.unwrap() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_edge_confidence_first_seen_later() {
        let mut edge = Edge::new("a", "b", "knows", None);
        assert!(edge.confidence.is_none());
        edge.observe(Some(0.9));
        assert!((edge.confidence.unwrap() - 0.9).abs() < 1e-6);
    }
}
