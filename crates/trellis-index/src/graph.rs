//! Directed graph index with bounded breadth-first traversal.
//!
//! This module mirrors the entity store's nodes and edges as adjacency lists
//! so neighborhoods can be expanded cheaply at query time.
//!
//! # Traversal policy
//!
//! [`GraphIndex::neighbors`] is a level-synchronous BFS capped at
//! `max_hops`. Every reached node is recorded once: with its minimum hop
//! distance and, among the paths of that length, the largest product of
//! edge weights. Cost is linear in the number of reachable nodes, never in
//! the number of paths.
//!
//! # Example
//!
//! ```
//! use trellis_index::graph::{GraphIndex, TraversalConfig};
//!
//! let mut graph = GraphIndex::new(TraversalConfig::default());
//! graph.add_node("person:ada");
//! graph.add_node("concept:engine");
//! graph.add_edge("person:ada", "concept:engine", "described", 2.0);
//!
//! let reached = graph.neighbors("person:ada", 1).unwrap();
//! assert_eq!(reached[1].node_id, "concept:engine");
//! assert_eq!(reached[1].path_weight, 2.0);
//! ```

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::NodeId;

/// Default ceiling on `max_hops` for fusion queries.
pub const DEFAULT_MAX_HOPS_CEILING: usize = 2;

/// Configuration for graph traversal.
#[derive(Debug, Clone)]
pub struct TraversalConfig {
    /// Largest `max_hops` accepted by [`GraphIndex::neighbors`]
    pub max_hops_ceiling: usize,
    /// Follow edges against their declared direction as well
    pub symmetric: bool,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_hops_ceiling: DEFAULT_MAX_HOPS_CEILING,
            symmetric: false,
        }
    }
}

impl TraversalConfig {
    /// Create a new traversal configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hop ceiling.
    pub fn with_max_hops_ceiling(mut self, ceiling: usize) -> Self {
        self.max_hops_ceiling = ceiling;
        self
    }

    /// Enable or disable symmetric traversal.
    pub fn with_symmetric(mut self, symmetric: bool) -> Self {
        self.symmetric = symmetric;
        self
    }
}

/// One half of an adjacency entry.
#[derive(Debug, Clone)]
struct Adjacent {
    node_id: NodeId,
    predicate: String,
    weight: f32,
}

/// A node reached by [`GraphIndex::neighbors`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reached {
    pub node_id: NodeId,
    /// Fewest hops from the start node
    pub hop_distance: usize,
    /// Product of edge weights along the best shortest path
    pub path_weight: f32,
}

/// Directed, labeled adjacency index.
#[derive(Debug, Clone, Default)]
pub struct GraphIndex {
    config: TraversalConfig,
    nodes: HashSet<NodeId>,
    /// source -> outgoing edges
    outgoing: HashMap<NodeId, Vec<Adjacent>>,
    /// target -> incoming edges (reverse index)
    incoming: HashMap<NodeId, Vec<Adjacent>>,
    edge_count: usize,
}

impl GraphIndex {
    /// Create an empty graph index.
    pub fn new(config: TraversalConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &TraversalConfig {
        &self.config
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.nodes.contains(node_id)
    }

    /// Register a node. Idempotent.
    pub fn add_node(&mut self, node_id: impl Into<NodeId>) {
        self.nodes.insert(node_id.into());
    }

    /// Insert or update the edge `(source, predicate, target)`.
    ///
    /// The weight is replaced, not accumulated: the entity store owns the
    /// evidence count and pushes the current value here.
    pub fn add_edge(&mut self, source: &str, target: &str, predicate: &str, weight: f32) {
        let out = self.outgoing.entry(source.to_string()).or_default();
        if let Some(existing) = out
            .iter_mut()
            .find(|a| a.node_id == target && a.predicate == predicate)
        {
            existing.weight = weight;
            if let Some(rev) = self.incoming.get_mut(target).and_then(|list| {
                list.iter_mut()
                    .find(|a| a.node_id == source && a.predicate == predicate)
            }) {
                rev.weight = weight;
            }
            return;
        }

        out.push(Adjacent {
            node_id: target.to_string(),
            predicate: predicate.to_string(),
            weight,
        });
        self.incoming
            .entry(target.to_string())
            .or_default()
            .push(Adjacent {
                node_id: source.to_string(),
                predicate: predicate.to_string(),
                weight,
            });
        self.edge_count += 1;
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, node_id: &str) {
        self.nodes.remove(node_id);

        let mut removed = 0;
        if let Some(out) = self.outgoing.remove(node_id) {
            removed += out.len();
            for adj in out {
                if let Some(list) = self.incoming.get_mut(&adj.node_id) {
                    list.retain(|a| a.node_id != node_id);
                }
            }
        }
        if let Some(inc) = self.incoming.remove(node_id) {
            for adj in inc {
                if let Some(list) = self.outgoing.get_mut(&adj.node_id) {
                    let before = list.len();
                    list.retain(|a| a.node_id != node_id);
                    removed += before - list.len();
                }
            }
        }
        self.edge_count = self.edge_count.saturating_sub(removed);
    }

    /// Clear all nodes and edges.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.outgoing.clear();
        self.incoming.clear();
        self.edge_count = 0;
    }

    /// Every node reachable from `node_id` within `max_hops` hops.
    ///
    /// The start node itself is always first (hop 0, weight 1.0) when it is
    /// registered; an unknown start node yields an empty list. Results are
    /// sorted by `(hop_distance, node_id)`.
    pub fn neighbors(&self, node_id: &str, max_hops: usize) -> Result<Vec<Reached>> {
        if max_hops > self.config.max_hops_ceiling {
            return Err(Error::out_of_range(
                "max_hops",
                max_hops,
                format!("0..={}", self.config.max_hops_ceiling),
            ));
        }
        if !self.nodes.contains(node_id) {
            debug!(node_id, "Traversal start node not in graph");
            return Ok(Vec::new());
        }

        let mut best: HashMap<&str, (usize, f32)> = HashMap::new();
        best.insert(node_id, (0, 1.0));
        let mut frontier: Vec<&str> = vec![node_id];

        for hop in 1..=max_hops {
            let mut next: HashMap<&str, f32> = HashMap::new();

            for &current in &frontier {
                let parent_weight = best[current].1;
                for adj in self.adjacent(current) {
                    let neighbor = adj.node_id.as_str();
                    if !self.nodes.contains(neighbor) {
                        warn!(
                            from = current,
                            to = neighbor,
                            predicate = %adj.predicate,
                            "Skipping edge to a node missing from the graph index"
                        );
                        continue;
                    }
                    if best.contains_key(neighbor) {
                        continue;
                    }
                    let weight = parent_weight * adj.weight;
                    next.entry(neighbor)
                        .and_modify(|w| {
                            if weight > *w {
                                *w = weight;
                            }
                        })
                        .or_insert(weight);
                }
            }

            if next.is_empty() {
                break;
            }
            let mut level: Vec<&str> = next.keys().copied().collect();
            level.sort_unstable();
            for (id, weight) in next {
                best.insert(id, (hop, weight));
            }
            frontier = level;
        }

        let mut reached: Vec<Reached> = best
            .into_iter()
            .map(|(id, (hop_distance, path_weight))| Reached {
                node_id: id.to_string(),
                hop_distance,
                path_weight,
            })
            .collect();
        reached.sort_by(|a, b| {
            a.hop_distance
                .cmp(&b.hop_distance)
                .then_with(|| a.node_id.cmp(&b.node_id))
        });

        debug!(node_id, max_hops, reached = reached.len(), "Neighborhood expanded");
        Ok(reached)
    }

    /// Edges leaving `node_id` (plus reversed incoming edges when symmetric).
    fn adjacent<'a>(&'a self, node_id: &str) -> impl Iterator<Item = &'a Adjacent> + 'a {
        let out = self.outgoing.get(node_id).into_iter().flatten();
        let inc = if self.config.symmetric {
            self.incoming.get(node_id)
        } else {
            None
        };
        out.chain(inc.into_iter().flatten())
    }
}
