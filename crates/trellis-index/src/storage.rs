//! Snapshot persistence for the entity/relation store.
//!
//! A storage directory holds:
//! - `graph.json`: the current snapshot (nodes, edges and vectors tables)
//! - `snapshots/`: versioned copies of previous saves, at most [`MAX_SNAPSHOTS`]
//!
//! Saves go to a temp file that is then renamed over `graph.json`, so a crash
//! mid-write leaves the previous state intact.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::model::{Edge, Node, NodeId};

/// Current snapshot file name.
pub const GRAPH_FILE: &str = "graph.json";

/// Snapshot directory.
pub const SNAPSHOT_DIR: &str = "snapshots";

/// Maximum snapshots to keep.
pub const MAX_SNAPSHOTS: usize = 10;

/// Embedding of one node, stored apart from the node record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub node_id: NodeId,
    pub embedding: Vec<f32>,
}

/// Persisted form of the whole store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Save generation (incremented on each save)
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub vectors: Vec<VectorRecord>,
}

impl StoreSnapshot {
    /// `(node_id, label)` of nodes with no entry in the vectors table.
    ///
    /// These need re-embedding from their label before the store can be
    /// restored.
    pub fn nodes_missing_vectors(&self) -> Vec<(NodeId, String)> {
        let covered: HashSet<&str> = self
            .vectors
            .iter()
            .filter(|v| !v.embedding.is_empty())
            .map(|v| v.node_id.as_str())
            .collect();
        self.nodes
            .iter()
            .filter(|n| !covered.contains(n.id.as_str()))
            .map(|n| (n.id.clone(), n.label.clone()))
            .collect()
    }
}

/// Snapshot metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub filename: String,
    pub version: u32,
    pub node_count: usize,
    pub edge_count: usize,
}

/// Directory-backed snapshot storage.
#[derive(Debug)]
pub struct SnapshotStorage {
    storage_dir: PathBuf,
    /// Version of the last save seen (0 if nothing was saved yet)
    version: u32,
}

impl SnapshotStorage {
    /// Create storage in the given directory without touching disk.
    pub fn new<P: AsRef<Path>>(storage_dir: P) -> Self {
        Self {
            storage_dir: storage_dir.as_ref().to_path_buf(),
            version: 0,
        }
    }

    /// Create the directory layout if needed and pick up the saved version.
    pub fn init<P: AsRef<Path>>(storage_dir: P) -> Result<Self> {
        let storage_dir = storage_dir.as_ref();

        fs::create_dir_all(storage_dir)
            .with_context(|| format!("Failed to create storage directory: {:?}", storage_dir))?;

        let snapshot_dir = storage_dir.join(SNAPSHOT_DIR);
        fs::create_dir_all(&snapshot_dir)
            .with_context(|| format!("Failed to create snapshot directory: {:?}", snapshot_dir))?;

        let mut storage = Self::new(storage_dir);
        if let Some(snapshot) = storage.load()? {
            storage.version = snapshot.version;
        }
        Ok(storage)
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Version of the most recent save.
    pub fn version(&self) -> u32 {
        self.version
    }

    fn graph_path(&self) -> PathBuf {
        self.storage_dir.join(GRAPH_FILE)
    }

    /// Read the current snapshot, if one has been saved.
    pub fn load(&self) -> Result<Option<StoreSnapshot>> {
        let graph_path = self.graph_path();
        if !graph_path.exists() {
            debug!("No snapshot at {:?}", graph_path);
            return Ok(None);
        }

        info!("Loading snapshot from: {:?}", graph_path);
        read_snapshot(&graph_path).map(Some)
    }

    /// Write `snapshot` as the current state, bumping the version.
    ///
    /// Returns the version assigned to the save.
    pub fn save(&mut self, snapshot: &mut StoreSnapshot) -> Result<u32> {
        fs::create_dir_all(self.storage_dir.join(SNAPSHOT_DIR))
            .with_context(|| format!("Failed to create storage directory: {:?}", self.storage_dir))?;

        snapshot.version = self.version + 1;
        let json = serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot")?;

        let graph_path = self.graph_path();
        let tmp_path = self.storage_dir.join(format!("{}.tmp", GRAPH_FILE));
        fs::write(&tmp_path, &json)
            .with_context(|| format!("Failed to write temp snapshot: {:?}", tmp_path))?;
        fs::rename(&tmp_path, &graph_path)
            .with_context(|| format!("Failed to replace snapshot: {:?}", graph_path))?;

        self.version = snapshot.version;
        self.create_snapshot(&json)?;

        info!(
            version = self.version,
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            "Saved snapshot"
        );
        Ok(self.version)
    }

    /// Copy the serialized state into `snapshots/` and prune old copies.
    fn create_snapshot(&self, json: &str) -> Result<()> {
        let snapshot_path = self
            .storage_dir
            .join(SNAPSHOT_DIR)
            .join(snapshot_filename(self.version));

        fs::write(&snapshot_path, json)
            .with_context(|| format!("Failed to write snapshot: {:?}", snapshot_path))?;

        self.prune_snapshots()?;
        debug!("Created snapshot v{}", self.version);
        Ok(())
    }

    /// Keep only the newest MAX_SNAPSHOTS copies.
    fn prune_snapshots(&self) -> Result<()> {
        let mut versions = self.snapshot_versions()?;
        if versions.len() <= MAX_SNAPSHOTS {
            return Ok(());
        }

        versions.sort_unstable_by(|a, b| b.cmp(a));
        for version in versions.drain(MAX_SNAPSHOTS..) {
            let path = self
                .storage_dir
                .join(SNAPSHOT_DIR)
                .join(snapshot_filename(version));
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete snapshot: {:?}", path))?;
            debug!("Deleted old snapshot: {:?}", path);
        }
        Ok(())
    }

    fn snapshot_versions(&self) -> Result<Vec<u32>> {
        let snapshot_dir = self.storage_dir.join(SNAPSHOT_DIR);
        if !snapshot_dir.exists() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in fs::read_dir(&snapshot_dir).context("Failed to read snapshot directory")? {
            let entry = entry?;
            let name = entry.file_name();
            match parse_snapshot_filename(&name.to_string_lossy()) {
                Some(version) => versions.push(version),
                None => debug!("Ignoring unrelated file in snapshot dir: {:?}", name),
            }
        }
        Ok(versions)
    }

    /// List all available snapshots, newest first.
    pub fn list_snapshots(&self) -> Result<Vec<SnapshotMetadata>> {
        let mut versions = self.snapshot_versions()?;
        versions.sort_unstable_by(|a, b| b.cmp(a));

        let mut snapshots = Vec::with_capacity(versions.len());
        for version in versions {
            let filename = snapshot_filename(version);
            let path = self.storage_dir.join(SNAPSHOT_DIR).join(&filename);
            match read_snapshot(&path) {
                Ok(snapshot) => snapshots.push(SnapshotMetadata {
                    filename,
                    version,
                    node_count: snapshot.nodes.len(),
                    edge_count: snapshot.edges.len(),
                }),
                Err(e) => warn!("Skipping unreadable snapshot {:?}: {:#}", path, e),
            }
        }
        Ok(snapshots)
    }

    /// Read a previously saved version from `snapshots/`.
    pub fn load_snapshot(&self, version: u32) -> Result<StoreSnapshot> {
        let path = self
            .storage_dir
            .join(SNAPSHOT_DIR)
            .join(snapshot_filename(version));
        if !path.exists() {
            return Err(anyhow!("Snapshot v{} not found", version));
        }
        read_snapshot(&path)
    }

    /// Make a saved version the current state again.
    ///
    /// The restored state is saved under a new version, so later versions
    /// stay available. Returns that new version.
    pub fn rollback(&mut self, version: u32) -> Result<u32> {
        let mut snapshot = self.load_snapshot(version)?;
        let saved = self.save(&mut snapshot)?;
        info!("Rolled back to v{} as v{}", version, saved);
        Ok(saved)
    }
}

fn read_snapshot(path: &Path) -> Result<StoreSnapshot> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read snapshot: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse snapshot: {:?}", path))
}

fn snapshot_filename(version: u32) -> String {
    format!("v{:06}.json", version)
}

fn parse_snapshot_filename(name: &str) -> Option<u32> {
    name.strip_prefix('v')?.strip_suffix(".json")?.parse().ok()
}
