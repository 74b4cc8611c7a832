//! JSON snapshot in the two-file layout
//!
//! `hybrid_vectors.json`: `{"nodes": {id: {text, embedding, metadata, created_at}}}`
//! `hybrid_graph.json`:   `{"edges": [{id, source, target, type, weight, metadata, created_at}]}`
//!
//! Node key order in the file is insertion order.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use super::model::{Edge, Metadata, Node};
use super::store::GraphStore;
use crate::error::{RagError, Result};

/// Persistence backend for a [`GraphStore`].
pub trait Snapshot {
    /// Whether anything has been saved yet.
    fn exists(&self) -> bool;

    /// Rebuild a store. A missing snapshot yields an empty store.
    fn load(&self, dimension: Option<usize>) -> Result<GraphStore>;

    fn save(&self, store: &GraphStore) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeRecord {
    text: String,
    embedding: Vec<f32>,
    #[serde(default)]
    metadata: Metadata,
    #[serde(deserialize_with = "super::model::deserialize_timestamp")]
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EdgesFile {
    edges: Vec<Edge>,
}

pub struct JsonSnapshot {
    vectors_path: PathBuf,
    graph_path: PathBuf,
}

impl JsonSnapshot {
    pub fn new(vectors_path: impl Into<PathBuf>, graph_path: impl Into<PathBuf>) -> Self {
        Self {
            vectors_path: vectors_path.into(),
            graph_path: graph_path.into(),
        }
    }

    /// Snapshot using the default file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        let paths = super::paths::DataPaths::from_root(dir.to_path_buf());
        Self::new(paths.vectors, paths.graph)
    }

    fn read_nodes(&self) -> Result<Vec<Node>> {
        if !self.vectors_path.exists() {
            return Ok(Vec::new());
        }
        let mut root: Map<String, Value> =
            serde_json::from_str(&fs::read_to_string(&self.vectors_path)?)?;
        let nodes = match root.remove("nodes") {
            Some(Value::Object(nodes)) => nodes,
            Some(_) => {
                return Err(RagError::CorruptSnapshot(
                    "\"nodes\" must be an object keyed by id".into(),
                ))
            }
            None => Map::new(),
        };

        nodes
            .into_iter()
            .map(|(id, value)| -> Result<Node> {
                let record: NodeRecord = serde_json::from_value(value)?;
                Ok(Node {
                    id,
                    text: record.text,
                    embedding: record.embedding,
                    metadata: record.metadata,
                    created_at: record.created_at,
                })
            })
            .collect()
    }

    fn read_edges(&self) -> Result<Vec<Edge>> {
        if !self.graph_path.exists() {
            return Ok(Vec::new());
        }
        let file: EdgesFile = serde_json::from_str(&fs::read_to_string(&self.graph_path)?)?;
        Ok(file.edges)
    }
}

impl Snapshot for JsonSnapshot {
    fn exists(&self) -> bool {
        self.vectors_path.exists()
    }

    fn load(&self, dimension: Option<usize>) -> Result<GraphStore> {
        let nodes = self.read_nodes()?;
        let edges = self.read_edges()?;
        info!(
            nodes = nodes.len(),
            edges = edges.len(),
            path = %self.vectors_path.display(),
            "loaded JSON snapshot"
        );
        GraphStore::from_parts(nodes, edges, dimension)
    }

    fn save(&self, store: &GraphStore) -> Result<()> {
        let view = store.read();

        let mut nodes = Map::new();
        for node in view.nodes() {
            let record = NodeRecord {
                text: node.text.clone(),
                embedding: node.embedding.clone(),
                metadata: node.metadata.clone(),
                created_at: node.created_at,
            };
            nodes.insert(node.id.clone(), serde_json::to_value(record)?);
        }
        let mut root = Map::new();
        root.insert("nodes".into(), Value::Object(nodes));

        let edges = EdgesFile {
            edges: view.edges().iter().map(|e| (**e).clone()).collect(),
        };

        write_atomic(&self.vectors_path, &serde_json::to_vec(&root)?)?;
        write_atomic(&self.graph_path, &serde_json::to_vec_pretty(&edges)?)?;
        info!(
            nodes = view.len(),
            edges = view.edges().len(),
            path = %self.vectors_path.display(),
            "saved JSON snapshot"
        );
        Ok(())
    }
}

/// Write through a sibling temp file so readers never see a truncated file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
