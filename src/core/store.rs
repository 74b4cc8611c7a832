//! In-memory node/edge store
//!
//! Append-only collections behind a single `RwLock`. Inserts take the write
//! lock for id assignment and append; queries hold a read view for the
//! duration of their scan, so they see the store as of the call.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{RwLock, RwLockReadGuard};
use tracing::debug;

use super::model::{Edge, Metadata, Node};
use crate::error::{RagError, Result};

const NODE_PREFIX: &str = "node-";
const EDGE_PREFIX: &str = "edge-";

#[derive(Debug, Default)]
struct StoreInner {
    nodes: Vec<Arc<Node>>,
    node_index: HashMap<String, usize>,
    edges: Vec<Arc<Edge>>,
    edge_index: HashMap<String, usize>,
    outgoing: HashMap<String, Vec<usize>>,
    incoming: HashMap<String, Vec<usize>>,
    dimension: Option<usize>,
    next_node: u64,
    next_edge: u64,
}

/// Store statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub dimension: Option<usize>,
}

#[derive(Debug, Default)]
pub struct GraphStore {
    inner: RwLock<StoreInner>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose dimensionality is fixed up front rather than by the first insert.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                dimension: Some(dimension),
                ..Default::default()
            }),
        }
    }

    /// Rebuild a store from persisted nodes and edges, in order.
    ///
    /// Fails on duplicate ids, inconsistent dimensions or dangling edges.
    pub fn from_parts(
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        dimension: Option<usize>,
    ) -> Result<Self> {
        let mut inner = StoreInner {
            dimension,
            ..Default::default()
        };

        for node in nodes {
            inner.check_dimension(node.embedding.len())?;
            if inner.node_index.contains_key(&node.id) {
                return Err(RagError::CorruptSnapshot(format!(
                    "duplicate node id {}",
                    node.id
                )));
            }
            inner.next_node = inner.next_node.max(next_after(&node.id, NODE_PREFIX));
            inner.push_node(node);
        }
        inner.next_node = inner.next_node.max(inner.nodes.len() as u64);

        for edge in edges {
            for endpoint in [&edge.source_id, &edge.target_id] {
                if !inner.node_index.contains_key(endpoint) {
                    return Err(RagError::CorruptSnapshot(format!(
                        "edge {} references missing node {}",
                        edge.id, endpoint
                    )));
                }
            }
            if inner.edge_index.contains_key(&edge.id) {
                return Err(RagError::CorruptSnapshot(format!(
                    "duplicate edge id {}",
                    edge.id
                )));
            }
            inner.next_edge = inner.next_edge.max(next_after(&edge.id, EDGE_PREFIX));
            inner.push_edge(edge);
        }
        inner.next_edge = inner.next_edge.max(inner.edges.len() as u64);

        Ok(Self {
            inner: RwLock::new(inner),
        })
    }

    /// Insert a node; the first insert fixes the store's dimensionality.
    pub fn insert_node(
        &self,
        text: impl Into<String>,
        embedding: Vec<f32>,
        metadata: Metadata,
    ) -> Result<Arc<Node>> {
        let mut inner = self.inner.write();
        inner.check_dimension(embedding.len())?;

        let id = format!("{}{}", NODE_PREFIX, inner.next_node);
        inner.next_node += 1;

        let node = Node {
            id,
            text: text.into(),
            embedding,
            metadata,
            created_at: Utc::now(),
        };
        debug!(id = %node.id, "inserted node");
        Ok(inner.push_node(node))
    }

    /// Insert a directed edge between two existing nodes.
    pub fn insert_edge(
        &self,
        source_id: &str,
        target_id: &str,
        relationship_type: impl Into<String>,
        weight: f32,
        metadata: Metadata,
    ) -> Result<Arc<Edge>> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(RagError::InvalidWeight(format!(
                "edge weight must be a non-negative number, got {}",
                weight
            )));
        }

        let mut inner = self.inner.write();
        for endpoint in [source_id, target_id] {
            if !inner.node_index.contains_key(endpoint) {
                return Err(RagError::UnknownNode(endpoint.to_string()));
            }
        }

        let id = format!("{}{}", EDGE_PREFIX, inner.next_edge);
        inner.next_edge += 1;

        let edge = Edge {
            id,
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            relationship_type: relationship_type.into(),
            weight,
            metadata,
            created_at: Utc::now(),
        };
        debug!(id = %edge.id, source = source_id, target = target_id, "inserted edge");
        Ok(inner.push_edge(edge))
    }

    pub fn get_node(&self, id: &str) -> Result<Arc<Node>> {
        self.read()
            .node(id)
            .cloned()
            .ok_or_else(|| RagError::NotFound(id.to_string()))
    }

    pub fn get_edge(&self, id: &str) -> Result<Arc<Edge>> {
        let inner = self.inner.read();
        inner
            .edge_index
            .get(id)
            .map(|&i| Arc::clone(&inner.edges[i]))
            .ok_or_else(|| RagError::NotFound(id.to_string()))
    }

    /// All nodes in insertion order
    pub fn list_nodes(&self) -> Vec<Arc<Node>> {
        self.inner.read().nodes.clone()
    }

    /// All edges in insertion order
    pub fn list_edges(&self) -> Vec<Arc<Edge>> {
        self.inner.read().edges.clone()
    }

    /// Outgoing edges of `node_id`.
    pub fn neighbors(&self, node_id: &str) -> Vec<Arc<Edge>> {
        self.read().outgoing(node_id).cloned().collect()
    }

    /// Incoming edges of `node_id`.
    pub fn incoming(&self, node_id: &str) -> Vec<Arc<Edge>> {
        self.read().incoming(node_id).cloned().collect()
    }

    pub fn degree(&self, node_id: &str) -> usize {
        self.read().degree(node_id)
    }

    pub fn dimension(&self) -> Option<usize> {
        self.inner.read().dimension
    }

    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.read();
        StoreStats {
            node_count: inner.nodes.len(),
            edge_count: inner.edges.len(),
            dimension: inner.dimension,
        }
    }

    /// Read view held for the duration of a query.
    pub fn read(&self) -> StoreView<'_> {
        StoreView {
            inner: self.inner.read(),
        }
    }
}

impl StoreInner {
    fn check_dimension(&mut self, actual: usize) -> Result<()> {
        match self.dimension {
            Some(expected) if expected != actual => {
                Err(RagError::DimensionMismatch { expected, actual })
            }
            Some(_) => Ok(()),
            None => {
                self.dimension = Some(actual);
                Ok(())
            }
        }
    }

    fn push_node(&mut self, node: Node) -> Arc<Node> {
        let node = Arc::new(node);
        self.node_index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(Arc::clone(&node));
        node
    }

    fn push_edge(&mut self, edge: Edge) -> Arc<Edge> {
        let edge = Arc::new(edge);
        let position = self.edges.len();
        self.edge_index.insert(edge.id.clone(), position);
        self.outgoing
            .entry(edge.source_id.clone())
            .or_default()
            .push(position);
        self.incoming
            .entry(edge.target_id.clone())
            .or_default()
            .push(position);
        self.edges.push(Arc::clone(&edge));
        edge
    }
}

/// Read-locked view of a [`GraphStore`].
pub struct StoreView<'a> {
    inner: RwLockReadGuard<'a, StoreInner>,
}

impl<'a> StoreView<'a> {
    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.inner.nodes
    }

    pub fn edges(&self) -> &[Arc<Edge>] {
        &self.inner.edges
    }

    pub fn node(&self, id: &str) -> Option<&Arc<Node>> {
        self.position(id).map(|i| &self.inner.nodes[i])
    }

    /// Insertion position of a node, used for deterministic tie-breaking.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.inner.node_index.get(id).copied()
    }

    pub fn outgoing<'s>(&'s self, id: &str) -> impl Iterator<Item = &'s Arc<Edge>> + 's {
        self.edges_at(self.inner.outgoing.get(id))
    }

    pub fn incoming<'s>(&'s self, id: &str) -> impl Iterator<Item = &'s Arc<Edge>> + 's {
        self.edges_at(self.inner.incoming.get(id))
    }

    /// Edges touching the node in either direction.
    pub fn degree(&self, id: &str) -> usize {
        let count = |m: &HashMap<String, Vec<usize>>| m.get(id).map_or(0, Vec::len);
        count(&self.inner.outgoing) + count(&self.inner.incoming)
    }

    pub fn dimension(&self) -> Option<usize> {
        self.inner.dimension
    }

    pub fn len(&self) -> usize {
        self.inner.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.nodes.is_empty()
    }

    fn edges_at<'s>(
        &'s self,
        positions: Option<&'s Vec<usize>>,
    ) -> impl Iterator<Item = &'s Arc<Edge>> + 's {
        positions
            .into_iter()
            .flatten()
            .map(move |&i| &self.inner.edges[i])
    }
}

/// Counter value following a generated id such as `node-7`.
fn next_after(id: &str, prefix: &str) -> u64 {
    id.strip_prefix(prefix)
        .and_then(|n| n.parse::<u64>().ok())
        .map_or(0, |n| n + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::metadata;

    fn store_with_nodes(n: usize) -> GraphStore {
        let store = GraphStore::new();
        for i in 0..n {
            store
                .insert_node(format!("text {}", i), vec![i as f32, 1.0], Metadata::new())
                .unwrap();
        }
        store
    }

    #[test]
    fn test_first_insert_fixes_dimension() {
        let store = GraphStore::new();
        store.insert_node("a", vec![1.0, 0.0, 0.0], Metadata::new()).unwrap();
        assert_eq!(store.dimension(), Some(3));

        let err = store.insert_node("b", vec![1.0, 0.0], Metadata::new()).unwrap_err();
        assert!(matches!(
            err,
            RagError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_configured_dimension_applies_to_first_insert() {
        let store = GraphStore::with_dimension(4);
        assert!(store.insert_node("a", vec![1.0; 3], Metadata::new()).is_err());
        assert!(store.insert_node("a", vec![1.0; 4], Metadata::new()).is_ok());
    }

    #[test]
    fn test_ids_are_sequential_and_never_deduplicated() {
        let store = GraphStore::new();
        let a = store.insert_node("same text", vec![1.0], Metadata::new()).unwrap();
        let b = store.insert_node("same text", vec![1.0], Metadata::new()).unwrap();
        assert_eq!(a.id, "node-0");
        assert_eq!(b.id, "node-1");
        assert_ne!(a.id, b.id);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_insert_edge_unknown_target_creates_nothing() {
        let store = store_with_nodes(1);
        let err = store
            .insert_edge("node-0", "node-9", "FOUNDED", 1.0, Metadata::new())
            .unwrap_err();
        assert!(matches!(err, RagError::UnknownNode(ref id) if id == "node-9"));
        assert!(store.list_edges().is_empty());

        // the failed insert must not consume an id
        let edge = store
            .insert_edge("node-0", "node-0", "SELF", 1.0, Metadata::new())
            .unwrap();
        assert_eq!(edge.id, "edge-0");
    }

    #[test]
    fn test_negative_weight_rejected() {
        let store = store_with_nodes(2);
        let err = store
            .insert_edge("node-0", "node-1", "X", -0.1, Metadata::new())
            .unwrap_err();
        assert!(matches!(err, RagError::InvalidWeight(_)));
        assert!(store
            .insert_edge("node-0", "node-1", "X", f32::NAN, Metadata::new())
            .is_err());
        assert!(store.list_edges().is_empty());
    }

    #[test]
    fn test_neighbors_incoming_and_degree() {
        let store = store_with_nodes(3);
        store.insert_edge("node-0", "node-1", "A", 1.0, Metadata::new()).unwrap();
        store.insert_edge("node-0", "node-2", "B", 0.5, Metadata::new()).unwrap();
        store.insert_edge("node-2", "node-0", "C", 1.0, Metadata::new()).unwrap();

        let out: Vec<_> = store
            .neighbors("node-0")
            .iter()
            .map(|e| e.target_id.clone())
            .collect();
        assert_eq!(out, vec!["node-1", "node-2"]);
        assert_eq!(store.incoming("node-0").len(), 1);
        assert_eq!(store.degree("node-0"), 3);
        assert!(store.neighbors("node-1").is_empty());
    }

    #[test]
    fn test_get_node_not_found() {
        let store = store_with_nodes(1);
        assert!(store.get_node("node-0").is_ok());
        assert!(matches!(
            store.get_node("node-5"),
            Err(RagError::NotFound(_))
        ));
        assert!(matches!(store.get_edge("edge-0"), Err(RagError::NotFound(_))));
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let store = store_with_nodes(12);
        let ids: Vec<_> = store.list_nodes().iter().map(|n| n.id.clone()).collect();
        assert_eq!(ids[10], "node-10");
        assert_eq!(ids[2], "node-2");
    }

    #[test]
    fn test_from_parts_restores_counters() -> Result<()> {
        let source = store_with_nodes(3);
        source.insert_edge("node-0", "node-2", "A", 1.0, metadata([("k", "v")]))?;

        let nodes = source.list_nodes().iter().map(|n| (**n).clone()).collect();
        let edges = source.list_edges().iter().map(|e| (**e).clone()).collect();
        let restored = GraphStore::from_parts(nodes, edges, None)?;

        assert_eq!(restored.stats(), source.stats());
        let next = restored.insert_node("new", vec![0.0, 1.0], Metadata::new())?;
        assert_eq!(next.id, "node-3");
        let edge = restored.insert_edge("node-3", "node-0", "B", 1.0, Metadata::new())?;
        assert_eq!(edge.id, "edge-1");
        Ok(())
    }

    #[test]
    fn test_from_parts_rejects_dangling_edge() {
        let source = store_with_nodes(2);
        source
            .insert_edge("node-0", "node-1", "A", 1.0, Metadata::new())
            .unwrap();
        let nodes = vec![(*source.list_nodes()[0]).clone()];
        let edges = source.list_edges().iter().map(|e| (**e).clone()).collect();
        assert!(matches!(
            GraphStore::from_parts(nodes, edges, None),
            Err(RagError::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn test_concurrent_inserts_produce_unique_ids() {
        let store = Arc::new(GraphStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    (0..25)
                        .map(|i| {
                            store
                                .insert_node(format!("{}-{}", t, i), vec![1.0, 0.0], Metadata::new())
                                .unwrap()
                                .id
                                .clone()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 200);
        assert_eq!(store.len(), 200);
    }
}
