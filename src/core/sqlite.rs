//! SQLite snapshot backend
//!
//! Stores embeddings as little-endian f32 BLOBs. A `seq` column keeps
//! insertion order across save/load.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use tracing::info;

use super::model::{Edge, Metadata, Node};
use super::snapshot::Snapshot;
use super::store::GraphStore;
use crate::error::{RagError, Result};

pub struct SqliteSnapshot {
    db_path: PathBuf,
}

impl SqliteSnapshot {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    fn open(&self) -> Result<Connection> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.db_path)?;
        init_schema(&conn)?;
        Ok(conn)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS nodes (
            seq INTEGER PRIMARY KEY,
            id TEXT NOT NULL UNIQUE,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            metadata TEXT NOT NULL,  -- JSON object
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS edges (
            seq INTEGER PRIMARY KEY,
            id TEXT NOT NULL UNIQUE,
            source TEXT NOT NULL,
            target TEXT NOT NULL,
            type TEXT NOT NULL,
            weight REAL NOT NULL,
            metadata TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source);
        "#,
    )?;
    Ok(())
}

/// Raw row values, decoded outside the rusqlite row closure.
struct NodeRow {
    id: String,
    text: String,
    embedding: Vec<u8>,
    metadata: String,
    created_at: String,
}

struct EdgeRow {
    id: String,
    source: String,
    target: String,
    relationship_type: String,
    weight: f64,
    metadata: String,
    created_at: String,
}

impl Snapshot for SqliteSnapshot {
    fn exists(&self) -> bool {
        self.db_path.exists()
    }

    fn load(&self, dimension: Option<usize>) -> Result<GraphStore> {
        if !self.exists() {
            return Ok(match dimension {
                Some(dim) => GraphStore::with_dimension(dim),
                None => GraphStore::new(),
            });
        }
        let conn = self.open()?;

        let mut stmt = conn.prepare(
            "SELECT id, text, embedding, metadata, created_at FROM nodes ORDER BY seq",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(NodeRow {
                id: row.get(0)?,
                text: row.get(1)?,
                embedding: row.get(2)?,
                metadata: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;

        let mut nodes = Vec::new();
        for row in rows {
            let row = row?;
            nodes.push(Node {
                embedding: blob_to_embedding(&row.embedding)?,
                metadata: serde_json::from_str::<Metadata>(&row.metadata)?,
                created_at: parse_timestamp(&row.created_at)?,
                id: row.id,
                text: row.text,
            });
        }

        let mut stmt = conn.prepare(
            "SELECT id, source, target, type, weight, metadata, created_at FROM edges ORDER BY seq",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(EdgeRow {
                id: row.get(0)?,
                source: row.get(1)?,
                target: row.get(2)?,
                relationship_type: row.get(3)?,
                weight: row.get(4)?,
                metadata: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;

        let mut edges = Vec::new();
        for row in rows {
            let row = row?;
            edges.push(Edge {
                metadata: serde_json::from_str::<Metadata>(&row.metadata)?,
                created_at: parse_timestamp(&row.created_at)?,
                id: row.id,
                source_id: row.source,
                target_id: row.target,
                relationship_type: row.relationship_type,
                weight: row.weight as f32,
            });
        }

        info!(
            nodes = nodes.len(),
            edges = edges.len(),
            path = %self.db_path.display(),
            "loaded SQLite snapshot"
        );
        GraphStore::from_parts(nodes, edges, dimension)
    }

    /// Replace the database contents with the store, in one transaction.
    fn save(&self, store: &GraphStore) -> Result<()> {
        let mut conn = self.open()?;
        let view = store.read();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM edges", [])?;
        tx.execute("DELETE FROM nodes", [])?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO nodes (seq, id, text, embedding, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (seq, node) in view.nodes().iter().enumerate() {
                insert.execute(params![
                    seq as i64,
                    node.id,
                    node.text,
                    embedding_to_blob(&node.embedding),
                    serde_json::to_string(&node.metadata)?,
                    node.created_at.to_rfc3339(),
                ])?;
            }

            let mut insert = tx.prepare(
                "INSERT INTO edges (seq, id, source, target, type, weight, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for (seq, edge) in view.edges().iter().enumerate() {
                insert.execute(params![
                    seq as i64,
                    edge.id,
                    edge.source_id,
                    edge.target_id,
                    edge.relationship_type,
                    edge.weight as f64,
                    serde_json::to_string(&edge.metadata)?,
                    edge.created_at.to_rfc3339(),
                ])?;
            }
        }

        tx.commit()?;
        info!(
            nodes = view.len(),
            edges = view.edges().len(),
            path = %self.db_path.display(),
            "saved SQLite snapshot"
        );
        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    super::model::parse_timestamp(raw)
        .ok_or_else(|| RagError::CorruptSnapshot(format!("bad timestamp {:?}", raw)))
}

/// Convert f32 embedding to BLOB
fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(embedding.len() * 4);
    for &val in embedding {
        blob.extend_from_slice(&val.to_le_bytes());
    }
    blob
}

/// Convert BLOB to f32 embedding
fn blob_to_embedding(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return Err(RagError::CorruptSnapshot(format!(
            "embedding blob of {} bytes is not a whole number of f32s",
            blob.len()
        )));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
