//! hybrid-rag library
//!
//! Hybrid retrieval over a combined vector + graph store.
//!
//! # Modules
//!
//! - `core`: node/edge store, data model, snapshots (JSON and SQLite)
//! - `search`: embeddings, similarity search, traversal, hybrid fusion
//! - `ingest`: document units, relation inference, ingestion pipeline
//! - `config`: engine configuration (YAML)

pub mod config;
pub mod core;
pub mod error;
pub mod ingest;
pub mod search;

// Re-exports for convenience
pub use config::{Direction, EngineConfig, GraphScoring};
pub use core::paths::DataPaths;
pub use core::{
    metadata, Edge, GraphStore, JsonSnapshot, Metadata, MetadataValue, Node, Snapshot,
    SqliteSnapshot,
};
pub use error::{RagError, Result};
pub use ingest::{Document, DocumentFormat, IngestReport, Ingestor};
pub use search::{
    EmbeddingProvider, HtpEmbedder, HybridParams, Retrieval, RetrievalEngine, SearchMode,
};
