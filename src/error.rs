//! Error types for store, retrieval and ingestion operations.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    /// Embedding length differs from the store's established dimensionality.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Edge endpoint references a node that does not exist.
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Negative edge weight or hybrid weight outside [0, 1].
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),

    #[error("Embedding provider failed: {0}")]
    EmbeddingProviderFailure(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Persisted state is internally inconsistent.
    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
