//! Engine configuration
//!
//! Every field has a default, so a partial (or missing) `config.yaml`
//! is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{RagError, Result};

/// How the graph signal is scored during hybrid fusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GraphScoring {
    /// Keyword-seeded BFS: seeds score by token overlap, others `1/(1+depth)`.
    #[default]
    Depth,
    /// Keyword-matched nodes score `min(match_ratio + 0.1 * degree, 1)`; others 0.
    Degree,
}

/// Which edges the traversal may follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// source → target only
    #[default]
    Directed,
    /// both source → target and target → source
    Undirected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed embedding dimension for the store. `None` lets the first insert decide.
    pub dimension: Option<usize>,
    /// Output dimension of the built-in embedder.
    pub embedding_dim: usize,
    /// Ingestion units shorter than this (in characters) are discarded.
    pub min_unit_len: usize,
    /// Longer units are split into overlapping word chunks (0 = never split).
    pub max_unit_len: usize,
    /// Traversal depth used by hybrid fusion and global search.
    pub hybrid_depth: usize,
    pub graph_scoring: GraphScoring,
    pub direction: Direction,
    pub vector_weight: f32,
    pub graph_weight: f32,
    pub default_top_k: usize,
    /// Maximum embedding requests in flight during ingestion.
    pub ingest_concurrency: usize,
    /// Create edges from relation patterns found in ingested text.
    pub infer_relations: bool,
    /// Apply the token-overlap rerank pass to hybrid results.
    pub rerank: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dimension: None,
            embedding_dim: crate::search::embedding::EMBEDDING_DIM,
            min_unit_len: 10,
            max_unit_len: 512,
            hybrid_depth: 2,
            graph_scoring: GraphScoring::Depth,
            direction: Direction::Directed,
            vector_weight: 0.6,
            graph_weight: 0.4,
            default_top_k: 5,
            ingest_concurrency: 8,
            infer_relations: true,
            rerank: false,
        }
    }
}

impl EngineConfig {
    /// Load from a YAML file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.embedding_dim == 0 || self.embedding_dim % 2 != 0 {
            return Err(RagError::InvalidConfig(format!(
                "embedding_dim must be a positive even number, got {}",
                self.embedding_dim
            )));
        }
        if self.dimension == Some(0) {
            return Err(RagError::InvalidConfig("dimension must be positive".into()));
        }
        if self.ingest_concurrency == 0 {
            return Err(RagError::InvalidConfig(
                "ingest_concurrency must be at least 1".into(),
            ));
        }
        if self.default_top_k == 0 {
            return Err(RagError::InvalidConfig("default_top_k must be at least 1".into()));
        }
        crate::search::hybrid::check_weights(self.vector_weight, self.graph_weight)
    }
}
