//! CLI commands over a data directory
//!
//! Every command loads the store from its snapshot, does its work and, if it
//! changed anything, saves the snapshot back.

pub mod demo;
pub mod edge;
pub mod hybrid;
pub mod ingest;
pub mod search;
pub mod status;
pub mod traverse;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use colored::{ColoredString, Colorize};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use hybrid_rag::core::paths::DataPaths;
use hybrid_rag::{
    EmbeddingProvider, EngineConfig, GraphStore, HtpEmbedder, JsonSnapshot, Retrieval, Snapshot,
    SqliteSnapshot,
};

/// Display width of node text in listings.
const TEXT_WIDTH: usize = 96;

/// Options shared by every subcommand.
pub struct Context {
    pub paths: DataPaths,
    pub config: EngineConfig,
    pub sqlite: bool,
    pub json: bool,
}

impl Context {
    pub fn new(data_dir: PathBuf, sqlite: bool, json: bool) -> Result<Self> {
        let paths = DataPaths::from_root(data_dir);
        let config = EngineConfig::load(&paths.config)
            .with_context(|| format!("Failed to load {}", paths.config.display()))?;
        Ok(Self {
            paths,
            config,
            sqlite,
            json,
        })
    }

    fn snapshot(&self) -> Box<dyn Snapshot> {
        if self.sqlite {
            Box::new(SqliteSnapshot::new(self.paths.sqlite.clone()))
        } else {
            Box::new(JsonSnapshot::new(
                self.paths.vectors.clone(),
                self.paths.graph.clone(),
            ))
        }
    }

    pub fn load_store(&self) -> Result<Arc<GraphStore>> {
        let store = self
            .snapshot()
            .load(self.config.dimension)
            .with_context(|| format!("Failed to load snapshot from {}", self.paths.root.display()))?;
        Ok(Arc::new(store))
    }

    pub fn save_store(&self, store: &GraphStore) -> Result<()> {
        std::fs::create_dir_all(&self.paths.root)
            .with_context(|| format!("Failed to create {}", self.paths.root.display()))?;
        self.snapshot()
            .save(store)
            .with_context(|| format!("Failed to save snapshot to {}", self.paths.root.display()))
    }

    /// Built-in embedder sized to the store when it already has a dimension.
    pub fn provider(&self, store: &GraphStore) -> Result<Arc<dyn EmbeddingProvider>> {
        let dim = store
            .dimension()
            .or(self.config.dimension)
            .unwrap_or(self.config.embedding_dim);
        let embedder = HtpEmbedder::new(dim)
            .with_context(|| format!("Cannot build the built-in embedder for dimension {}", dim))?;
        Ok(Arc::new(embedder))
    }
}

/// Cut `text` to at most `width` display columns, marking the cut with "…".
pub fn truncate(text: &str, width: usize) -> String {
    let text = text.replace('\n', " ");
    if UnicodeWidthStr::width(text.as_str()) <= width {
        return text;
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

fn score_colored(score: f32) -> ColoredString {
    let s = format!("{:.3}", score);
    if score > 0.8 {
        s.green()
    } else if score > 0.5 {
        s.yellow()
    } else {
        s.dimmed()
    }
}

/// JSON shape of a retrieval (embeddings omitted).
pub fn retrieval_json(retrieval: &Retrieval) -> serde_json::Value {
    let hits: Vec<_> = retrieval
        .hits
        .iter()
        .map(|h| {
            serde_json::json!({
                "id": h.node.id,
                "text": h.node.text,
                "score": h.score,
                "vector_score": h.vector_score,
                "graph_score": h.graph_score,
                "rerank_score": h.rerank_score,
                "depth": h.depth,
                "metadata": h.node.metadata,
            })
        })
        .collect();
    serde_json::json!({
        "mode": retrieval.mode,
        "query": retrieval.query,
        "results": hits,
        "relationships": retrieval.relationships,
        "total_candidates": retrieval.total_candidates,
        "confidence": retrieval.confidence,
        "latency_ms": retrieval.latency_ms,
    })
}

pub fn print_retrieval(retrieval: &Retrieval, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&retrieval_json(retrieval))?);
        return Ok(());
    }

    if retrieval.hits.is_empty() {
        println!(
            "{} No results found for: {}",
            "→".dimmed(),
            retrieval.query.cyan()
        );
        return Ok(());
    }

    println!(
        "{} {} {} results for: {} {}",
        "→".dimmed(),
        retrieval.hits.len(),
        retrieval.mode.to_string().bold(),
        retrieval.query.cyan(),
        format!("({:.1} ms)", retrieval.latency_ms).dimmed()
    );
    println!();

    for (i, hit) in retrieval.hits.iter().enumerate() {
        let mut parts = Vec::new();
        if let Some(v) = hit.vector_score {
            parts.push(format!("vec {:.3}", v));
        }
        if let Some(g) = hit.graph_score {
            parts.push(format!("graph {:.3}", g));
        }
        if let Some(d) = hit.depth {
            parts.push(format!("depth {}", d));
        }
        if let Some(r) = hit.rerank_score {
            parts.push(format!("rerank {:.3}", r));
        }

        println!(
            "{}. [{}] {} {}",
            (i + 1).to_string().bold(),
            score_colored(hit.score),
            hit.node.id.cyan(),
            parts.join(" | ").dimmed()
        );
        println!("   {}", truncate(&hit.node.text, TEXT_WIDTH));
    }

    if !retrieval.relationships.is_empty() {
        println!();
        println!("{}", "Relationships".bold());
        for edge in &retrieval.relationships {
            println!(
                "  {} -[{}]-> {}",
                edge.source_id,
                edge.relationship_type.yellow(),
                edge.target_id
            );
        }
    }

    println!();
    println!(
        "{} confidence {:.3}, {} candidates",
        "→".dimmed(),
        retrieval.confidence,
        retrieval.total_candidates
    );
    Ok(())
}
