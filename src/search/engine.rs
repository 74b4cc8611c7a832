//! Retrieval engine - combines embedding provider and graph store
//!
//! Three modes:
//! - local: vector similarity only
//! - global: keyword-seeded graph traversal only
//! - hybrid: weighted fusion of both

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use super::embedding::EmbeddingProvider;
use super::hybrid::{self, HybridParams};
use super::{similarity, traversal};
use crate::config::EngineConfig;
use crate::core::{Edge, GraphStore, Node, StoreView};
use crate::error::{RagError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Local,
    Global,
    Hybrid,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Local => "local",
            Self::Global => "global",
            Self::Hybrid => "hybrid",
        };
        f.write_str(name)
    }
}

/// Ranked entry; which component scores are set depends on the mode.
#[derive(Debug, Clone)]
pub struct RetrievalHit {
    pub node: Arc<Node>,
    /// Ranking score: similarity, graph score, or fused score.
    pub score: f32,
    pub vector_score: Option<f32>,
    pub graph_score: Option<f32>,
    pub rerank_score: Option<f32>,
    /// Traversal depth (global mode only).
    pub depth: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Retrieval {
    pub mode: SearchMode,
    pub query: String,
    pub hits: Vec<RetrievalHit>,
    /// Local and hybrid: every edge leaving a returned node.
    /// Global: only edges whose source and target were both returned, so the
    /// list describes the returned subgraph rather than the whole reachable set.
    pub relationships: Vec<Arc<Edge>>,
    /// Number of nodes scored before truncation.
    pub total_candidates: usize,
    /// Mean ranking score of the returned hits; 0 when empty.
    pub confidence: f32,
    pub latency_ms: f64,
}

/// Running query statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryStats {
    pub total_queries: u64,
    pub local_queries: u64,
    pub global_queries: u64,
    pub hybrid_queries: u64,
    pub avg_latency_ms: f64,
}

impl QueryStats {
    fn record(&mut self, mode: SearchMode, latency_ms: f64) {
        self.total_queries += 1;
        match mode {
            SearchMode::Local => self.local_queries += 1,
            SearchMode::Global => self.global_queries += 1,
            SearchMode::Hybrid => self.hybrid_queries += 1,
        }
        let n = self.total_queries as f64;
        self.avg_latency_ms += (latency_ms - self.avg_latency_ms) / n;
    }
}

/// Retrieval engine over a shared store
pub struct RetrievalEngine {
    store: Arc<GraphStore>,
    provider: Arc<dyn EmbeddingProvider>,
    config: EngineConfig,
    stats: Mutex<QueryStats>,
}

impl RetrievalEngine {
    pub fn new(
        store: Arc<GraphStore>,
        provider: Arc<dyn EmbeddingProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            provider,
            config,
            stats: Mutex::new(QueryStats::default()),
        }
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Hybrid parameters filled from the engine configuration.
    pub fn hybrid_params(&self) -> HybridParams {
        HybridParams::from_config(&self.config)
    }

    pub fn stats(&self) -> QueryStats {
        self.stats.lock().clone()
    }

    async fn embed_query(&self, query_text: &str) -> Result<Vec<f32>> {
        let embedding = self
            .provider
            .embed(query_text)
            .await
            .map_err(|e| match e {
                RagError::EmbeddingProviderFailure(_) => e,
                other => RagError::EmbeddingProviderFailure(other.to_string()),
            })?;

        if let Some(dim) = self.store.dimension() {
            if dim != embedding.len() {
                warn!(
                    store_dim = dim,
                    query_dim = embedding.len(),
                    "query embedding dimension differs from store; vector scores will be 0"
                );
            }
        }
        Ok(embedding)
    }

    /// Vector-only search.
    pub async fn local(&self, query_text: &str, top_k: usize) -> Result<Retrieval> {
        let start = Instant::now();
        let embedding = self.embed_query(query_text).await?;

        let view = self.store.read();
        let results = similarity::search(&view, &embedding, top_k);
        let hits: Vec<RetrievalHit> = results
            .into_iter()
            .map(|r| RetrievalHit {
                node: r.node,
                score: r.score,
                vector_score: Some(r.score),
                graph_score: None,
                rerank_score: None,
                depth: None,
            })
            .collect();

        Ok(self.finish(SearchMode::Local, query_text, hits, &view, start))
    }

    /// Graph-only search: keyword seeds expanded to `depth`.
    pub fn global(&self, query_text: &str, depth: usize, top_k: usize) -> Retrieval {
        let start = Instant::now();
        let view = self.store.read();
        let reached = traversal::traverse_query(&view, query_text, depth, self.config.direction);

        let mut ranked: Vec<(usize, RetrievalHit)> = reached
            .into_iter()
            .filter_map(|(id, r)| {
                let position = view.position(&id)?;
                Some((
                    position,
                    RetrievalHit {
                        node: Arc::clone(&view.nodes()[position]),
                        score: r.score,
                        vector_score: None,
                        graph_score: Some(r.score),
                        rerank_score: None,
                        depth: Some(r.depth),
                    },
                ))
            })
            .collect();

        ranked.sort_by(|(pa, a), (pb, b)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.depth.cmp(&b.depth))
                .then_with(|| pa.cmp(pb))
        });
        let total = ranked.len();
        let mut hits: Vec<RetrievalHit> = ranked.into_iter().map(|(_, hit)| hit).collect();
        hits.truncate(top_k.max(1));

        let mut retrieval = self.finish(SearchMode::Global, query_text, hits, &view, start);
        retrieval.total_candidates = total;
        retrieval
    }

    /// Fused search; the query text is embedded with the engine's provider.
    pub async fn hybrid(&self, query_text: &str, params: &HybridParams) -> Result<Retrieval> {
        let start = Instant::now();
        hybrid::check_weights(params.vector_weight, params.graph_weight)?;
        let embedding = self.embed_query(query_text).await?;
        self.hybrid_inner(query_text, &embedding, params, start)
    }

    /// Fused search with a caller-supplied query embedding.
    pub fn hybrid_with_embedding(
        &self,
        query_text: &str,
        query_embedding: &[f32],
        params: &HybridParams,
    ) -> Result<Retrieval> {
        self.hybrid_inner(query_text, query_embedding, params, Instant::now())
    }

    fn hybrid_inner(
        &self,
        query_text: &str,
        query_embedding: &[f32],
        params: &HybridParams,
        start: Instant,
    ) -> Result<Retrieval> {
        let view = self.store.read();
        let hits: Vec<RetrievalHit> =
            hybrid::hybrid_search(&view, query_text, query_embedding, params)?
                .into_iter()
                .map(|h| RetrievalHit {
                    node: h.node,
                    score: h.hybrid_score,
                    vector_score: Some(h.vector_score),
                    graph_score: Some(h.graph_score),
                    rerank_score: h.rerank_score,
                    depth: None,
                })
                .collect();
        Ok(self.finish(SearchMode::Hybrid, query_text, hits, &view, start))
    }

    fn finish(
        &self,
        mode: SearchMode,
        query_text: &str,
        hits: Vec<RetrievalHit>,
        view: &StoreView<'_>,
        start: Instant,
    ) -> Retrieval {
        let confidence = if hits.is_empty() {
            0.0
        } else {
            hits.iter().map(|h| h.score).sum::<f32>() / hits.len() as f32
        };

        let returned: HashSet<&str> = hits.iter().map(|h| h.node.id.as_str()).collect();
        let relationships: Vec<Arc<Edge>> = hits
            .iter()
            .flat_map(|h| view.outgoing(&h.node.id))
            .filter(|e| mode != SearchMode::Global || returned.contains(e.target_id.as_str()))
            .cloned()
            .collect();

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.stats.lock().record(mode, latency_ms);
        debug!(%mode, hits = hits.len(), confidence, latency_ms, "query done");

        Retrieval {
            mode,
            query: query_text.to_string(),
            total_candidates: view.len(),
            hits,
            relationships,
            confidence,
            latency_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Metadata;
    use crate::search::embedding::HtpEmbedder;
    use async_trait::async_trait;

    struct FailingProvider;

    #[async_trait]
    impl EmbeddingProvider for FailingProvider {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(RagError::EmbeddingProviderFailure("model offline".into()))
        }

        fn dimension(&self) -> usize {
            4
        }
    }

    async fn engine_with(texts: &[&str]) -> Result<RetrievalEngine> {
        let provider = Arc::new(HtpEmbedder::new(64)?);
        let store = Arc::new(GraphStore::new());
        for text in texts {
            store.insert_node(*text, provider.embed(text).await?, Metadata::new())?;
        }
        Ok(RetrievalEngine::new(store, provider, EngineConfig::default()))
    }

    #[tokio::test]
    async fn test_local_exact_text_ranks_first() -> Result<()> {
        let engine = engine_with(&[
            "Tesla manufactures electric vehicles",
            "SpaceX builds rockets",
            "Elon Musk founded SpaceX in 2002",
        ])
        .await?;
        let result = engine.local("SpaceX builds rockets", 2).await?;
        assert_eq!(result.mode, SearchMode::Local);
        assert_eq!(result.hits.len(), 2);
        assert_eq!(result.hits[0].node.id, "node-1");
        assert!((result.hits[0].score - 1.0).abs() < 1e-4);
        Ok(())
    }

    #[tokio::test]
    async fn test_global_ranks_and_collects_relationships() -> Result<()> {
        let engine = engine_with(&[
            "Elon Musk founded SpaceX in 2002",
            "SpaceX is located in Hawthorne, California",
            "Tesla manufactures electric vehicles",
            "Elon Musk is CEO of Tesla",
        ])
        .await?;
        let store = engine.store();
        store.insert_edge("node-0", "node-3", "FOUNDED_BY", 1.0, Metadata::new())?;
        store.insert_edge("node-2", "node-3", "MANAGED_BY", 1.0, Metadata::new())?;

        let result = engine.global("hawthorne", 2, 5);
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].node.id, "node-1");
        assert!(result.relationships.is_empty());

        let result = engine.global("founded", 2, 5);
        let ids: Vec<_> = result.hits.iter().map(|h| h.node.id.as_str()).collect();
        assert_eq!(ids, vec!["node-0", "node-3"]);
        assert_eq!(result.hits[1].depth, Some(1));
        assert_eq!(result.relationships.len(), 1);
        assert_eq!(result.relationships[0].relationship_type, "FOUNDED_BY");
        assert!((result.confidence - 0.75).abs() < 1e-6);
        Ok(())
    }

    #[tokio::test]
    async fn test_global_drops_edges_to_unreturned_nodes() -> Result<()> {
        let engine = engine_with(&[
            "Elon Musk founded SpaceX in 2002",
            "Elon Musk is CEO of Tesla",
        ])
        .await?;
        engine
            .store()
            .insert_edge("node-0", "node-1", "FOUNDED_BY", 1.0, Metadata::new())?;

        let global = engine.global("founded", 2, 1);
        assert_eq!(global.hits.len(), 1);
        assert_eq!(global.hits[0].node.id, "node-0");
        assert!(global.relationships.is_empty());

        let local = engine.local("Elon Musk founded SpaceX in 2002", 1).await?;
        assert_eq!(local.hits[0].node.id, "node-0");
        assert_eq!(local.relationships.len(), 1);
        assert_eq!(local.relationships[0].target_id, "node-1");
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_results_zero_confidence() -> Result<()> {
        let engine = engine_with(&[]).await?;
        let local = engine.local("anything at all", 5).await?;
        assert!(local.hits.is_empty());
        assert_eq!(local.confidence, 0.0);

        let global = engine.global("anything", 2, 5);
        assert!(global.hits.is_empty());
        assert_eq!(global.confidence, 0.0);

        let hybrid = engine.hybrid("anything", &engine.hybrid_params()).await?;
        assert!(hybrid.hits.is_empty());
        assert_eq!(hybrid.confidence, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_provider_failure_surfaces() -> Result<()> {
        let engine = RetrievalEngine::new(
            Arc::new(GraphStore::new()),
            Arc::new(FailingProvider),
            EngineConfig::default(),
        );
        assert!(matches!(
            engine.local("query", 3).await,
            Err(RagError::EmbeddingProviderFailure(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_stats_track_modes() -> Result<()> {
        let engine = engine_with(&["alpha beta gamma delta"]).await?;
        engine.local("alpha", 1).await?;
        engine.global("alpha", 1, 1);
        engine.hybrid("alpha", &engine.hybrid_params()).await?;
        engine.hybrid("alpha", &engine.hybrid_params()).await?;

        let stats = engine.stats();
        assert_eq!(stats.total_queries, 4);
        assert_eq!(stats.local_queries, 1);
        assert_eq!(stats.global_queries, 1);
        assert_eq!(stats.hybrid_queries, 2);
        assert!(stats.avg_latency_ms >= 0.0);
        Ok(())
    }
}
