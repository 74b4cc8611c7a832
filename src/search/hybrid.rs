//! Hybrid fusion of vector and graph relevance
//!
//! Every node gets a vector score (cosine against the query embedding) and
//! a graph score (see [`GraphScoring`]); the fused score is
//! `vector_score * vector_weight + graph_score * graph_weight`.
//!
//! Weights are not normalized: keeping them summing to 1.0 is the caller's
//! job. Each weight on its own must lie in [0, 1].

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::similarity;
use super::traversal;
use crate::config::{Direction, EngineConfig, GraphScoring};
use crate::core::{Node, StoreView};
use crate::error::{RagError, Result};

/// Bonus per incident edge for keyword-matched nodes.
const DEGREE_BONUS: f32 = 0.1;

/// One fused result with both component scores attached.
#[derive(Debug, Clone)]
pub struct HybridHit {
    pub node: Arc<Node>,
    pub vector_score: f32,
    pub graph_score: f32,
    pub hybrid_score: f32,
    /// Set only when the rerank pass ran.
    pub rerank_score: Option<f32>,
    position: usize,
}

#[derive(Debug, Clone)]
pub struct HybridParams {
    pub top_k: usize,
    pub vector_weight: f32,
    pub graph_weight: f32,
    pub depth: usize,
    pub scoring: GraphScoring,
    pub direction: Direction,
    pub rerank: bool,
}

impl HybridParams {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            top_k: config.default_top_k,
            vector_weight: config.vector_weight,
            graph_weight: config.graph_weight,
            depth: config.hybrid_depth,
            scoring: config.graph_scoring,
            direction: config.direction,
            rerank: config.rerank,
        }
    }
}

impl Default for HybridParams {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Reject non-finite weights or weights outside [0, 1]. The sum is not checked.
pub fn check_weights(vector_weight: f32, graph_weight: f32) -> Result<()> {
    for (name, w) in [("vector_weight", vector_weight), ("graph_weight", graph_weight)] {
        if !w.is_finite() || !(0.0..=1.0).contains(&w) {
            return Err(RagError::InvalidWeight(format!(
                "{} must be within [0, 1], got {}",
                name, w
            )));
        }
    }
    Ok(())
}

/// `min(match_ratio + 0.1 * degree, 1)` for a keyword-matched node.
pub fn degree_score(match_ratio: f32, degree: usize) -> f32 {
    (match_ratio + DEGREE_BONUS * degree as f32).min(1.0)
}

/// Graph score per node id. Nodes missing from the map score 0.
pub fn graph_scores(
    view: &StoreView<'_>,
    query_text: &str,
    params: &HybridParams,
) -> HashMap<String, f32> {
    match params.scoring {
        GraphScoring::Depth => {
            traversal::traverse_query(view, query_text, params.depth, params.direction)
                .into_iter()
                .map(|(id, reached)| (id, reached.score))
                .collect()
        }
        // only nodes matching a query token score; the rest stay at 0
        GraphScoring::Degree => traversal::select_seeds(view, query_text)
            .into_iter()
            .map(|seed| {
                let score = degree_score(seed.score, view.degree(&seed.node_id));
                (seed.node_id, score)
            })
            .collect(),
    }
}

/// Fuse vector and graph scores and return the best `params.top_k` hits.
pub fn hybrid_search(
    view: &StoreView<'_>,
    query_text: &str,
    query_embedding: &[f32],
    params: &HybridParams,
) -> Result<Vec<HybridHit>> {
    check_weights(params.vector_weight, params.graph_weight)?;

    let vector: HashMap<String, f32> = similarity::score_all(view, query_embedding)
        .into_iter()
        .map(|scored| (scored.node.id.clone(), scored.score))
        .collect();
    let graph = graph_scores(view, query_text, params);

    let mut hits: Vec<HybridHit> = view
        .nodes()
        .iter()
        .enumerate()
        .map(|(position, node)| {
            let vector_score = vector.get(&node.id).copied().unwrap_or(0.0);
            let graph_score = graph.get(&node.id).copied().unwrap_or(0.0);
            HybridHit {
                node: Arc::clone(node),
                vector_score,
                graph_score,
                hybrid_score: vector_score * params.vector_weight
                    + graph_score * params.graph_weight,
                rerank_score: None,
                position,
            }
        })
        .collect();

    hits.sort_by(|a, b| by_score(a.hybrid_score, b.hybrid_score, a, b));

    if params.rerank {
        rerank(&mut hits, query_text);
    }

    hits.truncate(params.top_k.max(1));
    tracing::debug!(
        candidates = view.len(),
        graph_hits = graph.len(),
        returned = hits.len(),
        "hybrid search done"
    );
    Ok(hits)
}

/// Mean fused score of the returned hits; 0 for none.
pub fn confidence(hits: &[HybridHit]) -> f32 {
    if hits.is_empty() {
        return 0.0;
    }
    hits.iter().map(|h| h.hybrid_score).sum::<f32>() / hits.len() as f32
}

/// `rerank = hybrid * (0.7 + 0.3 * jaccard(query tokens, text tokens))`
fn rerank(hits: &mut [HybridHit], query_text: &str) {
    let query: HashSet<String> = traversal::query_tokens(query_text).into_iter().collect();

    for hit in hits.iter_mut() {
        let text: HashSet<String> = traversal::query_tokens(&hit.node.text).into_iter().collect();
        let union = query.union(&text).count();
        let overlap = if union == 0 {
            0.0
        } else {
            query.intersection(&text).count() as f32 / union as f32
        };
        hit.rerank_score = Some(hit.hybrid_score * (0.7 + 0.3 * overlap));
    }

    hits.sort_by(|a, b| {
        by_score(
            a.rerank_score.unwrap_or(a.hybrid_score),
            b.rerank_score.unwrap_or(b.hybrid_score),
            a,
            b,
        )
    });
}

/// Descending by `primary`, then by vector score, then insertion order.
fn by_score(primary_a: f32, primary_b: f32, a: &HybridHit, b: &HybridHit) -> Ordering {
    primary_b
        .partial_cmp(&primary_a)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            b.vector_score
                .partial_cmp(&a.vector_score)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.position.cmp(&b.position))
}
