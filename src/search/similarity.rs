//! Exact cosine-similarity search over every stored node.

use std::cmp::Ordering;
use std::sync::Arc;

use super::embedding::cosine_similarity;
use crate::core::{Node, StoreView};

/// Node paired with its similarity to the query
#[derive(Debug, Clone)]
pub struct ScoredNode {
    pub node: Arc<Node>,
    pub score: f32,
}

/// Rank all nodes against `query_embedding`, best first.
///
/// Ties keep insertion order. `top_k` of 0 is treated as 1.
pub fn search(view: &StoreView<'_>, query_embedding: &[f32], top_k: usize) -> Vec<ScoredNode> {
    let mut results = score_all(view, query_embedding);
    results.truncate(top_k.max(1));
    results
}

/// Score every node, sorted descending. Used directly by hybrid fusion.
pub fn score_all(view: &StoreView<'_>, query_embedding: &[f32]) -> Vec<ScoredNode> {
    // Full linear scan; the store is sized for thousands of nodes.
    let mut results: Vec<ScoredNode> = view
        .nodes()
        .iter()
        .map(|node| ScoredNode {
            score: cosine_similarity(query_embedding, &node.embedding),
            node: Arc::clone(node),
        })
        .collect();

    // stable sort: equal scores stay in insertion order
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    results
}
