//! Keyword-seeded breadth-first traversal
//!
//! Seeds are nodes whose text contains at least one query token. BFS runs
//! from all seeds at once, so each node records the smallest depth at which
//! it was reached and is expanded at most once.

use std::collections::{HashMap, VecDeque};

use crate::config::Direction;
use crate::core::StoreView;
use crate::error::{RagError, Result};

/// Traversal starting point
#[derive(Debug, Clone, PartialEq)]
pub struct Seed {
    pub node_id: String,
    /// `matched_query_tokens / total_query_tokens`
    pub score: f32,
}

/// Depth and score of a reached node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reached {
    pub depth: usize,
    pub score: f32,
}

pub type TraversalMap = HashMap<String, Reached>;

/// Lowercased whitespace tokens; duplicates are kept and counted.
pub fn query_tokens(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_lowercase).collect()
}

/// Nodes containing at least one query token as a substring, in insertion order.
pub fn select_seeds(view: &StoreView<'_>, query: &str) -> Vec<Seed> {
    let tokens = query_tokens(query);
    if tokens.is_empty() {
        return Vec::new();
    }
    let total = tokens.len() as f32;

    view.nodes()
        .iter()
        .filter_map(|node| {
            let text = node.text.to_lowercase();
            let matched = tokens.iter().filter(|t| text.contains(t.as_str())).count();
            (matched > 0).then(|| Seed {
                node_id: node.id.clone(),
                score: matched as f32 / total,
            })
        })
        .collect()
}

/// Score of a non-seed node first reached at `depth`.
pub fn depth_score(depth: usize) -> f32 {
    1.0 / (1.0 + depth as f32)
}

/// Multi-source BFS bounded by `max_depth` (0 = seeds only).
pub fn traverse(
    view: &StoreView<'_>,
    seeds: &[Seed],
    max_depth: usize,
    direction: Direction,
) -> TraversalMap {
    let mut reached = TraversalMap::new();
    let mut frontier = VecDeque::new();

    for seed in seeds {
        if !reached.contains_key(&seed.node_id) {
            reached.insert(
                seed.node_id.clone(),
                Reached {
                    depth: 0,
                    score: seed.score,
                },
            );
            frontier.push_back((seed.node_id.clone(), 0usize));
        }
    }

    while let Some((id, depth)) = frontier.pop_front() {
        if depth >= max_depth {
            continue;
        }

        let forward = view.outgoing(&id).map(|e| &e.target_id);
        let next: Vec<&String> = match direction {
            Direction::Directed => forward.collect(),
            Direction::Undirected => forward
                .chain(view.incoming(&id).map(|e| &e.source_id))
                .collect(),
        };

        for neighbor in next {
            if reached.contains_key(neighbor) {
                continue;
            }
            let d = depth + 1;
            reached.insert(
                neighbor.clone(),
                Reached {
                    depth: d,
                    score: depth_score(d),
                },
            );
            frontier.push_back((neighbor.clone(), d));
        }
    }

    tracing::debug!(seeds = seeds.len(), reached = reached.len(), max_depth, "traversal done");
    reached
}

/// Traverse from explicit node ids, each seeded with score 1.0.
pub fn traverse_from_ids<S: AsRef<str>>(
    view: &StoreView<'_>,
    ids: &[S],
    max_depth: usize,
    direction: Direction,
) -> Result<TraversalMap> {
    let seeds = ids
        .iter()
        .map(|id| {
            let id = id.as_ref();
            view.node(id)
                .map(|_| Seed {
                    node_id: id.to_string(),
                    score: 1.0,
                })
                .ok_or_else(|| RagError::NotFound(id.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(traverse(view, &seeds, max_depth, direction))
}

/// Seed by keyword match, then traverse. No match yields an empty map.
pub fn traverse_query(
    view: &StoreView<'_>,
    query: &str,
    max_depth: usize,
    direction: Direction,
) -> TraversalMap {
    let seeds = select_seeds(view, query);
    traverse(view, &seeds, max_depth, direction)
}
