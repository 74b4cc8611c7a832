//! Pattern-based relation extraction
//!
//! A relation is `(head, type, tail)`, e.g. `("Musk", "FOUNDED", "SpaceX")`.
//! Heads and tails must look like proper nouns (leading uppercase letter or
//! digit), which filters out most pronouns and auxiliaries.

use lazy_static::lazy_static;
use regex::Regex;

/// Confidence attached to inferred edges.
pub const INFERRED_EDGE_WEIGHT: f32 = 0.7;

lazy_static! {
    static ref PATTERNS: Vec<(&'static str, Regex)> = vec![
        // "X is the CEO of Y", "X was an engineer at Y"
        (
            "WORKS_AT",
            Regex::new(r"(?i)(\w+)\s+(?:is|was|are|were)\s+(?:a\s+|an\s+|the\s+)?(?:ceo|president|manager|director|employee|engineer|member|founder)\s+(?:at|of|in)\s+(\w+)").unwrap(),
        ),
        ("FOUNDED", Regex::new(r"(?i)(\w+)\s+(?:founded|co-founded|created|established)\s+(\w+)").unwrap()),
        ("MANAGES", Regex::new(r"(?i)(\w+)\s+(?:manages|leads|heads|runs)\s+(\w+)").unwrap()),
        ("OWNS", Regex::new(r"(?i)(\w+)\s+(?:owns|acquired|bought)\s+(\w+)").unwrap()),
        (
            "LOCATED_IN",
            Regex::new(r"(?i)(\w+)\s+(?:is\s+|was\s+)?(?:located|based|headquartered)\s+(?:in|at)\s+(\w+)").unwrap(),
        ),
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub head: String,
    pub relation_type: String,
    pub tail: String,
}

fn is_entity(word: &str) -> bool {
    word.chars()
        .next()
        .map_or(false, |c| c.is_uppercase() || c.is_ascii_digit())
}

/// All relations mentioned in `text`, in pattern order, without duplicates.
pub fn extract_relations(text: &str) -> Vec<Relation> {
    let mut out: Vec<Relation> = Vec::new();
    for (relation_type, re) in PATTERNS.iter() {
        for caps in re.captures_iter(text) {
            let head = &caps[1];
            let tail = &caps[2];
            if !is_entity(head) || !is_entity(tail) || head.eq_ignore_ascii_case(tail) {
                continue;
            }
            let relation = Relation {
                head: head.to_string(),
                relation_type: relation_type.to_string(),
                tail: tail.to_string(),
            };
            if !out.contains(&relation) {
                out.push(relation);
            }
        }
    }
    out
}

/// An edge proposal between two unit indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredLink {
    pub source: usize,
    pub target: usize,
    pub relation: Relation,
}

/// Link unit `u` to every other unit `v` whose text mentions a tail of a
/// relation found in `u`. At most one link per `(u, v, type)`.
pub fn infer_links<S: AsRef<str>>(texts: &[S]) -> Vec<InferredLink> {
    let lowered: Vec<String> = texts.iter().map(|t| t.as_ref().to_lowercase()).collect();
    let mut links: Vec<InferredLink> = Vec::new();

    for (source, text) in texts.iter().enumerate() {
        for relation in extract_relations(text.as_ref()) {
            let tail = relation.tail.to_lowercase();
            for (target, other) in lowered.iter().enumerate() {
                if target == source || !other.contains(&tail) {
                    continue;
                }
                let duplicate = links.iter().any(|l| {
                    l.source == source
                        && l.target == target
                        && l.relation.relation_type == relation.relation_type
                });
                if !duplicate {
                    links.push(InferredLink {
                        source,
                        target,
                        relation: relation.clone(),
                    });
                }
            }
        }
    }

    links
}
