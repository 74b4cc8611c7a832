//! Retrieval over the graph store
//!
//! - `similarity`: exact cosine scan (local mode)
//! - `traversal`: keyword-seeded BFS (global mode)
//! - `hybrid`: weighted fusion of both

pub mod embedding;
pub mod engine;
pub mod hybrid;
pub mod similarity;
pub mod traversal;

pub use embedding::{cosine_similarity, EmbeddingProvider, HtpEmbedder, EMBEDDING_DIM};
pub use engine::{QueryStats, Retrieval, RetrievalEngine, RetrievalHit, SearchMode};
pub use hybrid::{HybridHit, HybridParams};
pub use similarity::ScoredNode;
pub use traversal::{Reached, Seed, TraversalMap};
