//! Hybrid command - fused vector + graph retrieval

use anyhow::Result;

use super::{print_retrieval, Context};
use hybrid_rag::{GraphScoring, RetrievalEngine};

pub struct HybridArgs {
    pub limit: Option<usize>,
    pub vector_weight: Option<f32>,
    pub graph_weight: Option<f32>,
    pub depth: Option<usize>,
    pub degree: bool,
    pub undirected: bool,
    pub rerank: bool,
}

pub async fn run(ctx: &Context, query: &str, args: HybridArgs) -> Result<()> {
    let store = ctx.load_store()?;
    let provider = ctx.provider(&store)?;
    let engine = RetrievalEngine::new(store, provider, ctx.config.clone());

    let mut params = engine.hybrid_params();
    if let Some(limit) = args.limit {
        params.top_k = limit;
    }
    if let Some(w) = args.vector_weight {
        params.vector_weight = w;
    }
    if let Some(w) = args.graph_weight {
        params.graph_weight = w;
    }
    if let Some(depth) = args.depth {
        params.depth = depth;
    }
    if args.degree {
        params.scoring = GraphScoring::Degree;
    }
    if args.undirected {
        params.direction = hybrid_rag::Direction::Undirected;
    }
    params.rerank |= args.rerank;

    let retrieval = engine.hybrid(query, &params).await?;
    print_retrieval(&retrieval, ctx.json)
}
