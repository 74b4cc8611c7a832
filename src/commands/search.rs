//! Search command - vector similarity only (local mode)

use anyhow::Result;

use super::{print_retrieval, Context};
use hybrid_rag::RetrievalEngine;

pub async fn run(ctx: &Context, query: &str, limit: Option<usize>) -> Result<()> {
    let store = ctx.load_store()?;
    let provider = ctx.provider(&store)?;
    let engine = RetrievalEngine::new(store, provider, ctx.config.clone());

    let retrieval = engine
        .local(query, limit.unwrap_or(ctx.config.default_top_k))
        .await?;
    print_retrieval(&retrieval, ctx.json)
}
