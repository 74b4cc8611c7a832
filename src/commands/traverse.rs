//! Traverse command - keyword-seeded or id-seeded graph expansion

use anyhow::Result;
use colored::Colorize;

use super::{print_retrieval, truncate, Context};
use hybrid_rag::search::traversal;
use hybrid_rag::RetrievalEngine;

pub fn run(
    ctx: &Context,
    query: Option<&str>,
    from: &[String],
    depth: Option<usize>,
    limit: Option<usize>,
) -> Result<()> {
    let store = ctx.load_store()?;
    let depth = depth.unwrap_or(ctx.config.hybrid_depth);

    if from.is_empty() {
        let query = query.unwrap_or_default();
        let provider = ctx.provider(&store)?;
        let engine = RetrievalEngine::new(store, provider, ctx.config.clone());
        let retrieval = engine.global(query, depth, limit.unwrap_or(ctx.config.default_top_k));
        return print_retrieval(&retrieval, ctx.json);
    }

    let view = store.read();
    let reached = traversal::traverse_from_ids(&view, from, depth, ctx.config.direction)?;

    // depth first, then insertion order
    let mut rows: Vec<_> = reached
        .iter()
        .filter_map(|(id, r)| view.position(id).map(|pos| (r.depth, pos, id, r.score)))
        .collect();
    rows.sort_by_key(|(depth, pos, _, _)| (*depth, *pos));
    rows.truncate(limit.unwrap_or(usize::MAX));

    if ctx.json {
        let out: Vec<_> = rows
            .iter()
            .map(|(depth, pos, id, score)| {
                serde_json::json!({
                    "id": id,
                    "depth": depth,
                    "score": score,
                    "text": view.nodes()[*pos].text,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "{} {} nodes within depth {} of {}",
        "→".dimmed(),
        rows.len(),
        depth,
        from.join(", ").cyan()
    );
    println!();
    for (depth, pos, id, score) in &rows {
        println!(
            "  {} {} {}",
            format!("d{}", depth).yellow(),
            id.cyan(),
            format!("({:.3})", score).dimmed()
        );
        println!("     {}", truncate(&view.nodes()[*pos].text, 90));
    }
    Ok(())
}
