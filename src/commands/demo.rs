//! Demo command - populate a small store and run every retrieval mode on it

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;

use super::{print_retrieval, truncate, Context};
use hybrid_rag::search::traversal;
use hybrid_rag::{metadata, GraphStore, MetadataValue, RetrievalEngine};

const DEMO_TEXTS: &[&str] = &[
    "Elon Musk founded SpaceX in 2002",
    "SpaceX is located in Hawthorne, California",
    "Tesla manufactures electric vehicles",
    "Elon Musk is CEO of Tesla",
    "SpaceX builds rockets for space exploration",
];

const DEMO_EDGES: &[(&str, &str, &str)] = &[
    ("node-0", "node-1", "LOCATED_IN"),
    ("node-0", "node-3", "FOUNDED_BY"),
    ("node-2", "node-3", "MANAGED_BY"),
    ("node-1", "node-4", "OPERATES_FROM"),
];

/// Populate a fresh store; with `save`, it replaces the data directory's snapshot.
pub async fn run(ctx: &Context, save: bool) -> Result<()> {
    let store = Arc::new(match ctx.config.dimension {
        Some(d) => GraphStore::with_dimension(d),
        None => GraphStore::new(),
    });
    let provider = ctx.provider(&store)?;

    for (i, text) in DEMO_TEXTS.iter().enumerate() {
        let embedding = provider.embed(text).await?;
        store.insert_node(
            *text,
            embedding,
            metadata([
                ("source", MetadataValue::from("demo")),
                ("index", MetadataValue::from(i)),
            ]),
        )?;
    }
    for (source, target, kind) in DEMO_EDGES {
        store.insert_edge(source, target, *kind, 1.0, Default::default())?;
    }

    let engine = RetrievalEngine::new(Arc::clone(&store), provider, ctx.config.clone());

    if !ctx.json {
        let stats = store.stats();
        println!("{}", "Hybrid retrieval demo".bold());
        println!("{}", "=".repeat(50));
        println!(
            "{} {} nodes, {} edges, dimension {}",
            "→".dimmed(),
            stats.node_count,
            stats.edge_count,
            stats.dimension.unwrap_or_default()
        );
        println!();
    }

    let local = engine.local("space exploration and rockets", 3).await?;
    let global = engine.global("Elon Musk", 2, 5);
    let mut params = engine.hybrid_params();
    params.top_k = 5;
    let hybrid = engine.hybrid("CEO technology companies", &params).await?;

    let view = store.read();
    let reached = traversal::traverse_from_ids(&view, &["node-0"], 2, ctx.config.direction)?;
    let mut reached: Vec<_> = reached.into_iter().collect();
    reached.sort_by_key(|(id, r)| (r.depth, view.position(id)));

    if ctx.json {
        let traversal_json: Vec<_> = reached
            .iter()
            .map(|(id, r)| serde_json::json!({"id": id, "depth": r.depth, "score": r.score}))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "local": super::retrieval_json(&local),
                "traversal": traversal_json,
                "global": super::retrieval_json(&global),
                "hybrid": super::retrieval_json(&hybrid),
            }))?
        );
    } else {
        print_retrieval(&local, false)?;
        println!();

        println!("{} traversal from {} (depth 2)", "→".dimmed(), "node-0".cyan());
        for (id, r) in &reached {
            let text = view.node(id).map(|n| n.text.as_str()).unwrap_or_default();
            println!(
                "  {} {} {}",
                format!("d{}", r.depth).yellow(),
                id.cyan(),
                truncate(text, 60).dimmed()
            );
        }
        println!();

        print_retrieval(&global, false)?;
        println!();
        print_retrieval(&hybrid, false)?;
    }
    drop(view);

    if save {
        ctx.save_store(&store)?;
        if !ctx.json {
            println!();
            println!(
                "{} Demo store saved to {}",
                "✓".green(),
                ctx.paths.root.display()
            );
        }
    }
    Ok(())
}
