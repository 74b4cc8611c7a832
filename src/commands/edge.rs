//! Edge command - add a relationship between two stored nodes

use anyhow::Result;
use colored::Colorize;

use super::Context;
use hybrid_rag::Metadata;

pub fn run(ctx: &Context, source: &str, target: &str, kind: &str, weight: f32) -> Result<()> {
    let store = ctx.load_store()?;
    let edge = store.insert_edge(source, target, kind, weight, Metadata::new())?;
    ctx.save_store(&store)?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&*edge)?);
    } else {
        println!(
            "{} {} {} -[{}]-> {} (weight {})",
            "✓".green(),
            edge.id.cyan(),
            edge.source_id,
            edge.relationship_type.yellow(),
            edge.target_id,
            edge.weight
        );
    }
    Ok(())
}
