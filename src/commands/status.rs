use std::collections::BTreeMap;

use anyhow::Result;
use chrono::Local;
use colored::*;
use serde::Serialize;

use super::{truncate, Context};
use hybrid_rag::{EngineConfig, MetadataValue};

const TOP_CONNECTED: usize = 5;

#[derive(Serialize)]
struct StoreStatus {
    timestamp: String,
    data_dir: String,
    backend: &'static str,
    node_count: usize,
    edge_count: usize,
    dimension: Option<usize>,
    relationship_types: BTreeMap<String, usize>,
    documents: BTreeMap<String, usize>,
    top_connected: Vec<Connected>,
    config: EngineConfig,
}

#[derive(Serialize)]
struct Connected {
    id: String,
    degree: usize,
    text: String,
}

pub fn run(ctx: &Context, brief: bool) -> Result<()> {
    let store = ctx.load_store()?;
    let view = store.read();

    let mut relationship_types: BTreeMap<String, usize> = BTreeMap::new();
    for edge in view.edges() {
        *relationship_types
            .entry(edge.relationship_type.clone())
            .or_insert(0) += 1;
    }

    let mut documents: BTreeMap<String, usize> = BTreeMap::new();
    for node in view.nodes() {
        let doc = match node.metadata.get("document_id") {
            Some(MetadataValue::String(s)) => s.clone(),
            _ => "(none)".to_string(),
        };
        *documents.entry(doc).or_insert(0) += 1;
    }

    let mut connected: Vec<Connected> = view
        .nodes()
        .iter()
        .map(|n| {
            let degree = view.degree(&n.id);
            Connected {
                id: n.id.clone(),
                degree,
                text: n.text.clone(),
            }
        })
        .filter(|c| c.degree > 0)
        .collect();
    // stable: equal degrees keep insertion order
    connected.sort_by(|a, b| b.degree.cmp(&a.degree));
    connected.truncate(TOP_CONNECTED);

    let status = StoreStatus {
        timestamp: Local::now().to_rfc3339(),
        data_dir: ctx.paths.root.display().to_string(),
        backend: if ctx.sqlite { "sqlite" } else { "json" },
        node_count: view.len(),
        edge_count: view.edges().len(),
        dimension: view.dimension(),
        relationship_types,
        documents,
        top_connected: connected,
        config: ctx.config.clone(),
    };

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&status, brief);
    }
    Ok(())
}

fn print_status(status: &StoreStatus, brief: bool) {
    println!("{}", "Store Status".bold());
    println!("{}", "=".repeat(50));
    println!();
    println!("Checked at: {}", status.timestamp);
    println!("Data dir:   {} ({})", status.data_dir, status.backend);
    println!();

    println!("   {:<12} {:>6}", "Nodes", status.node_count);
    println!("   {:<12} {:>6}", "Edges", status.edge_count);
    match status.dimension {
        Some(d) => println!("   {:<12} {:>6}", "Dimension", d),
        None => println!("   {:<12} {:>6}", "Dimension", "-".dimmed()),
    }
    println!();

    if brief {
        return;
    }

    print_distribution("Relationship types", &status.relationship_types, status.edge_count);
    print_distribution("Documents", &status.documents, status.node_count);

    if !status.top_connected.is_empty() {
        println!("{}", "Most connected".cyan());
        println!("{}", "-".repeat(30));
        for c in &status.top_connected {
            println!(
                "   {:<10} {:>3} {}",
                c.id,
                c.degree,
                truncate(&c.text, 60).dimmed()
            );
        }
        println!();
    }

    let config = &status.config;
    println!("{}", "Retrieval".cyan());
    println!("{}", "-".repeat(30));
    println!(
        "   weights {:.2} vector / {:.2} graph, depth {}, top-k {}",
        config.vector_weight, config.graph_weight, config.hybrid_depth, config.default_top_k
    );
    println!(
        "   scoring {:?}, direction {:?}, rerank {}",
        config.graph_scoring, config.direction, config.rerank
    );
    println!();
    println!("{}", "=".repeat(50));
}

fn print_distribution(title: &str, dist: &BTreeMap<String, usize>, total: usize) {
    if dist.is_empty() {
        return;
    }
    println!("{}", title.cyan());
    println!("{}", "-".repeat(30));
    for (key, count) in dist {
        let pct = if total > 0 {
            (*count as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        println!("   {:<20} {:>4} ({:.0}%)", key, count, pct);
    }
    println!();
}
