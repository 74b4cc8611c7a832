//! Ingest command - turn files into nodes

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use colored::Colorize;
use serde::Serialize;
use tracing::warn;
use walkdir::WalkDir;

use super::Context;
use hybrid_rag::{Document, DocumentFormat, Ingestor};

const KNOWN_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "csv", "json", "jsonl", "ndjson"];

#[derive(Serialize)]
struct FileReport {
    path: String,
    nodes: usize,
    edges: usize,
    skipped: usize,
    failed: usize,
}

pub async fn run(ctx: &Context, inputs: &[String], format: Option<DocumentFormat>) -> Result<()> {
    let files = resolve_inputs(inputs)?;
    if files.is_empty() {
        anyhow::bail!("No input files matched: {}", inputs.join(", "));
    }

    let store = ctx.load_store()?;
    let provider = ctx.provider(&store)?;
    let ingestor = Ingestor::new(store.clone(), provider, ctx.config.clone());

    let mut reports = Vec::new();
    for path in &files {
        let mut doc = Document::from_path(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if let Some(format) = format {
            doc = doc.with_format(format);
        }

        match ingestor.ingest(&doc).await {
            Ok(report) => reports.push(FileReport {
                path: path.display().to_string(),
                nodes: report.created(),
                edges: report.edges.len(),
                skipped: report.skipped,
                failed: report.failed,
            }),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "document skipped");
                if !ctx.json {
                    eprintln!("{} {}: {}", "!".yellow(), path.display(), e);
                }
            }
        }
    }

    ctx.save_store(&store)?;

    if ctx.json {
        let stats = store.stats();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "files": reports,
                "node_count": stats.node_count,
                "edge_count": stats.edge_count,
            }))?
        );
        return Ok(());
    }

    for r in &reports {
        println!(
            "{} {} {} nodes, {} edges{}{}",
            "✓".green(),
            r.path.cyan(),
            r.nodes,
            r.edges,
            if r.skipped > 0 {
                format!(", {} skipped", r.skipped).dimmed().to_string()
            } else {
                String::new()
            },
            if r.failed > 0 {
                format!(", {} failed", r.failed).red().to_string()
            } else {
                String::new()
            },
        );
    }
    let stats = store.stats();
    println!();
    println!(
        "{} Store now holds {} nodes and {} edges",
        "→".dimmed(),
        stats.node_count.to_string().bold(),
        stats.edge_count.to_string().bold()
    );
    Ok(())
}

/// Expand glob patterns and directories into a sorted, de-duplicated file list.
fn resolve_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = BTreeSet::new();

    for input in inputs {
        if input.contains(&['*', '?', '['][..]) {
            for entry in glob::glob(input).with_context(|| format!("Bad pattern: {}", input))? {
                match entry {
                    Ok(path) => collect(&path, &mut files),
                    Err(e) => warn!(error = %e, "unreadable glob match"),
                }
            }
        } else {
            let path = PathBuf::from(input);
            if !path.exists() {
                anyhow::bail!("No such file or directory: {}", input);
            }
            collect(&path, &mut files);
        }
    }

    Ok(files.into_iter().collect())
}

fn collect(path: &Path, files: &mut BTreeSet<PathBuf>) {
    if path.is_file() {
        files.insert(path.to_path_buf());
        return;
    }
    for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file() && has_known_extension(entry.path()) {
            files.insert(entry.into_path());
        }
    }
}

fn has_known_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| KNOWN_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_resolve_walks_directories_and_globs() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        fs::write(nested.join("b.md"), "bravo").unwrap();
        fs::write(nested.join("c.bin"), "skip").unwrap();

        let from_dir = resolve_inputs(&[dir.path().display().to_string()]).unwrap();
        assert_eq!(from_dir.len(), 2);

        let pattern = format!("{}/*.txt", dir.path().display());
        let from_glob = resolve_inputs(&[pattern]).unwrap();
        assert_eq!(from_glob, vec![dir.path().join("a.txt")]);

        assert!(resolve_inputs(&["/definitely/not/here.txt".to_string()]).is_err());
    }
}
