//! Documents and their candidate units
//!
//! A unit is one piece of text that may become a node: a line, a
//! paragraph, a table row, or a string leaf of a JSON tree.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde_json::Value;
use tracing::warn;

use crate::config::EngineConfig;
use crate::core::{Metadata, MetadataValue};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// One unit per non-empty line
    Text,
    /// One unit per paragraph
    Markdown,
    /// Header line, then one unit per row
    Csv,
    /// String leaves of a JSON tree
    Json,
    /// One JSON document per line
    JsonLines,
}

impl DocumentFormat {
    /// Guess from the file extension; unknown extensions read as text.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
            .unwrap_or(Self::Text)
    }
}

impl FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(Self::Text),
            "md" | "markdown" => Ok(Self::Markdown),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "jsonl" | "ndjson" => Ok(Self::JsonLines),
            other => Err(format!(
                "unknown format '{}' (must be: text|markdown|csv|json|jsonl)",
                other
            )),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::JsonLines => "jsonl",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    /// Identifier recorded on every node (usually the file name).
    pub id: String,
    pub format: DocumentFormat,
    pub content: String,
    /// Provenance tag, e.g. `file_upload` or `inline`.
    pub source: String,
}

impl Document {
    pub fn new(id: impl Into<String>, format: DocumentFormat, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            format,
            content: content.into(),
            source: "inline".to_string(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let id = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();
        Ok(Self {
            id,
            format: DocumentFormat::from_path(path),
            content,
            source: "file_upload".to_string(),
        })
    }

    pub fn with_format(mut self, format: DocumentFormat) -> Self {
        self.format = format;
        self
    }
}

/// Candidate node text with its provenance metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub text: String,
    pub metadata: Metadata,
}

#[derive(Debug, Default)]
pub struct Extraction {
    pub units: Vec<Unit>,
    /// Candidates dropped as too short, plus unparseable JSON lines.
    pub skipped: usize,
}

/// Length bounds for units, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitLimits {
    /// Shorter units are dropped.
    pub min_len: usize,
    /// Longer units are split into overlapping word chunks; 0 disables splitting.
    pub max_len: usize,
}

impl UnitLimits {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            min_len: config.min_unit_len,
            max_len: config.max_unit_len,
        }
    }
}

impl Default for UnitLimits {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Split a document into units within `limits`.
pub fn extract_units(doc: &Document, limits: &UnitLimits) -> Result<Extraction> {
    let mut out = Extractor {
        doc,
        limits: *limits,
        extraction: Extraction::default(),
        position: 0,
    };

    match doc.format {
        DocumentFormat::Text => {
            for (line_index, line) in doc.content.lines().enumerate() {
                out.push(line, [("line_index", line_index.into())]);
            }
        }
        DocumentFormat::Markdown => {
            for (paragraph_index, paragraph) in paragraphs(&doc.content).into_iter().enumerate() {
                out.push(&paragraph, [("paragraph_index", paragraph_index.into())]);
            }
        }
        DocumentFormat::Csv => {
            let mut lines = doc.content.lines().filter(|l| !l.trim().is_empty());
            let header = lines.next().map(str::trim).unwrap_or("").to_string();
            for (row_index, row) in lines.enumerate() {
                out.push(
                    row,
                    [
                        ("row_index", row_index.into()),
                        ("columns", MetadataValue::from(header.as_str())),
                    ],
                );
            }
        }
        DocumentFormat::Json => {
            let value: Value = serde_json::from_str(&doc.content)?;
            out.walk(&value, String::new(), None);
        }
        DocumentFormat::JsonLines => {
            for (line_index, line) in doc.content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(line) {
                    Ok(value) => out.walk(&value, format!("[{}]", line_index), None),
                    Err(e) => {
                        warn!(document = %doc.id, line = line_index, error = %e, "skipping invalid JSON line");
                        out.extraction.skipped += 1;
                    }
                }
            }
        }
    }

    Ok(out.extraction)
}

/// Last step of a JSON path.
enum PathStep<'a> {
    Key(&'a str),
    Index(usize),
}

struct Extractor<'d> {
    doc: &'d Document,
    limits: UnitLimits,
    extraction: Extraction,
    position: usize,
}

impl<'d> Extractor<'d> {
    fn push<const N: usize>(&mut self, raw: &str, extra: [(&str, MetadataValue); N]) {
        let text = raw.trim();
        if text.is_empty() {
            return;
        }
        let position = self.position;
        self.position += 1;

        let mut metadata = Metadata::new();
        metadata.insert("source".into(), self.doc.source.as_str().into());
        metadata.insert("document_id".into(), self.doc.id.as_str().into());
        metadata.insert("position".into(), position.into());
        for (key, value) in extra {
            metadata.insert(key.to_string(), value);
        }

        let max_len = self.limits.max_len;
        if max_len == 0 || text.chars().count() <= max_len {
            self.keep(text.to_string(), metadata);
            return;
        }

        for (chunk_index, chunk) in chunk_words(text, max_len).into_iter().enumerate() {
            let mut metadata = metadata.clone();
            metadata.insert("chunk_index".into(), chunk_index.into());
            self.keep(chunk, metadata);
        }
    }

    fn keep(&mut self, text: String, metadata: Metadata) {
        if text.chars().count() < self.limits.min_len {
            self.extraction.skipped += 1;
            return;
        }
        self.extraction.units.push(Unit { text, metadata });
    }

    fn walk(&mut self, value: &Value, path: String, step: Option<PathStep<'_>>) {
        match value {
            Value::String(s) => {
                let json_path = if path.is_empty() { "$".to_string() } else { path };
                match step {
                    Some(PathStep::Key(key)) => self.push(
                        s,
                        [
                            ("json_path", json_path.into()),
                            ("json_key", key.into()),
                        ],
                    ),
                    Some(PathStep::Index(i)) => self.push(
                        s,
                        [("json_path", json_path.into()), ("array_index", i.into())],
                    ),
                    None => self.push(s, [("json_path", json_path.into())]),
                }
            }
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.walk(item, format!("{}[{}]", path, i), Some(PathStep::Index(i)));
                }
            }
            Value::Object(map) => {
                for (key, item) in map {
                    let child = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", path, key)
                    };
                    self.walk(item, child, Some(PathStep::Key(key.as_str())));
                }
            }
            // numbers, booleans and nulls carry no text
            _ => {}
        }
    }
}

/// Word chunks of about `max_len` characters; each chunk starts with the
/// second half of the previous chunk's words.
fn chunk_words(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut size = 0;
    // words added since the last emitted chunk
    let mut fresh = false;

    for word in text.split_whitespace() {
        current.push(word);
        size += word.chars().count() + 1;
        fresh = true;

        if size >= max_len {
            chunks.push(current.join(" "));
            let keep_from = if current.len() > 1 { current.len() / 2 } else { 1 };
            current.drain(..keep_from);
            size = current.iter().map(|w| w.chars().count() + 1).sum();
            fresh = false;
        }
    }
    if fresh && !current.is_empty() {
        chunks.push(current.join(" "));
    }
    chunks
}

/// Blank-line separated blocks, inner lines joined by a single space.
fn paragraphs(content: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                out.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current.join(" "));
    }
    out
}
