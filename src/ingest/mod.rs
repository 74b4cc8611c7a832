//! Ingestion adapter: raw documents → nodes and inferred edges

pub mod document;
pub mod pipeline;
pub mod relations;

pub use document::{extract_units, Document, DocumentFormat, Extraction, Unit, UnitLimits};
pub use pipeline::{IngestReport, Ingestor};
pub use relations::{extract_relations, infer_links, InferredLink, Relation};
