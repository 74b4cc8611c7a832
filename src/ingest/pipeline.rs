//! Document ingestion: units → embeddings → nodes (+ inferred edges)

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::document::{extract_units, Document, Unit, UnitLimits};
use super::relations::{infer_links, INFERRED_EDGE_WEIGHT};
use crate::config::EngineConfig;
use crate::core::{metadata, Edge, GraphStore, MetadataValue, Node};
use crate::error::{RagError, Result};
use crate::search::EmbeddingProvider;

#[derive(Debug, Default)]
pub struct IngestReport {
    pub document_id: String,
    pub nodes: Vec<Arc<Node>>,
    pub edges: Vec<Arc<Edge>>,
    /// Units below the length threshold or unparseable lines
    pub skipped: usize,
    /// Units whose embedding or insert failed
    pub failed: usize,
}

impl IngestReport {
    pub fn created(&self) -> usize {
        self.nodes.len()
    }
}

pub struct Ingestor {
    store: Arc<GraphStore>,
    provider: Arc<dyn EmbeddingProvider>,
    config: EngineConfig,
}

impl Ingestor {
    pub fn new(
        store: Arc<GraphStore>,
        provider: Arc<dyn EmbeddingProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            provider,
            config,
        }
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    /// Turn `doc` into nodes. Per-unit failures are logged and counted;
    /// only a document that cannot be parsed at all is an error.
    pub async fn ingest(&self, doc: &Document) -> Result<IngestReport> {
        let extraction = extract_units(doc, &UnitLimits::from_config(&self.config))?;
        let mut report = IngestReport {
            document_id: doc.id.clone(),
            skipped: extraction.skipped,
            ..Default::default()
        };

        let embeddings = self.embed_all(&extraction.units).await;

        let mut created_units: Vec<&Unit> = Vec::new();
        for (index, (unit, embedding)) in extraction.units.iter().zip(embeddings).enumerate() {
            let embedding = match embedding {
                Ok(e) => e,
                Err(e) => {
                    warn!(document = %doc.id, unit = index, error = %e, "embedding failed, unit skipped");
                    report.failed += 1;
                    continue;
                }
            };
            match self
                .store
                .insert_node(unit.text.clone(), embedding, unit.metadata.clone())
            {
                Ok(node) => {
                    report.nodes.push(node);
                    created_units.push(unit);
                }
                Err(e) => {
                    warn!(document = %doc.id, unit = index, error = %e, "insert rejected, unit skipped");
                    report.failed += 1;
                }
            }
        }

        if self.config.infer_relations {
            self.link_relations(&mut report, &created_units);
        }

        info!(
            document = %doc.id,
            format = %doc.format,
            nodes = report.nodes.len(),
            edges = report.edges.len(),
            skipped = report.skipped,
            failed = report.failed,
            "ingested document"
        );
        Ok(report)
    }

    /// One embedding per unit, `ingest_concurrency` requests in flight.
    /// The result vector is aligned with `units`.
    async fn embed_all(&self, units: &[Unit]) -> Vec<Result<Vec<f32>>> {
        let semaphore = Arc::new(Semaphore::new(self.config.ingest_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, unit) in units.iter().enumerate() {
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&semaphore);
            let text = unit.text.clone();
            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => provider.embed(&text).await,
                    Err(e) => Err(RagError::EmbeddingProviderFailure(e.to_string())),
                };
                (index, result)
            });
        }

        let mut slots: Vec<Option<Result<Vec<f32>>>> = (0..units.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => warn!(error = %e, "embedding task aborted"),
            }
        }

        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(RagError::EmbeddingProviderFailure("embedding task aborted".into()))
                })
            })
            .collect()
    }

    fn link_relations(&self, report: &mut IngestReport, units: &[&Unit]) {
        let texts: Vec<&str> = units.iter().map(|u| u.text.as_str()).collect();
        for link in infer_links(&texts) {
            let source = &report.nodes[link.source];
            let target = &report.nodes[link.target];
            let meta = metadata([
                ("inferred", MetadataValue::Bool(true)),
                ("head", link.relation.head.as_str().into()),
                ("tail", link.relation.tail.as_str().into()),
            ]);
            match self.store.insert_edge(
                &source.id,
                &target.id,
                link.relation.relation_type.as_str(),
                INFERRED_EDGE_WEIGHT,
                meta,
            ) {
                Ok(edge) => {
                    debug!(id = %edge.id, kind = %edge.relationship_type, "inferred edge");
                    report.edges.push(edge);
                }
                Err(e) => warn!(error = %e, "inferred edge rejected"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::DocumentFormat;
    use crate::search::HtpEmbedder;
    use async_trait::async_trait;

    /// Fails for any text containing "poison".
    struct Picky(HtpEmbedder);

    #[async_trait]
    impl EmbeddingProvider for Picky {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.contains("poison") {
                return Err(RagError::EmbeddingProviderFailure("refused".into()));
            }
            self.0.embed(text).await
        }

        fn dimension(&self) -> usize {
            self.0.dimension()
        }
    }

    fn ingestor(config: EngineConfig) -> Ingestor {
        let embedder = HtpEmbedder::new(16).unwrap();
        Ingestor::new(Arc::new(GraphStore::new()), Arc::new(Picky(embedder)), config)
    }

    #[tokio::test]
    async fn test_short_lines_are_skipped() -> Result<()> {
        let ingestor = ingestor(EngineConfig::default());
        let doc = Document::new(
            "five.txt",
            DocumentFormat::Text,
            "Falcon 9 is a reusable rocket\nDragon carries crew to the ISS\nabc\nStarlink provides internet\nRaptor engines burn methane",
        );
        let report = ingestor.ingest(&doc).await?;
        assert_eq!(report.created(), 4);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);

        let ids: Vec<_> = report.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["node-0", "node-1", "node-2", "node-3"]);
        assert_eq!(report.nodes[2].text, "Starlink provides internet");
        assert_eq!(ingestor.store().len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_provider_failure_skips_only_that_unit() -> Result<()> {
        let ingestor = ingestor(EngineConfig {
            ingest_concurrency: 2,
            ..Default::default()
        });
        let doc = Document::new(
            "mixed.txt",
            DocumentFormat::Text,
            "first healthy line here\nthis one has poison in it\nthird healthy line here",
        );
        let report = ingestor.ingest(&doc).await?;
        assert_eq!(report.created(), 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.nodes[0].text, "first healthy line here");
        assert_eq!(report.nodes[1].text, "third healthy line here");
        Ok(())
    }

    #[tokio::test]
    async fn test_dimension_mismatch_counts_as_failed() -> Result<()> {
        let store = Arc::new(GraphStore::with_dimension(3));
        let ingestor = Ingestor::new(
            Arc::clone(&store),
            Arc::new(HtpEmbedder::new(16)?),
            EngineConfig::default(),
        );
        let doc = Document::new("d", DocumentFormat::Text, "a perfectly long line of text");
        let report = ingestor.ingest(&doc).await?;
        assert_eq!(report.created(), 0);
        assert_eq!(report.failed, 1);
        assert!(store.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_inferred_founded_edge() -> Result<()> {
        let ingestor = ingestor(EngineConfig::default());
        let doc = Document::new(
            "musk.txt",
            DocumentFormat::Text,
            "Elon Musk founded SpaceX in 2002\nSpaceX builds rockets\nTesla manufactures electric vehicles",
        );
        let report = ingestor.ingest(&doc).await?;
        assert_eq!(report.edges.len(), 1);

        let edge = &report.edges[0];
        assert_eq!(edge.source_id, "node-0");
        assert_eq!(edge.target_id, "node-1");
        assert_eq!(edge.relationship_type, "FOUNDED");
        assert!((edge.weight - 0.7).abs() < 1e-6);
        assert_eq!(edge.metadata["inferred"], MetadataValue::Bool(true));
        assert_eq!(edge.metadata["tail"], MetadataValue::from("SpaceX"));
        Ok(())
    }

    #[tokio::test]
    async fn test_inference_can_be_disabled() -> Result<()> {
        let ingestor = ingestor(EngineConfig {
            infer_relations: false,
            ..Default::default()
        });
        let doc = Document::new(
            "musk.txt",
            DocumentFormat::Text,
            "Elon Musk founded SpaceX in 2002\nSpaceX builds rockets",
        );
        let report = ingestor.ingest(&doc).await?;
        assert!(report.edges.is_empty());
        assert_eq!(ingestor.store().stats().edge_count, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_long_line_becomes_several_nodes() -> Result<()> {
        let ingestor = ingestor(EngineConfig {
            infer_relations: false,
            ..Default::default()
        });
        let line: Vec<String> = (0..190).map(|i| format!("word{:03}", i)).collect();
        let doc = Document::new("long.txt", DocumentFormat::Text, line.join(" "));
        let report = ingestor.ingest(&doc).await?;

        assert!(report.created() >= 3);
        for (i, node) in report.nodes.iter().enumerate() {
            assert!(node.text.chars().count() <= 512);
            assert_eq!(node.metadata["chunk_index"], MetadataValue::from(i));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_json_document() -> Result<()> {
        let ingestor = ingestor(EngineConfig::default());
        let doc = Document::new(
            "people.json",
            DocumentFormat::Json,
            r#"{"people": [{"bio": "Engineer working on Raptor engines"}]}"#,
        );
        let report = ingestor.ingest(&doc).await?;
        assert_eq!(report.created(), 1);
        assert_eq!(
            report.nodes[0].metadata["json_path"],
            MetadataValue::from("people[0].bio")
        );
        Ok(())
    }
}
