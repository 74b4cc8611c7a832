//! End-to-end scenarios through the public API

use std::sync::Arc;

use async_trait::async_trait;
use hybrid_rag::{
    Document, DocumentFormat, EmbeddingProvider, EngineConfig, GraphStore, HtpEmbedder,
    HybridParams, Ingestor, JsonSnapshot, Metadata, RagError, Result, RetrievalEngine,
    SearchMode, Snapshot,
};

/// One dimension per keyword, 1.0 when the text contains it.
struct KeywordEmbedder;

const KEYWORDS: &[&str] = &["space", "rocket", "electric", "musk"];

impl KeywordEmbedder {
    fn features(text: &str) -> Vec<f32> {
        let text = text.to_lowercase();
        KEYWORDS
            .iter()
            .map(|k| if text.contains(k) { 1.0 } else { 0.0 })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(Self::features(text))
    }

    fn dimension(&self) -> usize {
        KEYWORDS.len()
    }
}

const TEXTS: [&str; 3] = [
    "Elon Musk founded SpaceX in 2002",
    "SpaceX builds rockets",
    "Tesla manufactures electric vehicles",
];

fn scenario_store() -> Arc<GraphStore> {
    let store = GraphStore::new();
    for text in TEXTS {
        store
            .insert_node(text, KeywordEmbedder::features(text), Metadata::new())
            .unwrap();
    }
    store
        .insert_edge("node-0", "node-1", "FOUNDED", 1.0, Metadata::new())
        .unwrap();
    Arc::new(store)
}

fn engine(store: Arc<GraphStore>) -> RetrievalEngine {
    RetrievalEngine::new(store, Arc::new(KeywordEmbedder), EngineConfig::default())
}

#[tokio::test]
async fn scenario_a_similarity_ranks_space_nodes_first() -> Result<()> {
    let engine = engine(scenario_store());
    let retrieval = engine.local("space", 2).await?;

    assert_eq!(retrieval.mode, SearchMode::Local);
    let mut ids: Vec<_> = retrieval.hits.iter().map(|h| h.node.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["node-0", "node-1"]);

    let all = engine.local("space", 10).await?;
    assert_eq!(all.hits.len(), 3);
    assert_eq!(all.hits[2].node.id, "node-2");
    assert!(all.hits[0].score > all.hits[2].score);
    Ok(())
}

#[test]
fn scenario_b_traversal_depths() -> Result<()> {
    let store = scenario_store();
    let view = store.read();
    let map = hybrid_rag::search::traversal::traverse_from_ids(
        &view,
        &["node-0"],
        1,
        Default::default(),
    )?;

    assert_eq!(map.len(), 2);
    assert_eq!(map["node-0"].depth, 0);
    assert_eq!(map["node-1"].depth, 1);
    assert!((map["node-1"].score - 0.5).abs() < 1e-6);
    Ok(())
}

#[tokio::test]
async fn scenario_c_hybrid_matches_manual_arithmetic() -> Result<()> {
    let engine = engine(scenario_store());
    let params = HybridParams {
        top_k: 3,
        vector_weight: 0.6,
        graph_weight: 0.4,
        ..Default::default()
    };
    let retrieval = engine.hybrid("space", &params).await?;
    assert_eq!(retrieval.hits.len(), 3);

    // both SpaceX nodes are keyword seeds (1/1); cosine of [1,0,0,0] with
    // two active features is 1/sqrt(2)
    let expected_top = 0.6 * std::f64::consts::FRAC_1_SQRT_2 + 0.4;
    for hit in &retrieval.hits {
        let expected = match hit.node.id.as_str() {
            "node-0" | "node-1" => expected_top,
            _ => 0.0,
        };
        assert!(
            (hit.score as f64 - expected).abs() < 1e-4,
            "{}: {} vs {}",
            hit.node.id,
            hit.score,
            expected
        );
    }
    // tie on score and vector score: insertion order
    assert_eq!(retrieval.hits[0].node.id, "node-0");
    assert_eq!(retrieval.hits[2].node.id, "node-2");
    Ok(())
}

#[tokio::test]
async fn scenario_d_short_line_is_not_ingested() -> Result<()> {
    let store = Arc::new(GraphStore::new());
    let ingestor = Ingestor::new(
        Arc::clone(&store),
        Arc::new(HtpEmbedder::new(32)?),
        EngineConfig::default(),
    );
    let doc = Document::new(
        "five_lines.txt",
        DocumentFormat::Text,
        "Falcon Heavy lifted off from Florida\nThe booster landed on the drone ship\nyes\nStarship flew its fourth test flight\nCrew Dragon docked with the station\n",
    );
    let report = ingestor.ingest(&doc).await?;
    assert_eq!(report.created(), 4);
    assert_eq!(store.len(), 4);
    Ok(())
}

#[test]
fn scenario_e_unknown_target_creates_nothing() {
    let store = scenario_store();
    let before = store.stats();
    let err = store
        .insert_edge("node-0", "node-99", "FOUNDED", 1.0, Metadata::new())
        .unwrap_err();
    assert!(matches!(err, RagError::UnknownNode(ref id) if id == "node-99"));
    assert_eq!(store.stats(), before);
}

#[test]
fn identical_texts_are_not_deduplicated() -> Result<()> {
    let store = GraphStore::new();
    let a = store.insert_node("same text", vec![1.0, 0.0], Metadata::new())?;
    let b = store.insert_node("same text", vec![1.0, 0.0], Metadata::new())?;
    assert_ne!(a.id, b.id);
    assert_eq!(store.len(), 2);
    Ok(())
}

#[tokio::test]
async fn snapshot_round_trip_keeps_ids_advancing() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let snapshot = JsonSnapshot::in_dir(dir.path());

    let store = scenario_store();
    snapshot.save(&store)?;
    assert!(snapshot.exists());

    let restored = Arc::new(snapshot.load(None)?);
    assert_eq!(restored.stats(), store.stats());
    let next = restored.insert_node("Starship", KeywordEmbedder::features("Starship"), Metadata::new())?;
    assert_eq!(next.id, "node-3");

    let retrieval = engine(restored).global("spacex", 1, 10);
    assert_eq!(retrieval.hits.len(), 2);
    assert_eq!(retrieval.relationships.len(), 1);
    Ok(())
}

#[tokio::test]
async fn ingested_sentences_get_inferred_edges() -> Result<()> {
    let store = Arc::new(GraphStore::new());
    let ingestor = Ingestor::new(
        Arc::clone(&store),
        Arc::new(KeywordEmbedder),
        EngineConfig::default(),
    );
    let doc = Document::new("scenario.txt", DocumentFormat::Text, TEXTS.join("\n"));
    let report = ingestor.ingest(&doc).await?;

    assert_eq!(report.created(), 3);
    let edges = store.list_edges();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].relationship_type, "FOUNDED");
    assert_eq!((edges[0].source_id.as_str(), edges[0].target_id.as_str()), ("node-0", "node-1"));

    let engine = engine(store);
    let hybrid = engine.hybrid("rockets", &engine.hybrid_params()).await?;
    assert_eq!(hybrid.hits[0].node.id, "node-1");
    assert_eq!(engine.stats().hybrid_queries, 1);
    Ok(())
}
