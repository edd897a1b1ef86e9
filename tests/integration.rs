//! End-to-end pipeline tests: ingest a fixture tree, search it, and
//! generate documentation, with the mock provider and in-memory stores.

use std::path::Path;
use std::sync::Arc;

use scribe_docgen::{DocGenConfig, DocGenerator, DocTarget};
use scribe_index::assembler::{ContextBudget, assemble};
use scribe_index::indexer::{CHUNK_COLLECTION, Indexer, IndexerConfig};
use scribe_index::retriever::{RetrievalConfig, Retriever};
use scribe_index::HeuristicTokenizer;
use scribe_llm::mock::MockProvider;
use scribe_store::VectorStore;
use scribe_store::catalog::Catalog;
use scribe_store::in_memory_store::InMemoryVectorStore;
use scribe_store::vector_store::VectorFilter;

struct Pipeline {
    store: Arc<InMemoryVectorStore>,
    catalog: Arc<Catalog>,
    provider: Arc<MockProvider>,
    tokenizer: Arc<HeuristicTokenizer>,
}

impl Pipeline {
    async fn new(provider: MockProvider) -> Self {
        Self {
            store: Arc::new(InMemoryVectorStore::new()),
            catalog: Arc::new(Catalog::new(":memory:").await.unwrap()),
            provider: Arc::new(provider),
            tokenizer: Arc::new(HeuristicTokenizer),
        }
    }

    fn indexer(&self) -> Indexer<MockProvider> {
        Indexer::new(
            self.store.clone(),
            self.catalog.clone(),
            self.provider.clone(),
            self.tokenizer.clone(),
            IndexerConfig::default(),
        )
    }

    fn retriever(&self, config: RetrievalConfig) -> Retriever<MockProvider> {
        Retriever::new(self.store.clone(), self.provider.clone(), config)
    }
}

fn write_fixture_tree(dir: &Path) {
    std::fs::write(
        dir.join("app.py"),
        "def handle_request(req):\n    return respond(req)\n\nclass Router:\n    def route(self, path):\n        return path\n",
    )
    .unwrap();
    std::fs::write(
        dir.join("util.js"),
        "const identity = (x) => { return x; }\n",
    )
    .unwrap();
    std::fs::write(dir.join("README.md"), "# Fixture\n\nA tiny project.\n").unwrap();
}

#[tokio::test]
async fn ingest_search_generate_round_trip() {
    let pipeline = Pipeline::new(MockProvider::with_responses(vec![
        "# app.py\n\nHandles requests.".into(),
    ]))
    .await;

    let dir = tempfile::tempdir().unwrap();
    write_fixture_tree(dir.path());

    let report = pipeline.indexer().ingest(dir.path(), "demo").await.unwrap();
    assert_eq!(report.files_indexed, 3);
    assert!(report.chunks_created >= 4);
    assert!(report.errors.is_empty());

    let retriever = pipeline.retriever(RetrievalConfig::default());
    let hits = retriever
        .retrieve("how are requests handled?", &report.project_id)
        .await
        .unwrap();
    assert!(!hits.is_empty());
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score, "hits must stay relevance-descending");
    }
    assert!(hits.iter().all(|h| h.project_id == report.project_id));

    let generator = DocGenerator::new(
        pipeline.retriever(RetrievalConfig::default()),
        pipeline.provider.clone(),
        pipeline.catalog.clone(),
        pipeline.tokenizer.clone(),
        DocGenConfig::default(),
    );
    let doc = generator
        .generate(&report.project_id, "app.py", &DocTarget::File)
        .await
        .unwrap();

    assert_eq!(doc.content, "# app.py\n\nHandles requests.");
    assert!(doc.context_chunks > 0);

    let saved = pipeline
        .catalog
        .get_document(&doc.document_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.file_path, "app.py");
    assert_eq!(saved.target, "file");
}

#[tokio::test]
async fn projects_are_isolated_in_search() {
    let pipeline = Pipeline::new(MockProvider::default()).await;

    let dir_a = tempfile::tempdir().unwrap();
    std::fs::write(dir_a.path().join("a.py"), "def only_in_a():\n    pass\n").unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    std::fs::write(dir_b.path().join("b.py"), "def only_in_b():\n    pass\n").unwrap();

    let report_a = pipeline.indexer().ingest(dir_a.path(), "a").await.unwrap();
    let report_b = pipeline.indexer().ingest(dir_b.path(), "b").await.unwrap();

    let retriever = pipeline.retriever(RetrievalConfig::default());
    let hits = retriever.retrieve("anything", &report_a.project_id).await.unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.project_id == report_a.project_id));
    assert!(hits.iter().all(|h| h.file_path == "a.py"));

    let hits_b = retriever.retrieve("anything", &report_b.project_id).await.unwrap();
    assert!(hits_b.iter().all(|h| h.file_path == "b.py"));
}

#[tokio::test]
async fn degraded_embeddings_are_observable_and_excludable() {
    let pipeline = Pipeline::new(MockProvider::failing_embed_batch()).await;

    let dir = tempfile::tempdir().unwrap();
    write_fixture_tree(dir.path());

    let report = pipeline.indexer().ingest(dir.path(), "demo").await.unwrap();
    assert_eq!(report.chunks_degraded, report.chunks_created);

    // With a zero threshold the defaulted points are still visible and
    // flagged.
    let lenient = pipeline.retriever(RetrievalConfig {
        score_threshold: 0.0,
        ..RetrievalConfig::default()
    });
    let hits = lenient.retrieve("anything", &report.project_id).await.unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.degraded));

    // Excluding degraded entries removes them from retrieval entirely.
    let strict = pipeline.retriever(RetrievalConfig {
        score_threshold: 0.0,
        exclude_degraded: true,
        ..RetrievalConfig::default()
    });
    let hits = strict.retrieve("anything", &report.project_id).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn assembled_context_is_bounded_and_deterministic() {
    let pipeline = Pipeline::new(MockProvider::default()).await;

    let dir = tempfile::tempdir().unwrap();
    write_fixture_tree(dir.path());
    let report = pipeline.indexer().ingest(dir.path(), "demo").await.unwrap();

    let retriever = pipeline.retriever(RetrievalConfig::default());
    let hits = retriever.retrieve("routing", &report.project_id).await.unwrap();
    assert!(!hits.is_empty());

    let budget = ContextBudget::new(60, 10);
    let a = assemble(&hits, &budget, &HeuristicTokenizer).unwrap();
    let b = assemble(&hits, &budget, &HeuristicTokenizer).unwrap();

    assert_eq!(a.text, b.text);
    assert!(a.token_count <= budget.available_tokens());
    assert!(a.chunks_used <= hits.len());
}

#[tokio::test]
async fn remove_project_clears_the_collection() {
    let pipeline = Pipeline::new(MockProvider::default()).await;

    let dir = tempfile::tempdir().unwrap();
    write_fixture_tree(dir.path());
    let report = pipeline.indexer().ingest(dir.path(), "demo").await.unwrap();

    pipeline
        .indexer()
        .remove_project(&report.project_id)
        .await
        .unwrap();

    let hits = pipeline
        .store
        .search(
            CHUNK_COLLECTION,
            vec![0.1; 8],
            50,
            Some(VectorFilter::must_text("project_id", &report.project_id)),
        )
        .await
        .unwrap();
    assert!(hits.is_empty());
}
