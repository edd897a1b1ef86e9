//! Project ingestion pipeline: walk → chunk → embed → store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use scribe_llm::provider::LlmProvider;
use scribe_store::catalog::Catalog;
use scribe_store::vector_store::{VectorFilter, VectorPoint};
use scribe_store::VectorStore;

use crate::chunker::{Chunk, Chunker, ChunkerConfig};
use crate::error::{IndexError, Result};
use crate::languages::{classify, is_source_file, Lang};
use crate::tokens::TokenCounter;

/// Vector collection holding one point per chunk.
pub const CHUNK_COLLECTION: &str = "scribe_chunks";

/// Indexer configuration.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub chunker: ChunkerConfig,
    pub collection: String,
    /// Chunks embedded per provider request.
    pub embed_batch_size: usize,
    /// Worker pool size for per-file chunking.
    pub concurrency: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            collection: CHUNK_COLLECTION.to_owned(),
            embed_batch_size: 16,
            concurrency: 8,
        }
    }
}

/// Summary of an ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub project_id: String,
    pub files_scanned: usize,
    pub files_indexed: usize,
    pub chunks_created: usize,
    /// Chunks whose embedding was defaulted to a zero vector after a batch
    /// failure. Stored and searchable, but effectively non-retrievable.
    pub chunks_degraded: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

/// A chunk decorated with its catalog foreign keys. Built as a new record;
/// the chunk itself is never mutated after creation.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub chunk: Chunk,
    pub file_id: String,
    pub project_id: String,
}

struct EmbeddedVector {
    vector: Vec<f32>,
    degraded: bool,
}

/// Orchestrates ingestion of a project tree.
pub struct Indexer<P> {
    store: Arc<dyn VectorStore>,
    catalog: Arc<Catalog>,
    provider: Arc<P>,
    tokenizer: Arc<dyn TokenCounter>,
    chunker: Chunker,
    config: IndexerConfig,
}

impl<P: LlmProvider> Indexer<P> {
    #[must_use]
    pub fn new(
        store: Arc<dyn VectorStore>,
        catalog: Arc<Catalog>,
        provider: Arc<P>,
        tokenizer: Arc<dyn TokenCounter>,
        config: IndexerConfig,
    ) -> Self {
        let chunker = Chunker::new(config.chunker.clone());
        Self {
            store,
            catalog,
            provider,
            tokenizer,
            chunker,
            config,
        }
    }

    /// Ingest a project tree: register the project, chunk every recognized
    /// source file, embed the chunks, and store one vector point each.
    ///
    /// Per-file failures are recorded in the report and do not abort the
    /// run. Embedding batch failures degrade to zero vectors.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedding probe, collection setup, or
    /// catalog operations fail.
    pub async fn ingest(&self, root: &Path, project_name: &str) -> Result<IngestReport> {
        let start = std::time::Instant::now();

        // Probe the provider once to size the collection.
        let probe = self.provider.embed("probe").await?;
        let dimension = probe.len();
        let vector_size =
            u64::try_from(dimension).map_err(|e| IndexError::Other(e.to_string()))?;
        self.store
            .ensure_collection(&self.config.collection, vector_size)
            .await?;

        let project = self.catalog.create_project(project_name).await?;

        let entries: Vec<PathBuf> = ignore::WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .build()
            .flatten()
            .filter(|e| {
                e.file_type().is_some_and(|ft| ft.is_file()) && is_source_file(e.path())
            })
            .map(ignore::DirEntry::into_path)
            .collect();

        let total = entries.len();
        tracing::info!(total, project = %project.id, "ingestion started");

        let mut report = IngestReport {
            project_id: project.id.clone(),
            files_scanned: total,
            ..IngestReport::default()
        };

        // Chunking fans out over a fixed-size worker pool; results are
        // keyed by file index so output order stays stable regardless of
        // completion order.
        let mut chunked: Vec<(usize, String, Lang, Result<Vec<Chunk>>)> =
            futures::stream::iter(entries.iter().enumerate().map(|(idx, path)| {
                let chunker = &self.chunker;
                let tokenizer = Arc::clone(&self.tokenizer);
                async move {
                    let rel_path = path
                        .strip_prefix(root)
                        .unwrap_or(path)
                        .to_string_lossy()
                        .to_string();
                    let lang = classify(path);
                    let outcome = chunk_file(path, &rel_path, lang, chunker, &*tokenizer).await;
                    (idx, rel_path, lang, outcome)
                }
            }))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;
        chunked.sort_by_key(|(idx, ..)| *idx);

        let mut records: Vec<ChunkRecord> = Vec::new();
        for (_, rel_path, lang, outcome) in chunked {
            match outcome {
                Ok(chunks) => {
                    let chunk_count = i64::try_from(chunks.len()).unwrap_or(i64::MAX);
                    let file = self
                        .catalog
                        .create_file(&project.id, &rel_path, lang.id(), chunk_count)
                        .await?;

                    report.files_indexed += 1;
                    report.chunks_created += chunks.len();
                    tracing::debug!(file = %rel_path, chunks = chunks.len(), "file chunked");

                    records.extend(chunks.into_iter().map(|chunk| ChunkRecord {
                        chunk,
                        file_id: file.id.clone(),
                        project_id: project.id.clone(),
                    }));
                }
                Err(e) => {
                    report.errors.push(format!("{rel_path}: {e}"));
                }
            }
        }

        let texts: Vec<String> = records.iter().map(|r| r.chunk.content.clone()).collect();
        let embedded = embed_in_batches(
            self.provider.as_ref(),
            &texts,
            self.config.embed_batch_size,
            dimension,
        )
        .await;
        report.chunks_degraded = embedded.iter().filter(|e| e.degraded).count();

        let points: Vec<VectorPoint> = records
            .iter()
            .zip(embedded)
            .map(|(record, embedding)| VectorPoint {
                id: record.chunk.id.clone(),
                vector: embedding.vector,
                payload: chunk_payload(record, embedding.degraded),
            })
            .collect();

        for batch in points.chunks(self.config.embed_batch_size.max(1)) {
            self.store
                .upsert(&self.config.collection, batch.to_vec())
                .await?;
        }

        self.catalog
            .complete_project(
                &project.id,
                i64::try_from(report.files_indexed).unwrap_or(i64::MAX),
                i64::try_from(report.chunks_created).unwrap_or(i64::MAX),
            )
            .await?;

        report.duration_ms = start.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
        tracing::info!(
            files = report.files_indexed,
            chunks = report.chunks_created,
            degraded = report.chunks_degraded,
            ms = report.duration_ms,
            "ingestion completed"
        );
        Ok(report)
    }

    /// Remove a project: its vector points by filter, then its catalog rows.
    ///
    /// # Errors
    ///
    /// Returns an error if either store fails.
    pub async fn remove_project(&self, project_id: &str) -> Result<()> {
        self.store
            .delete_by_filter(
                &self.config.collection,
                VectorFilter::must_text("project_id", project_id),
            )
            .await?;
        self.catalog.delete_project(project_id).await?;
        Ok(())
    }
}

async fn chunk_file(
    path: &Path,
    rel_path: &str,
    lang: Lang,
    chunker: &Chunker,
    tokenizer: &dyn TokenCounter,
) -> Result<Vec<Chunk>> {
    let content = tokio::fs::read_to_string(path).await?;
    chunker.chunk(&content, lang, rel_path, tokenizer)
}

/// Embed chunk contents batch by batch. A failed batch does not abort the
/// pipeline: its chunks get placeholder zero vectors of the expected
/// dimensionality, marked degraded so downstream consumers can exclude
/// them.
async fn embed_in_batches<P: LlmProvider>(
    provider: &P,
    texts: &[String],
    batch_size: usize,
    dimension: usize,
) -> Vec<EmbeddedVector> {
    let mut out = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        match provider.embed_batch(batch).await {
            Ok(vectors) => out.extend(
                vectors
                    .into_iter()
                    .map(|vector| EmbeddedVector {
                        vector,
                        degraded: false,
                    }),
            ),
            Err(e) => {
                tracing::warn!("embedding batch failed, substituting zero vectors: {e}");
                out.extend(batch.iter().map(|_| EmbeddedVector {
                    vector: vec![0.0; dimension],
                    degraded: true,
                }));
            }
        }
    }
    out
}

fn chunk_payload(record: &ChunkRecord, degraded: bool) -> HashMap<String, serde_json::Value> {
    let c = &record.chunk;
    let mut payload = HashMap::from([
        ("file_path".to_owned(), serde_json::json!(c.file_path)),
        ("language".to_owned(), serde_json::json!(c.language.id())),
        ("kind".to_owned(), serde_json::json!(c.kind.as_str())),
        ("start_line".to_owned(), serde_json::json!(c.start_line)),
        ("end_line".to_owned(), serde_json::json!(c.end_line)),
        ("content".to_owned(), serde_json::json!(c.content)),
        ("token_count".to_owned(), serde_json::json!(c.token_count)),
        ("file_id".to_owned(), serde_json::json!(record.file_id)),
        ("project_id".to_owned(), serde_json::json!(record.project_id)),
        ("degraded".to_owned(), serde_json::json!(degraded)),
    ]);
    if let Some(name) = &c.name {
        payload.insert("name".to_owned(), serde_json::json!(name));
    }
    payload
}
