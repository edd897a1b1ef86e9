//! Ranked retrieval of indexed chunks from the vector store.

use std::sync::Arc;

use scribe_llm::provider::LlmProvider;
use scribe_store::VectorStore;
use scribe_store::vector_store::{FieldCondition, FieldValue, ScoredVectorPoint, VectorFilter};

use crate::error::Result;
use crate::indexer::CHUNK_COLLECTION;

/// Retrieval configuration.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub collection: String,
    /// Maximum hits fetched from the store.
    pub top_k: u64,
    /// Minimum cosine similarity to accept.
    pub score_threshold: f32,
    /// Drop chunks whose embedding was defaulted after a batch failure.
    pub exclude_degraded: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            collection: CHUNK_COLLECTION.to_owned(),
            top_k: 10,
            score_threshold: 0.25,
            exclude_degraded: false,
        }
    }
}

/// A retrieved chunk with its relevance score. Results arrive
/// relevance-descending from the store and keep that order.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub file_path: String,
    pub language: String,
    pub kind: String,
    pub name: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    pub token_count: usize,
    pub file_id: String,
    pub project_id: String,
    pub degraded: bool,
    pub score: f32,
}

impl RetrievedChunk {
    fn from_point(point: &ScoredVectorPoint) -> Option<Self> {
        let p = &point.payload;
        let get_str = |key: &str| p.get(key).and_then(|v| v.as_str()).map(str::to_owned);
        let get_usize = |key: &str| {
            p.get(key)
                .and_then(serde_json::Value::as_u64)
                .and_then(|v| usize::try_from(v).ok())
        };

        Some(Self {
            file_path: get_str("file_path")?,
            language: get_str("language")?,
            kind: get_str("kind")?,
            name: get_str("name"),
            start_line: get_usize("start_line")?,
            end_line: get_usize("end_line")?,
            content: get_str("content")?,
            token_count: get_usize("token_count")?,
            file_id: get_str("file_id").unwrap_or_default(),
            project_id: get_str("project_id").unwrap_or_default(),
            degraded: p
                .get("degraded")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false),
            score: point.score,
        })
    }
}

/// Project-scoped semantic retrieval over the chunk collection.
pub struct Retriever<P> {
    store: Arc<dyn VectorStore>,
    provider: Arc<P>,
    config: RetrievalConfig,
}

impl<P: LlmProvider> Retriever<P> {
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>, provider: Arc<P>, config: RetrievalConfig) -> Self {
        Self {
            store,
            provider,
            config,
        }
    }

    /// Retrieve the most relevant chunks for a query within one project.
    ///
    /// The store's relevance-descending ordering is preserved as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if the query embedding or the search fails.
    pub async fn retrieve(&self, query: &str, project_id: &str) -> Result<Vec<RetrievedChunk>> {
        let vector = self.provider.embed(query).await?;

        let mut filter = VectorFilter::must_text("project_id", project_id);
        if self.config.exclude_degraded {
            filter.must_not.push(FieldCondition {
                field: "degraded".into(),
                value: FieldValue::Bool(true),
            });
        }

        let mut hits = self
            .store
            .search(&self.config.collection, vector, self.config.top_k, Some(filter))
            .await?;
        hits.retain(|h| h.score >= self.config.score_threshold);

        Ok(hits.iter().filter_map(RetrievedChunk::from_point).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn point(score: f32, name: Option<&str>) -> ScoredVectorPoint {
        let mut payload: HashMap<String, serde_json::Value> = HashMap::from([
            ("file_path".into(), serde_json::json!("src/app.py")),
            ("language".into(), serde_json::json!("python")),
            ("kind".into(), serde_json::json!("function")),
            ("start_line".into(), serde_json::json!(1)),
            ("end_line".into(), serde_json::json!(4)),
            ("content".into(), serde_json::json!("def f():\n    pass")),
            ("token_count".into(), serde_json::json!(6)),
            ("file_id".into(), serde_json::json!("file-1")),
            ("project_id".into(), serde_json::json!("proj-1")),
            ("degraded".into(), serde_json::json!(false)),
        ]);
        if let Some(n) = name {
            payload.insert("name".into(), serde_json::json!(n));
        }
        ScoredVectorPoint {
            id: "p".into(),
            score,
            payload,
        }
    }

    #[test]
    fn from_point_maps_fields() {
        let chunk = RetrievedChunk::from_point(&point(0.8, Some("f"))).unwrap();
        assert_eq!(chunk.file_path, "src/app.py");
        assert_eq!(chunk.kind, "function");
        assert_eq!(chunk.name.as_deref(), Some("f"));
        assert_eq!((chunk.start_line, chunk.end_line), (1, 4));
        assert!((chunk.score - 0.8).abs() < f32::EPSILON);
        assert!(!chunk.degraded);
    }

    #[test]
    fn from_point_without_name() {
        let chunk = RetrievedChunk::from_point(&point(0.5, None)).unwrap();
        assert!(chunk.name.is_none());
    }

    #[test]
    fn from_point_missing_required_field_is_none() {
        let mut p = point(0.5, None);
        p.payload.remove("content");
        assert!(RetrievedChunk::from_point(&p).is_none());
    }

    #[test]
    fn default_config_uses_chunk_collection() {
        let config = RetrievalConfig::default();
        assert_eq!(config.collection, CHUNK_COLLECTION);
        assert_eq!(config.top_k, 10);
    }
}
