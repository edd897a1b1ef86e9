//! Documentation generator: retrieve → assemble → complete → persist.

use std::sync::Arc;

use scribe_index::assembler::{ContextBudget, assemble};
use scribe_index::retriever::Retriever;
use scribe_index::tokens::TokenCounter;
use scribe_llm::provider::{LlmProvider, Message};
use scribe_store::catalog::{Catalog, DocumentRecord};

use crate::error::{DocGenError, Result};
use crate::prompt::{SYSTEM_PROMPT, build_query, user_prompt};

/// What to document: the whole file, or one named declaration in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocTarget {
    File,
    Symbol(String),
}

impl DocTarget {
    /// Label stored in the documentation record.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::File => "file",
            Self::Symbol(name) => name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocGenConfig {
    /// Total token budget for retrieved context.
    pub max_context_tokens: usize,
    /// Held back for the response and fixed prompt scaffolding.
    pub reserved_tokens: usize,
}

impl Default for DocGenConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: 4000,
            reserved_tokens: 1000,
        }
    }
}

/// A generated document plus its accounting metadata.
#[derive(Debug, Clone)]
pub struct GeneratedDoc {
    pub document_id: String,
    pub content: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub context_chunks: usize,
    pub generated_at: String,
}

/// Generates documentation for indexed files via RAG.
pub struct DocGenerator<P> {
    retriever: Retriever<P>,
    provider: Arc<P>,
    catalog: Arc<Catalog>,
    tokenizer: Arc<dyn TokenCounter>,
    config: DocGenConfig,
}

impl<P: LlmProvider> DocGenerator<P> {
    #[must_use]
    pub fn new(
        retriever: Retriever<P>,
        provider: Arc<P>,
        catalog: Arc<Catalog>,
        tokenizer: Arc<dyn TokenCounter>,
        config: DocGenConfig,
    ) -> Self {
        Self {
            retriever,
            provider,
            catalog,
            tokenizer,
            config,
        }
    }

    /// Generate documentation for a file (or one of its declarations),
    /// persist the record, and return it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is not indexed under the project, or if
    /// retrieval, assembly, or the completion request fails. A context
    /// truncated by the budget is not an error.
    pub async fn generate(
        &self,
        project_id: &str,
        file_path: &str,
        target: &DocTarget,
    ) -> Result<GeneratedDoc> {
        self.catalog
            .find_file(project_id, file_path)
            .await?
            .ok_or_else(|| DocGenError::FileNotFound(file_path.to_owned()))?;

        let query = build_query(file_path, target);
        let ranked = self.retriever.retrieve(&query, project_id).await?;
        tracing::info!(hits = ranked.len(), file = %file_path, "retrieved context chunks");

        let budget = ContextBudget::new(self.config.max_context_tokens, self.config.reserved_tokens);
        let context = assemble(&ranked, &budget, &*self.tokenizer)?;
        if context.chunks_used < ranked.len() {
            tracing::debug!(
                used = context.chunks_used,
                retrieved = ranked.len(),
                "context truncated to budget"
            );
        }

        let system = Message::system(SYSTEM_PROMPT);
        let user = Message::user(user_prompt(file_path, target, &context.text));
        let prompt_tokens =
            self.tokenizer.count(&system.content)? + self.tokenizer.count(&user.content)?;

        let content = self.provider.chat(&[system, user]).await?;
        let completion_tokens = self.tokenizer.count(&content)?;

        let doc = DocumentRecord {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_owned(),
            file_path: file_path.to_owned(),
            target: target.label().to_owned(),
            content,
            prompt_tokens: i64::try_from(prompt_tokens).unwrap_or(i64::MAX),
            completion_tokens: i64::try_from(completion_tokens).unwrap_or(i64::MAX),
            context_chunks: i64::try_from(context.chunks_used).unwrap_or(i64::MAX),
            generated_at: chrono::Utc::now().to_rfc3339(),
        };
        self.catalog.save_document(&doc).await?;

        Ok(GeneratedDoc {
            document_id: doc.id,
            content: doc.content,
            prompt_tokens,
            completion_tokens,
            context_chunks: context.chunks_used,
            generated_at: doc.generated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use scribe_index::indexer::{Indexer, IndexerConfig};
    use scribe_index::retriever::RetrievalConfig;
    use scribe_index::tokens::HeuristicTokenizer;
    use scribe_llm::mock::MockProvider;
    use scribe_store::in_memory_store::InMemoryVectorStore;

    use super::*;

    async fn ingested_fixture(
        provider: MockProvider,
    ) -> (DocGenerator<MockProvider>, String, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("app.py"),
            "def alpha():\n    return 1\n\ndef beta():\n    return 2\n",
        )
        .unwrap();

        let store: Arc<InMemoryVectorStore> = Arc::new(InMemoryVectorStore::new());
        let catalog = Arc::new(Catalog::new(":memory:").await.unwrap());
        let provider = Arc::new(provider);
        let tokenizer: Arc<HeuristicTokenizer> = Arc::new(HeuristicTokenizer);

        let indexer = Indexer::new(
            store.clone(),
            catalog.clone(),
            provider.clone(),
            tokenizer.clone(),
            IndexerConfig::default(),
        );
        let report = indexer.ingest(dir.path(), "demo").await.unwrap();

        let retriever = Retriever::new(store, provider.clone(), RetrievalConfig::default());
        let generator = DocGenerator::new(
            retriever,
            provider,
            catalog,
            tokenizer,
            DocGenConfig::default(),
        );
        (generator, report.project_id, dir)
    }

    #[tokio::test]
    async fn generate_file_documentation_persists_record() {
        let provider = MockProvider::with_responses(vec!["# app.py\n\nDoes things.".into()]);
        let (generator, project_id, _dir) = ingested_fixture(provider).await;

        let doc = generator
            .generate(&project_id, "app.py", &DocTarget::File)
            .await
            .unwrap();

        assert_eq!(doc.content, "# app.py\n\nDoes things.");
        assert!(doc.context_chunks > 0);
        assert!(doc.prompt_tokens > 0);
        assert!(doc.completion_tokens > 0);

        let saved = generator
            .catalog
            .get_document(&doc.document_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(saved.target, "file");
        assert_eq!(saved.content, doc.content);
    }

    #[tokio::test]
    async fn symbol_target_records_symbol_label() {
        let (generator, project_id, _dir) = ingested_fixture(MockProvider::default()).await;

        let doc = generator
            .generate(&project_id, "app.py", &DocTarget::Symbol("alpha".into()))
            .await
            .unwrap();

        let saved = generator
            .catalog
            .get_document(&doc.document_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(saved.target, "alpha");
    }

    #[tokio::test]
    async fn unknown_file_is_rejected() {
        let (generator, project_id, _dir) = ingested_fixture(MockProvider::default()).await;

        let result = generator
            .generate(&project_id, "missing.py", &DocTarget::File)
            .await;
        assert!(matches!(result, Err(DocGenError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn chat_failure_propagates() {
        let (generator, project_id, _dir) = ingested_fixture(MockProvider::failing_chat()).await;

        let result = generator
            .generate(&project_id, "app.py", &DocTarget::File)
            .await;
        assert!(matches!(result, Err(DocGenError::Llm(_))));
    }
}
