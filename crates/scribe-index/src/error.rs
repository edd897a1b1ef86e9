//! Error types for scribe-index.

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// IO error reading source files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tokenizer failure; fatal for the unit being processed.
    #[error("tokenizer failed: {0}")]
    Tokenize(String),

    /// LLM provider error (embedding or completion).
    #[error("LLM error: {0}")]
    Llm(#[from] scribe_llm::LlmError),

    /// Vector store error.
    #[error("vector store error: {0}")]
    VectorStore(#[from] scribe_store::vector_store::VectorStoreError),

    /// Metadata catalog error.
    #[error("catalog error: {0}")]
    Store(#[from] scribe_store::StoreError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic catch-all error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
