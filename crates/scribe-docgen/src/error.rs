#[derive(Debug, thiserror::Error)]
pub enum DocGenError {
    #[error("file not found in project: {0}")]
    FileNotFound(String),

    #[error(transparent)]
    Index(#[from] scribe_index::IndexError),

    #[error("catalog error: {0}")]
    Store(#[from] scribe_store::StoreError),

    #[error("LLM error: {0}")]
    Llm(#[from] scribe_llm::LlmError),
}

pub type Result<T> = std::result::Result<T, DocGenError>;
