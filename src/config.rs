use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    pub index: IndexConfig,
    pub store: StoreConfig,
    pub docgen: DocGenSection,
}

#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct IndexConfig {
    pub chunk_size_tokens: usize,
    pub overlap_tokens: usize,
    pub embed_batch_size: usize,
    pub concurrency: usize,
}

#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    pub qdrant_url: String,
    pub catalog_path: String,
}

#[derive(Debug, Deserialize)]
pub struct DocGenSection {
    pub max_context_tokens: usize,
    pub reserved_tokens: usize,
    pub top_k: u64,
    pub score_threshold: f32,
}

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SCRIBE_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("SCRIBE_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("SCRIBE_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("SCRIBE_QDRANT_URL") {
            self.store.qdrant_url = v;
        }
        if let Ok(v) = std::env::var("SCRIBE_CATALOG_PATH") {
            self.store.catalog_path = v;
        }
    }

    fn default() -> Self {
        Self {
            llm: LlmConfig {
                base_url: "https://api.openai.com/v1".into(),
                model: "gpt-4o-mini".into(),
                embedding_model: "text-embedding-3-small".into(),
                max_tokens: 2000,
            },
            index: IndexConfig {
                chunk_size_tokens: 500,
                overlap_tokens: 50,
                embed_batch_size: 16,
                concurrency: 8,
            },
            store: StoreConfig {
                qdrant_url: "http://localhost:6334".into(),
                catalog_path: "./data/scribe.db".into(),
            },
            docgen: DocGenSection {
                max_context_tokens: 4000,
                reserved_tokens: 1000,
                top_k: 10,
                score_threshold: 0.25,
            },
        }
    }
}
