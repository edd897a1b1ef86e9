//! Retrieval-augmented documentation generation: retrieve relevant chunks,
//! pack them into a token budget, and prompt the LLM for Markdown docs.

pub mod error;
pub mod generator;
mod prompt;

pub use error::DocGenError;
pub use generator::{DocGenConfig, DocGenerator, DocTarget, GeneratedDoc};
