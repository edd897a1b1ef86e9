//! Code chunking and context assembly for the scribe RAG pipeline.
//!
//! Source files are split into declaration-level chunks by structural
//! chunkers (indentation-scoped and brace-scoped) with a token-window
//! fallback for everything else. Chunks are embedded and stored for
//! retrieval; ranked retrieval results are packed into a token-bounded
//! context string for the generation step.

pub mod assembler;
pub mod chunker;
pub mod error;
pub mod indexer;
pub mod languages;
pub mod retriever;
mod structural;
pub mod tokens;
mod window;

pub use chunker::{Chunk, ChunkKind, Chunker, ChunkerConfig};
pub use error::{IndexError, Result};
pub use tokens::{HeuristicTokenizer, TokenCounter};
