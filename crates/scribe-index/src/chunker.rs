//! Chunk type and the orchestrator that dispatches per-language chunkers.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::languages::{ChunkStrategy, Lang};
use crate::structural;
use crate::tokens::TokenCounter;
use crate::window;

/// One chunk of source text with position and token metadata. Immutable
/// after construction; downstream enrichment builds new records instead of
/// mutating these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Opaque unique identifier, assigned at creation, never reused.
    pub id: String,
    pub file_path: String,
    pub language: Lang,
    pub content: String,
    pub kind: ChunkKind,
    /// Declaration name; absent for generic blocks and whole-file chunks.
    pub name: Option<String>,
    /// 1-based, inclusive. `start_line <= end_line` always holds.
    pub start_line: usize,
    pub end_line: usize,
    /// Token count of `content`, computed by the tokenizer at finalization.
    pub token_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Function,
    Class,
    Block,
    File,
}

impl ChunkKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Block => "block",
            Self::File => "file",
        }
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Chunk {
    /// Finalize a chunk: materialized content gets its token count from the
    /// tokenizer and a fresh id.
    ///
    /// # Errors
    ///
    /// Returns an error if the tokenizer fails.
    pub(crate) fn finalize(
        file_path: &str,
        language: Lang,
        kind: ChunkKind,
        name: Option<String>,
        start_line: usize,
        end_line: usize,
        content: String,
        tokenizer: &dyn TokenCounter,
    ) -> Result<Self> {
        debug_assert!(start_line >= 1 && start_line <= end_line);
        let token_count = tokenizer.count(&content)?;
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_path: file_path.to_owned(),
            language,
            content,
            kind,
            name,
            start_line,
            end_line,
            token_count,
        })
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }
}

/// Materialize the text of a 1-based inclusive line range.
pub(crate) fn materialize(lines: &[&str], start_line: usize, end_line: usize) -> String {
    lines[start_line - 1..end_line].join("\n")
}

/// Configuration for the generic token-window chunker, the only chunker
/// with explicit size control.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    /// Target upper bound for chunk size in tokens.
    pub chunk_size_tokens: usize,
    /// Requested overlap in tokens. Actual overlap is line-based: the last
    /// `min(3, len)` lines of the previous chunk seed the next one.
    pub overlap_hint: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            chunk_size_tokens: 500,
            overlap_hint: 50,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChunkerConfig {
    pub window: WindowConfig,
}

/// Per-language chunk dispatch with a whole-file fallback guarantee: every
/// non-empty input yields at least one chunk.
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    #[must_use]
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Split `content` into chunks for `language`.
    ///
    /// Structural chunkers apply to their language families; everything
    /// else goes through the token-window chunker. If the selected chunker
    /// finds nothing to split, the whole file becomes a single chunk —
    /// unconditionally, so malformed input degrades instead of failing.
    ///
    /// # Errors
    ///
    /// Returns an error only if the tokenizer fails.
    pub fn chunk(
        &self,
        content: &str,
        language: Lang,
        file_path: &str,
        tokenizer: &dyn TokenCounter,
    ) -> Result<Vec<Chunk>> {
        let chunks = match language.strategy() {
            ChunkStrategy::IndentationScoped => {
                structural::chunk_indentation(content, language, file_path, tokenizer)?
            }
            ChunkStrategy::BraceScoped => {
                structural::chunk_braces(content, language, file_path, tokenizer)?
            }
            ChunkStrategy::Generic => {
                window::chunk_window(content, language, file_path, &self.config.window, tokenizer)?
            }
        };

        if chunks.is_empty() {
            let line_count = content.split('\n').count();
            let fallback = Chunk::finalize(
                file_path,
                language,
                ChunkKind::File,
                None,
                1,
                line_count,
                content.to_owned(),
                tokenizer,
            )?;
            return Ok(vec![fallback]);
        }

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::{FailingTokenizer, HeuristicTokenizer};

    const PYTHON: &str = "def alpha():\n    return 1\n\ndef beta():\n    return 2\n";

    #[test]
    fn dispatches_indentation_chunker_for_python() {
        let chunker = Chunker::default();
        let chunks = chunker
            .chunk(PYTHON, Lang::Python, "app.py", &HeuristicTokenizer)
            .unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].name.as_deref(), Some("alpha"));
        assert_eq!(chunks[1].name.as_deref(), Some("beta"));
    }

    #[test]
    fn fallback_emits_whole_file_chunk() {
        let chunker = Chunker::default();
        let content = "x = 1\ny = 2\n";
        let chunks = chunker
            .chunk(content, Lang::Python, "flat.py", &HeuristicTokenizer)
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, ChunkKind::File);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 3);
        assert_eq!(chunks[0].content, content);
    }

    #[test]
    fn every_chunk_satisfies_invariants() {
        let chunker = Chunker::default();
        let inputs = [
            (PYTHON, Lang::Python, "a.py"),
            ("const f = () => { return 1; }\n", Lang::JavaScript, "a.js"),
            ("fn main() {}\n", Lang::Rust, "a.rs"),
            ("plain text\nwith lines\n", Lang::Text, "a.txt"),
        ];
        for (content, lang, path) in inputs {
            let chunks = chunker.chunk(content, lang, path, &HeuristicTokenizer).unwrap();
            assert!(!chunks.is_empty(), "{path}: no chunks");
            for c in &chunks {
                assert!(c.start_line >= 1 && c.start_line <= c.end_line, "{path}: bad range");
                assert_eq!(
                    c.token_count,
                    HeuristicTokenizer.count(&c.content).unwrap(),
                    "{path}: token count drifted from content"
                );
                assert_eq!(c.file_path, path);
            }
        }
    }

    #[test]
    fn chunk_ids_are_unique() {
        let chunker = Chunker::default();
        let chunks = chunker
            .chunk(PYTHON, Lang::Python, "a.py", &HeuristicTokenizer)
            .unwrap();
        assert_ne!(chunks[0].id, chunks[1].id);
    }

    #[test]
    fn tokenizer_failure_propagates() {
        let chunker = Chunker::default();
        let result = chunker.chunk(PYTHON, Lang::Python, "a.py", &FailingTokenizer);
        assert!(matches!(result, Err(crate::IndexError::Tokenize(_))));
    }

    #[test]
    fn empty_content_still_yields_one_chunk() {
        let chunker = Chunker::default();
        let chunks = chunker
            .chunk("", Lang::Python, "empty.py", &HeuristicTokenizer)
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, ChunkKind::File);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 1);
    }

    #[test]
    fn chunk_line_count() {
        let chunker = Chunker::default();
        let chunks = chunker
            .chunk("def f():\n    pass\n", Lang::Python, "a.py", &HeuristicTokenizer)
            .unwrap();
        assert_eq!(chunks[0].line_count(), chunks[0].end_line - chunks[0].start_line + 1);
    }
}
