//! Generic token-window chunker: greedy line accumulation bounded by a
//! token budget, with trailing-line overlap carried into the next chunk.

use crate::chunker::{Chunk, ChunkKind, WindowConfig, materialize};
use crate::error::Result;
use crate::languages::Lang;
use crate::tokens::TokenCounter;

/// Maximum number of trailing lines duplicated into the next chunk.
const OVERLAP_LINES: usize = 3;

/// Split arbitrary text into token-bounded block chunks.
///
/// The accumulation is tracked as a line-index range into the source; the
/// running token total is the sum of per-line costs, and the finalized
/// chunk recomputes its count from the materialized content. A single line
/// whose own cost exceeds the budget is still included, producing an
/// oversized chunk rather than dropping text.
pub(crate) fn chunk_window(
    content: &str,
    language: Lang,
    file_path: &str,
    config: &WindowConfig,
    tokenizer: &dyn TokenCounter,
) -> Result<Vec<Chunk>> {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut chunks = Vec::new();

    // 0-based index of the first accumulated line, and how many lines the
    // accumulation currently holds (always a contiguous range).
    let mut start = 0usize;
    let mut count = 0usize;
    let mut current_tokens = 0usize;

    for (idx, line) in lines.iter().enumerate() {
        let line_tokens = tokenizer.count(line)?;

        if count > 0 && current_tokens + line_tokens > config.chunk_size_tokens {
            chunks.push(close_block(
                &lines,
                file_path,
                language,
                start + 1,
                start + count,
                tokenizer,
            )?);

            // Seed the next chunk with the tail of the one just closed.
            let overlap = count.min(OVERLAP_LINES);
            start = idx - overlap;
            count = overlap + 1;
            current_tokens = 0;
            for seeded in &lines[start..=idx] {
                current_tokens += tokenizer.count(seeded)?;
            }
        } else {
            if count == 0 {
                start = idx;
            }
            count += 1;
            current_tokens += line_tokens;
        }
    }

    if count > 0 {
        chunks.push(close_block(
            &lines,
            file_path,
            language,
            start + 1,
            start + count,
            tokenizer,
        )?);
    }

    Ok(chunks)
}

fn close_block(
    lines: &[&str],
    file_path: &str,
    language: Lang,
    start_line: usize,
    end_line: usize,
    tokenizer: &dyn TokenCounter,
) -> Result<Chunk> {
    let content = materialize(lines, start_line, end_line);
    Chunk::finalize(
        file_path,
        language,
        ChunkKind::Block,
        None,
        start_line,
        end_line,
        content,
        tokenizer,
    )
}
