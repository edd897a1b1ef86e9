//! Token-budgeted context assembly from ranked retrieval results.

use std::fmt::Write;

use crate::error::Result;
use crate::retriever::RetrievedChunk;
use crate::tokens::TokenCounter;

/// Token budget for an assembled context. `reserved_tokens` holds back room
/// for the response and fixed prompt scaffolding.
#[derive(Debug, Clone, Copy)]
pub struct ContextBudget {
    pub max_tokens: usize,
    pub reserved_tokens: usize,
}

impl ContextBudget {
    #[must_use]
    pub fn new(max_tokens: usize, reserved_tokens: usize) -> Self {
        Self {
            max_tokens,
            reserved_tokens,
        }
    }

    /// Hard ceiling for assembled context tokens.
    #[must_use]
    pub fn available_tokens(&self) -> usize {
        self.max_tokens.saturating_sub(self.reserved_tokens)
    }
}

/// Result of context assembly.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub text: String,
    /// Number of ranked results accepted. Smaller than the input length
    /// when the budget cut the list off; that truncation is valid output,
    /// not an error.
    pub chunks_used: usize,
    pub token_count: usize,
}

/// Pack ranked results into the budget, in the given order.
///
/// The cutoff is a hard prefix truncation: the first block that would
/// exceed the budget stops assembly entirely, preserving the caller's
/// relevance order with no gaps. Identical inputs produce byte-identical
/// output.
///
/// # Errors
///
/// Returns an error only if the tokenizer fails.
pub fn assemble(
    ranked: &[RetrievedChunk],
    budget: &ContextBudget,
    tokenizer: &dyn TokenCounter,
) -> Result<AssembledContext> {
    let available = budget.available_tokens();
    let mut parts: Vec<String> = Vec::new();
    let mut used = 0usize;

    for chunk in ranked {
        let block = render_block(chunk);
        let cost = tokenizer.count(&block)?;
        if used + cost > available {
            break;
        }
        used += cost;
        parts.push(block);
    }

    Ok(AssembledContext {
        chunks_used: parts.len(),
        token_count: used,
        text: parts.join("\n"),
    })
}

/// One formatted context block: a header naming the file (and declaration,
/// when present) followed by the fenced chunk content.
fn render_block(chunk: &RetrievedChunk) -> String {
    let mut block = format!("\n## {}", chunk.file_path);
    if let Some(name) = &chunk.name {
        let _ = write!(block, " - {}: {}", chunk.kind, name);
    }
    let _ = write!(block, "\n```\n{}\n```\n", chunk.content);
    block
}
