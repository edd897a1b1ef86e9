//! Structural chunkers: indentation-scoped (Python-like) and brace-scoped
//! (JS-like) declaration splitting.
//!
//! Both are modeled as explicit state machines scanned over lines, with the
//! open block held as a line-index range into the source; content is only
//! materialized when a block closes.

use std::sync::LazyLock;

use regex::Regex;

use crate::chunker::{Chunk, ChunkKind, materialize};
use crate::error::Result;
use crate::languages::Lang;
use crate::tokens::TokenCounter;

static DEF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*def\s+(\w+)").expect("valid regex"));
static CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*class\s+(\w+)").expect("valid regex"));

static SIGNATURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bfunction\s+(\w+)|const\s+(\w+)\s*=\s*\(|(\w+)\s*:\s*\(.*\)\s*=>")
        .expect("valid regex")
});
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"function\s+(\w+)|const\s+(\w+)\s*=|(\w+)\s*:").expect("valid regex"));

/// Scan state for the indentation chunker.
enum IndentState {
    Idle,
    Accumulating {
        kind: ChunkKind,
        name: String,
        start_line: usize,
        decl_indent: usize,
    },
}

/// Split indentation-scoped code into declaration-level chunks.
///
/// Only the outermost declaration in a contiguous stretch opens a chunk;
/// nested declarations stay inside the enclosing block. Top-level lines
/// between blocks belong to no chunk.
pub(crate) fn chunk_indentation(
    content: &str,
    language: Lang,
    file_path: &str,
    tokenizer: &dyn TokenCounter,
) -> Result<Vec<Chunk>> {
    if content.is_empty() {
        return Ok(Vec::new());
    }

    let lines: Vec<&str> = content.split('\n').collect();
    let mut chunks = Vec::new();
    let mut state = IndentState::Idle;

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        let decl = parse_declaration(line, trimmed);

        state = match (state, decl) {
            (IndentState::Idle, None) => IndentState::Idle,
            (IndentState::Idle, Some((kind, name, decl_indent))) => IndentState::Accumulating {
                kind,
                name,
                start_line: line_no,
                decl_indent,
            },
            (
                IndentState::Accumulating {
                    kind,
                    name,
                    start_line,
                    ..
                },
                Some((new_kind, new_name, decl_indent)),
            ) => {
                chunks.push(close_block(
                    &lines, file_path, language, kind, name, start_line,
                    line_no - 1, tokenizer,
                )?);
                IndentState::Accumulating {
                    kind: new_kind,
                    name: new_name,
                    start_line: line_no,
                    decl_indent,
                }
            }
            (
                IndentState::Accumulating {
                    kind,
                    name,
                    start_line,
                    decl_indent,
                },
                None,
            ) => {
                // Blank lines get an effective indent one past the
                // declaration so they never terminate a block on their own.
                let effective_indent = if trimmed.is_empty() {
                    decl_indent + 1
                } else {
                    indent_width(line)
                };

                if !trimmed.is_empty() && effective_indent <= decl_indent {
                    chunks.push(close_block(
                        &lines, file_path, language, kind, name, start_line,
                        line_no - 1, tokenizer,
                    )?);
                    // The dedented line itself becomes top-level content
                    // outside any chunk.
                    IndentState::Idle
                } else {
                    IndentState::Accumulating {
                        kind,
                        name,
                        start_line,
                        decl_indent,
                    }
                }
            }
        };
    }

    if let IndentState::Accumulating {
        kind,
        name,
        start_line,
        ..
    } = state
    {
        chunks.push(close_block(
            &lines,
            file_path,
            language,
            kind,
            name,
            start_line,
            lines.len(),
            tokenizer,
        )?);
    }

    Ok(chunks)
}

fn parse_declaration(line: &str, trimmed: &str) -> Option<(ChunkKind, String, usize)> {
    if trimmed.starts_with("def ") {
        let name = capture_name(&DEF_RE, line).unwrap_or_else(|| "unknown".to_owned());
        Some((ChunkKind::Function, name, indent_width(line)))
    } else if trimmed.starts_with("class ") {
        let name = capture_name(&CLASS_RE, line).unwrap_or_else(|| "unknown".to_owned());
        Some((ChunkKind::Class, name, indent_width(line)))
    } else {
        None
    }
}

fn indent_width(line: &str) -> usize {
    line.chars().count() - line.trim_start().chars().count()
}

fn capture_name(re: &Regex, line: &str) -> Option<String> {
    re.captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
}

#[allow(clippy::too_many_arguments)]
fn close_block(
    lines: &[&str],
    file_path: &str,
    language: Lang,
    kind: ChunkKind,
    name: String,
    start_line: usize,
    end_line: usize,
    tokenizer: &dyn TokenCounter,
) -> Result<Chunk> {
    let content = materialize(lines, start_line, end_line);
    Chunk::finalize(
        file_path,
        language,
        kind,
        Some(name),
        start_line,
        end_line,
        content,
        tokenizer,
    )
}

/// Scan state for the brace chunker.
enum BraceState {
    /// Not inside a function; `pending_start` marks the first line of
    /// accumulated top-level content awaiting the next signature.
    Idle { pending_start: Option<usize> },
    InFunction {
        name: Option<String>,
        start_line: usize,
        depth: i64,
    },
}

/// Split brace-scoped code into function-level chunks with a depth counter.
///
/// A function chunk closes only when the depth returns to zero on a line
/// that itself contains a `{`. A signature whose opening brace first
/// appears on a later line therefore never closes here; its accumulation is
/// dropped at end of input and the whole-file fallback covers the file.
pub(crate) fn chunk_braces(
    content: &str,
    language: Lang,
    file_path: &str,
    tokenizer: &dyn TokenCounter,
) -> Result<Vec<Chunk>> {
    if content.is_empty() {
        return Ok(Vec::new());
    }

    let lines: Vec<&str> = content.split('\n').collect();
    let mut chunks = Vec::new();
    let mut state = BraceState::Idle {
        pending_start: None,
    };

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;

        state = match state {
            BraceState::Idle { pending_start } => {
                if SIGNATURE_RE.is_match(line) {
                    if let Some(start) = pending_start {
                        let content = materialize(&lines, start, line_no - 1);
                        chunks.push(Chunk::finalize(
                            file_path,
                            language,
                            ChunkKind::Block,
                            None,
                            start,
                            line_no - 1,
                            content,
                            tokenizer,
                        )?);
                    }

                    let name = extract_signature_name(line);
                    let depth = brace_delta(line);
                    if depth == 0 && line.contains('{') {
                        chunks.push(close_function(
                            &lines, file_path, language, name, line_no, line_no, tokenizer,
                        )?);
                        BraceState::Idle {
                            pending_start: None,
                        }
                    } else {
                        BraceState::InFunction {
                            name,
                            start_line: line_no,
                            depth,
                        }
                    }
                } else {
                    BraceState::Idle {
                        pending_start: pending_start.or(Some(line_no)),
                    }
                }
            }
            BraceState::InFunction {
                name,
                start_line,
                depth,
            } => {
                let depth = depth + brace_delta(line);
                if depth == 0 && line.contains('{') {
                    chunks.push(close_function(
                        &lines, file_path, language, name, start_line, line_no, tokenizer,
                    )?);
                    BraceState::Idle {
                        pending_start: None,
                    }
                } else {
                    BraceState::InFunction {
                        name,
                        start_line,
                        depth,
                    }
                }
            }
        };
    }

    // No end-of-input flush: an unterminated function accumulation (or
    // trailing top-level content) is dropped.
    Ok(chunks)
}

fn extract_signature_name(line: &str) -> Option<String> {
    NAME_RE.captures(line).and_then(|c| {
        c.get(1)
            .or_else(|| c.get(2))
            .or_else(|| c.get(3))
            .map(|m| m.as_str().to_owned())
    })
}

#[allow(clippy::cast_possible_wrap)]
fn brace_delta(line: &str) -> i64 {
    let opens = line.matches('{').count() as i64;
    let closes = line.matches('}').count() as i64;
    opens - closes
}

fn close_function(
    lines: &[&str],
    file_path: &str,
    language: Lang,
    name: Option<String>,
    start_line: usize,
    end_line: usize,
    tokenizer: &dyn TokenCounter,
) -> Result<Chunk> {
    let content = materialize(lines, start_line, end_line);
    Chunk::finalize(
        file_path,
        language,
        ChunkKind::Function,
        name,
        start_line,
        end_line,
        content,
        tokenizer,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::HeuristicTokenizer;

    fn indent(content: &str) -> Vec<Chunk> {
        chunk_indentation(content, Lang::Python, "test.py", &HeuristicTokenizer).unwrap()
    }

    fn braces(content: &str) -> Vec<Chunk> {
        chunk_braces(content, Lang::JavaScript, "test.js", &HeuristicTokenizer).unwrap()
    }

    #[test]
    fn two_top_level_functions_in_file_order() {
        let chunks = indent("def alpha():\n    return 1\n\ndef beta():\n    return 2\n");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].name.as_deref(), Some("alpha"));
        assert_eq!(chunks[0].kind, ChunkKind::Function);
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 3));
        assert_eq!(chunks[1].name.as_deref(), Some("beta"));
        assert_eq!((chunks[1].start_line, chunks[1].end_line), (4, 6));
    }

    #[test]
    fn nested_declarations_stay_in_enclosing_chunk() {
        let source = "class Greeter:\n    def hello(self):\n        pass\n    def bye(self):\n        pass\n";
        let chunks = indent(source);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, ChunkKind::Class);
        assert_eq!(chunks[0].name.as_deref(), Some("Greeter"));
        assert!(chunks[0].content.contains("def hello"));
        assert!(chunks[0].content.contains("def bye"));
    }

    #[test]
    fn dedented_line_belongs_to_no_chunk() {
        let source = "def f():\n    pass\nx = 1\ndef g():\n    pass\n";
        let chunks = indent(source);
        assert_eq!(chunks.len(), 2);
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 2));
        assert_eq!((chunks[1].start_line, chunks[1].end_line), (4, 6));
        assert!(!chunks[0].content.contains("x = 1"));
        assert!(!chunks[1].content.contains("x = 1"));
    }

    #[test]
    fn blank_lines_do_not_terminate_a_block() {
        let source = "def f():\n    a = 1\n\n    b = 2\ndef g():\n    pass\n";
        let chunks = indent(source);
        assert_eq!(chunks.len(), 2);
        // The blank line stays inside f's chunk.
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 4));
        assert!(chunks[0].content.contains("b = 2"));
    }

    #[test]
    fn trailing_blank_lines_stay_in_final_chunk() {
        let source = "def f():\n    pass\n\n";
        let chunks = indent(source);
        assert_eq!(chunks.len(), 1);
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 4));
        assert!(chunks[0].content.ends_with('\n'));
    }

    #[test]
    fn unparseable_declaration_name_defaults_to_unknown() {
        let chunks = indent("def (weird):\n    pass\n");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].name.as_deref(), Some("unknown"));
    }

    #[test]
    fn indentation_empty_input_yields_nothing() {
        assert!(indent("").is_empty());
    }

    #[test]
    fn no_declarations_yields_nothing() {
        assert!(indent("x = 1\ny = 2\n").is_empty());
    }

    #[test]
    fn one_line_arrow_function_closes_same_line() {
        let chunks = braces("const f = () => { return 1; }\n");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, ChunkKind::Function);
        assert_eq!(chunks[0].name.as_deref(), Some("f"));
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 1));
    }

    #[test]
    fn one_line_named_function() {
        let chunks = braces("function add(a, b) { return a + b; }\n");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].name.as_deref(), Some("add"));
    }

    #[test]
    fn colon_arrow_binding_name_extracted() {
        let chunks = braces("handler: (req) => { done(req); }\n");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].name.as_deref(), Some("handler"));
    }

    #[test]
    fn pending_top_level_content_flushes_as_block() {
        let chunks = braces("const x = 1;\nconst y = 2;\nconst f = () => { return x; }\n");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].kind, ChunkKind::Block);
        assert!(chunks[0].name.is_none());
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 2));
        assert_eq!(chunks[1].kind, ChunkKind::Function);
        assert_eq!((chunks[1].start_line, chunks[1].end_line), (3, 3));
    }

    #[test]
    fn closing_brace_on_own_line_never_closes() {
        // Known asymmetry: the terminating line must itself contain a '{'.
        let source = "function add(a, b) {\n  return a + b;\n}\n";
        let chunks = braces(source);
        assert!(chunks.is_empty());
    }

    #[test]
    fn trailing_content_without_signature_is_dropped() {
        assert!(braces("const a = 1;\nconst b = 2;\n").is_empty());
    }

    #[test]
    fn brace_empty_input_yields_nothing() {
        assert!(braces("").is_empty());
    }

    #[test]
    fn structural_chunks_never_overlap_and_stay_ordered() {
        let source = "def a():\n    pass\n\ndef b():\n    pass\n\ndef c():\n    pass\n";
        let chunks = indent(source);
        assert_eq!(chunks.len(), 3);
        for pair in chunks.windows(2) {
            assert!(pair[0].end_line < pair[1].start_line);
        }
    }
}
