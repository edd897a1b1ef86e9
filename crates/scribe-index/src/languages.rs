//! Language classification and chunking strategy dispatch.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Language tag derived from a file extension. Unrecognized extensions map
/// to `Text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Python,
    JavaScript,
    TypeScript,
    Java,
    C,
    Cpp,
    CSharp,
    Go,
    Rust,
    Ruby,
    Php,
    Swift,
    Kotlin,
    Scala,
    R,
    Bash,
    Sql,
    Html,
    Css,
    Scss,
    Vue,
    Markdown,
    Text,
}

/// How a language gets chunked. Resolved once per file by the classifier;
/// the `Generic` variant is the fallback with explicit size control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    /// Block membership determined by leading whitespace depth.
    IndentationScoped,
    /// Brace-delimited function bodies tracked with a depth counter.
    BraceScoped,
    /// Greedy token-window accumulation with trailing-line overlap.
    Generic,
}

impl Lang {
    /// Identifier used in vector payloads and the catalog.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Java => "java",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::CSharp => "csharp",
            Self::Go => "go",
            Self::Rust => "rust",
            Self::Ruby => "ruby",
            Self::Php => "php",
            Self::Swift => "swift",
            Self::Kotlin => "kotlin",
            Self::Scala => "scala",
            Self::R => "r",
            Self::Bash => "bash",
            Self::Sql => "sql",
            Self::Html => "html",
            Self::Css => "css",
            Self::Scss => "scss",
            Self::Vue => "vue",
            Self::Markdown => "markdown",
            Self::Text => "text",
        }
    }

    /// Chunking strategy for this language.
    #[must_use]
    pub fn strategy(self) -> ChunkStrategy {
        match self {
            Self::Python => ChunkStrategy::IndentationScoped,
            Self::JavaScript | Self::TypeScript => ChunkStrategy::BraceScoped,
            _ => ChunkStrategy::Generic,
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Classify a path by its extension, case-insensitively. Total: unknown
/// extensions (and extensionless paths) are `Text`.
#[must_use]
pub fn classify(path: &Path) -> Lang {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return Lang::Text;
    };
    match ext.to_ascii_lowercase().as_str() {
        "py" | "pyw" => Lang::Python,
        "js" | "jsx" | "mjs" | "cjs" => Lang::JavaScript,
        "ts" | "tsx" => Lang::TypeScript,
        "java" => Lang::Java,
        "c" | "h" => Lang::C,
        "cpp" | "cc" | "cxx" | "hpp" | "hh" => Lang::Cpp,
        "cs" => Lang::CSharp,
        "go" => Lang::Go,
        "rs" => Lang::Rust,
        "rb" => Lang::Ruby,
        "php" => Lang::Php,
        "swift" => Lang::Swift,
        "kt" | "kts" => Lang::Kotlin,
        "scala" => Lang::Scala,
        "r" => Lang::R,
        "sh" | "bash" => Lang::Bash,
        "sql" => Lang::Sql,
        "html" => Lang::Html,
        "css" => Lang::Css,
        "scss" | "sass" => Lang::Scss,
        "vue" => Lang::Vue,
        "md" | "markdown" => Lang::Markdown,
        _ => Lang::Text,
    }
}

/// Check whether a file should be picked up by ingestion.
#[must_use]
pub fn is_source_file(path: &Path) -> bool {
    const SOURCE_EXTENSIONS: &[&str] = &[
        "py", "pyw", "js", "jsx", "mjs", "cjs", "ts", "tsx", "java", "c", "h", "cpp", "cc", "cxx",
        "hpp", "hh", "cs", "go", "rs", "rb", "php", "swift", "kt", "kts", "scala", "r", "sh",
        "bash", "sql", "html", "css", "scss", "sass", "vue", "json", "yaml", "yml", "xml", "md",
        "markdown", "toml", "txt",
    ];
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}
