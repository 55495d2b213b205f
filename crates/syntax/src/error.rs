use thiserror::Error;

/// Result type for syntax operations
pub type Result<T> = std::result::Result<T, SyntaxError>;

/// Errors raised while building or reading a syntax tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    /// The source does not parse; no partial recovery is attempted
    #[error("Parse error at {line}:{column}: {message}")]
    ParseError {
        line: usize,
        column: usize,
        message: String,
    },

    /// An expression outside the object/array/primitive literal grammar
    #[error("Unsupported literal expression `{kind}`: {snippet}")]
    UnsupportedLiteral { kind: String, snippet: String },

    /// Tree-sitter error
    #[error("Tree-sitter error: {0}")]
    TreeSitterError(String),
}

impl SyntaxError {
    /// Create a parse error
    pub fn parse(line: usize, column: usize, msg: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            column,
            message: msg.into(),
        }
    }

    /// Create an unsupported literal error, keeping a short excerpt of the source
    pub fn unsupported(kind: impl Into<String>, source: &str) -> Self {
        const MAX_SNIPPET_CHARS: usize = 80;
        let snippet = if source.chars().count() > MAX_SNIPPET_CHARS {
            let head: String = source.chars().take(MAX_SNIPPET_CHARS).collect();
            format!("{head}...")
        } else {
            source.to_string()
        };
        Self::UnsupportedLiteral {
            kind: kind.into(),
            snippet,
        }
    }

    /// Create a tree-sitter error
    pub fn tree_sitter(msg: impl Into<String>) -> Self {
        Self::TreeSitterError(msg.into())
    }

    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::ParseError { .. })
    }
}
