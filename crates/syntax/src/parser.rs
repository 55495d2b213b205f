use crate::error::{Result, SyntaxError};
use tree_sitter::{Node, Parser, Tree};

/// Tree-sitter parser configured for the ECMAScript grammar.
///
/// Not `Sync`: every thread that parses owns its own instance.
pub struct ScriptParser {
    parser: Parser,
}

impl ScriptParser {
    pub fn new() -> Result<Self> {
        let language: tree_sitter::Language = tree_sitter_javascript::LANGUAGE.into();
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| SyntaxError::tree_sitter(format!("Failed to set language: {e}")))?;
        Ok(Self { parser })
    }

    /// Parse a complete script. Any syntax error fails the whole parse.
    pub fn parse(&mut self, source: &str) -> Result<Tree> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| SyntaxError::tree_sitter("Parser returned no tree"))?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(describe_first_error(root, source));
        }
        Ok(tree)
    }
}

fn describe_first_error(root: Node<'_>, source: &str) -> SyntaxError {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            let position = node.start_position();
            let message = if node.is_missing() {
                format!("missing `{}`", node.kind())
            } else {
                let excerpt: String = source
                    .get(node.start_byte()..node.end_byte())
                    .unwrap_or_default()
                    .chars()
                    .take(40)
                    .collect();
                format!("unexpected `{excerpt}`")
            };
            return SyntaxError::parse(position.row + 1, position.column + 1, message);
        }

        // Only descend into subtrees that contain the error.
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                let position = root.start_position();
                return SyntaxError::parse(position.row + 1, position.column + 1, "syntax error");
            }
        }
    }
}
