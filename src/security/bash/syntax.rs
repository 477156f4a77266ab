//! Grammar-level syntax check using tree-sitter.

use tree_sitter::{Language, Node, Parser};

use crate::security::SecurityError;

fn bash_language() -> Language {
    tree_sitter_bash::LANGUAGE.into()
}

/// Reject strings the bash grammar cannot parse cleanly.
///
/// Runs after the hand scanner as an independent second opinion; any error or
/// missing node is a parse failure.
pub fn validate_syntax(command: &str) -> Result<(), SecurityError> {
    let mut parser = Parser::new();
    parser
        .set_language(&bash_language())
        .map_err(|e| SecurityError::Syntax(format!("bash grammar unavailable: {}", e)))?;

    let Some(tree) = parser.parse(command, None) else {
        return Err(SecurityError::Syntax(command.to_string()));
    };

    let root = tree.root_node();
    if !root.has_error() {
        return Ok(());
    }

    let location = first_error(root)
        .map(|node| {
            let pos = node.start_position();
            format!("line {}, column {}", pos.row + 1, pos.column + 1)
        })
        .unwrap_or_else(|| "unknown location".into());
    Err(SecurityError::Syntax(format!("{} ({})", command, location)))
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}
