//! Parser adapter over the tree-sitter Rust grammar.
//!
//! The rest of the pipeline treats parse trees as labeled nodes with typed
//! children, fields, and source positions; this module owns the only direct
//! contact with tree-sitter itself.

pub mod calls;
pub mod imports;
pub mod symbols;
pub mod types;

use std::cell::RefCell;

use tree_sitter::{Node, Parser, Tree};

use crate::model::Span;

// One Parser per thread, initialised lazily with the Rust grammar.
thread_local! {
    static PARSER_RS: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        p.set_language(&tree_sitter_rust::LANGUAGE.into()).unwrap();
        p
    });
}

/// Parse Rust source bytes into a tree-sitter tree.
///
/// Returns `None` when tree-sitter fails outright (malformed or truncated
/// input it cannot recover from). Partial trees with embedded error nodes
/// are returned as-is — extraction degrades gracefully over them.
pub fn parse_source(source: &[u8]) -> Option<Tree> {
    PARSER_RS.with(|p| p.borrow_mut().parse(source, None))
}

/// True when the parse failed at the root: the whole file reduced to a
/// single error node. Used to classify the fatal entry-file case.
pub fn root_is_error(tree: &Tree) -> bool {
    tree.root_node().is_error()
}

/// Extract the UTF-8 text of a node from the original source bytes.
pub fn node_text<'a>(node: Node<'a>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

/// The source span of a node (1-based line, 0-based column).
pub fn node_span(node: Node) -> Span {
    let pos = node.start_position();
    Span {
        line: pos.row + 1,
        column: pos.column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_source() {
        let tree = parse_source(b"pub struct Foo;\n").expect("parse should succeed");
        assert_eq!(tree.root_node().kind(), "source_file");
        assert!(!root_is_error(&tree));
    }

    #[test]
    fn test_partial_tree_is_not_root_error() {
        // Recoverable syntax damage: tree-sitter yields a source_file with an
        // embedded error node, not a root error.
        let tree = parse_source(b"pub struct Foo { field: }\n").expect("parse should succeed");
        assert_eq!(tree.root_node().kind(), "source_file");
        assert!(!root_is_error(&tree));
        assert!(tree.root_node().has_error());
    }

    #[test]
    fn test_node_span_is_one_based_line() {
        let source = b"\npub fn f() {}\n";
        let tree = parse_source(source).unwrap();
        let root = tree.root_node();
        let f = root.named_child(0).unwrap();
        assert_eq!(f.kind(), "function_item");
        assert_eq!(node_span(f).line, 2);
        assert_eq!(node_span(f).column, 0);
    }
}
