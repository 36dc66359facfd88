//! `use` declaration extraction.
//!
//! A single `use` statement may carry nested brace groups; extraction
//! flattens those into one [`UseDecl`] per group so downstream resolution
//! only ever sees a plain path prefix plus an optional item list, glob
//! flag, or alias.

use tree_sitter::Node;

use crate::model::{Span, UseDecl, UseItem, Visibility};
use crate::parser::symbols::extract_visibility;
use crate::parser::{node_span, node_text};

/// Extract all flattened [`UseDecl`]s from one `use_declaration` node.
pub fn extract_use_decl(node: Node, source: &[u8]) -> Vec<UseDecl> {
    let visibility = extract_visibility(node, source);
    let span = node_span(node);

    let mut out = Vec::new();
    if let Some(argument) = node.child_by_field_name("argument") {
        flatten_clause(argument, source, &[], &visibility, span, &mut out);
    }
    out
}

/// Split a path node's text into `::`-separated segments.
fn path_segments(node: Node, source: &[u8]) -> Vec<String> {
    node_text(node, source)
        .split("::")
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect()
}

fn joined(prefix: &[String], tail: Vec<String>) -> Vec<String> {
    let mut segments = prefix.to_vec();
    segments.extend(tail);
    segments
}

/// Recursively flatten a use clause under an accumulated path prefix.
fn flatten_clause(
    node: Node,
    source: &[u8],
    prefix: &[String],
    visibility: &Visibility,
    span: Span,
    out: &mut Vec<UseDecl>,
) {
    match node.kind() {
        // Single path: `use a::b::C;` or a bare `use foo;`.
        "identifier" | "crate" | "self" | "super" | "scoped_identifier" | "metavariable" => {
            out.push(UseDecl {
                segments: joined(prefix, path_segments(node, source)),
                alias: None,
                is_glob: false,
                items: Vec::new(),
                visibility: visibility.clone(),
                span,
            });
        }

        // `use a::b as c;`
        "use_as_clause" => {
            let segments = node
                .child_by_field_name("path")
                .map(|p| joined(prefix, path_segments(p, source)))
                .unwrap_or_else(|| prefix.to_vec());
            let alias = node
                .child_by_field_name("alias")
                .map(|a| node_text(a, source).to_owned());
            out.push(UseDecl {
                segments,
                alias,
                is_glob: false,
                items: Vec::new(),
                visibility: visibility.clone(),
                span,
            });
        }

        // `use a::b::*;`
        "use_wildcard" => {
            let segments = node
                .named_child(0)
                .map(|p| joined(prefix, path_segments(p, source)))
                .unwrap_or_else(|| prefix.to_vec());
            out.push(UseDecl {
                segments,
                alias: None,
                is_glob: true,
                items: Vec::new(),
                visibility: visibility.clone(),
                span,
            });
        }

        // `use a::{…}` — extend the prefix and descend into the list.
        "scoped_use_list" => {
            let segments = node
                .child_by_field_name("path")
                .map(|p| joined(prefix, path_segments(p, source)))
                .unwrap_or_else(|| prefix.to_vec());
            if let Some(list) = node.child_by_field_name("list") {
                flatten_clause(list, source, &segments, visibility, span, out);
            }
        }

        // The brace group itself. Simple entries become items of one decl;
        // nested groups and multi-segment entries split into their own decls.
        "use_list" => {
            let mut items = Vec::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                match child.kind() {
                    "identifier" | "self" => {
                        items.push(UseItem {
                            name: node_text(child, source).to_owned(),
                            alias: None,
                        });
                    }
                    "use_as_clause" => {
                        let path = child.child_by_field_name("path");
                        let alias = child
                            .child_by_field_name("alias")
                            .map(|a| node_text(a, source).to_owned());
                        match path {
                            Some(p) if !node_text(p, source).contains("::") => {
                                items.push(UseItem {
                                    name: node_text(p, source).to_owned(),
                                    alias,
                                });
                            }
                            // `use a::{b::c as d}` — a nested path, so a
                            // separate flattened declaration.
                            _ => flatten_clause(child, source, prefix, visibility, span, out),
                        }
                    }
                    _ => flatten_clause(child, source, prefix, visibility, span, out),
                }
            }
            if !items.is_empty() {
                out.push(UseDecl {
                    segments: prefix.to_vec(),
                    alias: None,
                    is_glob: false,
                    items,
                    visibility: visibility.clone(),
                    span,
                });
            }
        }

        _ => {}
    }
}
