//! Call-site extraction from function bodies.

use tree_sitter::Node;

use crate::model::CallSite;
use crate::parser::{node_span, node_text};

/// Record every call expression inside `body`, in source order.
///
/// Plain calls (`foo()`, `a::b::foo()`) carry the called path; method calls
/// (`recv.foo()`) carry the bare method name with `is_method` set. Receiver
/// types are not resolved here.
pub fn extract_calls(body: Node, source: &[u8]) -> Vec<CallSite> {
    let mut calls = Vec::new();
    walk(body, source, &mut calls);
    calls
}

fn walk(node: Node, source: &[u8], calls: &mut Vec<CallSite>) {
    if node.kind() == "call_expression"
        && let Some(function) = node.child_by_field_name("function")
        && let Some(call) = classify_callee(function, source)
    {
        calls.push(call);
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        walk(child, source, calls);
    }
}

fn classify_callee(function: Node, source: &[u8]) -> Option<CallSite> {
    match function.kind() {
        "identifier" | "scoped_identifier" => Some(CallSite {
            callee: node_text(function, source).to_owned(),
            is_method: false,
            span: node_span(function),
        }),
        "field_expression" => {
            let field = function.child_by_field_name("field")?;
            // Only true method calls: `x.foo()`. A call through a
            // function-valued field parses the same way but the field node
            // is still a field_identifier, which is what we record.
            (field.kind() == "field_identifier").then(|| CallSite {
                callee: node_text(field, source).to_owned(),
                is_method: true,
                span: node_span(field),
            })
        }
        // `x.collect::<Vec<_>>()` / `foo::<T>()`
        "generic_function" => {
            let inner = function.child_by_field_name("function")?;
            classify_callee(inner, source)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn calls_of(source: &str) -> Vec<CallSite> {
        let bytes = source.as_bytes();
        let tree = parse_source(bytes).unwrap();
        let root = tree.root_node();
        let func = root.named_child(0).unwrap();
        assert_eq!(func.kind(), "function_item");
        let body = func.child_by_field_name("body").unwrap();
        extract_calls(body, bytes)
    }

    #[test]
    fn test_plain_call() {
        let calls = calls_of("fn f() { helper(); }");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].callee, "helper");
        assert!(!calls[0].is_method);
    }

    #[test]
    fn test_scoped_call_keeps_path() {
        let calls = calls_of("fn f() { crate::a::helper(); }");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].callee, "crate::a::helper");
        assert!(!calls[0].is_method);
    }

    #[test]
    fn test_method_call() {
        let calls = calls_of("fn f(x: Foo) { x.run(); }");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].callee, "run");
        assert!(calls[0].is_method);
    }

    #[test]
    fn test_nested_and_chained_calls() {
        let calls = calls_of("fn f() { outer(inner()).finish(); }");
        let names: Vec<(&str, bool)> = calls
            .iter()
            .map(|c| (c.callee.as_str(), c.is_method))
            .collect();
        assert!(names.contains(&("outer", false)));
        assert!(names.contains(&("inner", false)));
        assert!(names.contains(&("finish", true)));
    }

    #[test]
    fn test_generic_turbofish_call() {
        let calls = calls_of("fn f() { parse::<u32>(); }");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].callee, "parse");
    }

    #[test]
    fn test_macro_invocations_are_not_calls() {
        let calls = calls_of("fn f() { println!(\"x\"); }");
        assert!(calls.is_empty(), "macro invocations are not call sites");
    }
}
