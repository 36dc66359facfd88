//! Recursive type-reference extraction.
//!
//! Turns a tree-sitter type node into a [`TypeRef`]: named types, generic
//! applications, qualified paths, references, tuples, arrays, primitives,
//! the unit type, and function types. Anything else is captured by its raw
//! text so the reference is never silently lost.

use tree_sitter::Node;

use crate::model::TypeRef;
use crate::parser::{node_span, node_text};

/// Node kinds that can appear as a type reference. Used when scanning
/// children of `type_arguments` and `trait_bounds` lists.
pub fn is_type_node(kind: &str) -> bool {
    matches!(
        kind,
        "type_identifier"
            | "scoped_type_identifier"
            | "scoped_identifier"
            | "generic_type"
            | "reference_type"
            | "pointer_type"
            | "tuple_type"
            | "array_type"
            | "primitive_type"
            | "unit_type"
            | "function_type"
            | "dynamic_type"
            | "abstract_type"
            | "bounded_type"
            | "never_type"
    )
}

/// Extract a [`TypeRef`] from a type node.
pub fn extract_type(node: Node, source: &[u8]) -> TypeRef {
    let span = node_span(node);
    match node.kind() {
        "type_identifier" | "primitive_type" | "never_type" => {
            TypeRef::new(node_text(node, source), span)
        }

        // Qualified paths keep their full textual form ("crate::a::Foo") so
        // resolution can branch on the leading segment.
        "scoped_type_identifier" | "scoped_identifier" => {
            TypeRef::new(node_text(node, source), span)
        }

        "generic_type" => {
            let base = node
                .child_by_field_name("type")
                .map(|t| node_text(t, source).to_owned())
                .unwrap_or_else(|| node_text(node, source).to_owned());
            let mut type_ref = TypeRef::new(base, span);
            if let Some(args) = node.child_by_field_name("type_arguments") {
                type_ref.params = extract_type_arguments(args, source);
            }
            type_ref
        }

        // `&T`, `&mut T`, `*const T` are transparent for dependency purposes:
        // the reference is to the pointee.
        "reference_type" | "pointer_type" => match node.child_by_field_name("type") {
            Some(inner) => {
                let mut t = extract_type(inner, source);
                t.span = span;
                t
            }
            None => TypeRef::new(node_text(node, source), span),
        },

        // `dyn Trait` / `impl Trait` reference the trait itself.
        "dynamic_type" | "abstract_type" => {
            let inner = node
                .child_by_field_name("trait")
                .or_else(|| first_type_child(node));
            match inner {
                Some(inner) => {
                    let mut t = extract_type(inner, source);
                    t.span = span;
                    t
                }
                None => TypeRef::new(node_text(node, source), span),
            }
        }

        // `A + B` in type position — take the first bound as the reference.
        "bounded_type" => match first_type_child(node) {
            Some(inner) => {
                let mut t = extract_type(inner, source);
                t.span = span;
                t
            }
            None => TypeRef::new(node_text(node, source), span),
        },

        // Structural types carry a synthetic, unresolvable name; their
        // element types are captured as parameters. Parenthesized names can
        // never collide with path identifiers.
        "tuple_type" => {
            let mut t = TypeRef::new("(tuple)", span);
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if is_type_node(child.kind()) {
                    t.params.push(extract_type(child, source));
                }
            }
            t
        }

        "array_type" => {
            let mut t = TypeRef::new("(array)", span);
            if let Some(element) = node.child_by_field_name("element") {
                t.params.push(extract_type(element, source));
            }
            t
        }

        "unit_type" => TypeRef::new("()", span),

        "function_type" => {
            let mut t = TypeRef::new("(fn)", span);
            if let Some(params) = node.child_by_field_name("parameters") {
                let mut cursor = params.walk();
                for child in params.named_children(&mut cursor) {
                    if is_type_node(child.kind()) {
                        t.params.push(extract_type(child, source));
                    }
                }
            }
            if let Some(ret) = node.child_by_field_name("return_type") {
                t.params.push(extract_type(ret, source));
            }
            t
        }

        // Unknown shape — raw textual form, no parameters.
        _ => TypeRef::new(node_text(node, source), span),
    }
}

/// Extract every type argument of a `type_arguments` node, recursing through
/// associated-type bindings (`Item = T`).
fn extract_type_arguments(args: Node, source: &[u8]) -> Vec<TypeRef> {
    let mut out = Vec::new();
    let mut cursor = args.walk();
    for child in args.named_children(&mut cursor) {
        if is_type_node(child.kind()) {
            out.push(extract_type(child, source));
        } else if child.kind() == "type_binding"
            && let Some(bound) = child.child_by_field_name("type")
        {
            out.push(extract_type(bound, source));
        }
    }
    out
}

/// Extract the bound types of a `trait_bounds` node, skipping lifetimes.
pub fn extract_trait_bounds(bounds: Node, source: &[u8]) -> Vec<TypeRef> {
    let mut out = Vec::new();
    let mut cursor = bounds.walk();
    for child in bounds.named_children(&mut cursor) {
        if is_type_node(child.kind()) {
            out.push(extract_type(child, source));
        } else if child.kind() == "higher_ranked_trait_bound"
            && let Some(inner) = child.child_by_field_name("type")
        {
            out.push(extract_type(inner, source));
        }
    }
    out
}

fn first_type_child<'a>(node: Node<'a>) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .find(|c| is_type_node(c.kind()))
}
