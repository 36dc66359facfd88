//! Declaration extraction.
//!
//! Walks one container node (a file root or an inline-module body) and
//! produces a flat record of every top-level declaration in it. The
//! traversal is purely lexical: generic arguments are captured as nested
//! type references but never unified, and receiver types of method calls
//! stay unresolved.

use tree_sitter::Node;

use crate::model::{
    AssocTypeDecl, ConstDef, EnumDef, FieldDef, FunctionDef, GenericParam, ImplDef, ParamDef,
    SelfKind, Span, StaticDef, StructDef, TraitDef, TypeAliasDef, UseDecl, VariantDef, Visibility,
};
use crate::parser::calls::extract_calls;
use crate::parser::imports::extract_use_decl;
use crate::parser::types::{extract_trait_bounds, extract_type, is_type_node};
use crate::parser::{node_span, node_text};

/// A `mod` declaration found in a container.
///
/// `body` is `Some` for inline modules (`mod name { … }`) and `None` for
/// file-backed declarations (`mod name;`). The node borrows from the parse
/// tree, so declarations are consumed while the tree is alive.
pub struct ModDecl<'a> {
    pub name: String,
    pub visibility: Visibility,
    pub body: Option<Node<'a>>,
    /// True when an immediately-preceding attribute mentions both `cfg` and
    /// `test`.
    pub is_cfg_test: bool,
    pub span: Span,
}

/// Every declaration extracted from one container node, in source order.
#[derive(Default)]
pub struct Declarations<'a> {
    pub structs: Vec<StructDef>,
    pub enums: Vec<EnumDef>,
    pub traits: Vec<TraitDef>,
    pub functions: Vec<FunctionDef>,
    pub impls: Vec<ImplDef>,
    pub uses: Vec<UseDecl>,
    pub consts: Vec<ConstDef>,
    pub statics: Vec<StaticDef>,
    pub type_aliases: Vec<TypeAliasDef>,
    pub mods: Vec<ModDecl<'a>>,
}

/// Extract all top-level declarations of `container` — a `source_file` root
/// or the `declaration_list` body of an inline module.
pub fn extract_declarations<'a>(container: Node<'a>, source: &[u8]) -> Declarations<'a> {
    let mut decls = Declarations::default();
    let mut cursor = container.walk();

    for child in container.named_children(&mut cursor) {
        match child.kind() {
            "struct_item" => {
                if let Some(s) = extract_struct(child, source) {
                    decls.structs.push(s);
                }
            }
            "enum_item" => {
                if let Some(e) = extract_enum(child, source) {
                    decls.enums.push(e);
                }
            }
            "trait_item" => {
                if let Some(t) = extract_trait(child, source) {
                    decls.traits.push(t);
                }
            }
            "function_item" => {
                if let Some(f) = extract_function(child, source) {
                    decls.functions.push(f);
                }
            }
            "impl_item" => {
                if let Some(i) = extract_impl(child, source) {
                    decls.impls.push(i);
                }
            }
            "use_declaration" => {
                decls.uses.extend(extract_use_decl(child, source));
            }
            "const_item" => {
                if let Some(name) = name_of(child, source) {
                    decls.consts.push(ConstDef {
                        name,
                        visibility: extract_visibility(child, source),
                        ty: child
                            .child_by_field_name("type")
                            .map(|t| extract_type(t, source)),
                        span: node_span(child),
                    });
                }
            }
            "static_item" => {
                if let Some(name) = name_of(child, source) {
                    decls.statics.push(StaticDef {
                        name,
                        visibility: extract_visibility(child, source),
                        ty: child
                            .child_by_field_name("type")
                            .map(|t| extract_type(t, source)),
                        span: node_span(child),
                    });
                }
            }
            "type_item" => {
                if let Some(name) = name_of(child, source) {
                    decls.type_aliases.push(TypeAliasDef {
                        name,
                        visibility: extract_visibility(child, source),
                        ty: child
                            .child_by_field_name("type")
                            .map(|t| extract_type(t, source)),
                        span: node_span(child),
                    });
                }
            }
            "mod_item" => {
                if let Some(name) = name_of(child, source) {
                    decls.mods.push(ModDecl {
                        name,
                        visibility: extract_visibility(child, source),
                        body: child.child_by_field_name("body"),
                        is_cfg_test: mod_is_cfg_test(child, source),
                        span: node_span(child),
                    });
                }
            }
            _ => {}
        }
    }

    decls
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn name_of(item: Node, source: &[u8]) -> Option<String> {
    item.child_by_field_name("name")
        .map(|n| node_text(n, source).to_owned())
        .filter(|n| !n.is_empty())
}

/// Decode the optional visibility marker preceding a declaration.
///
/// `pub` → public, `pub(crate)` → crate-scoped, `pub(super)` → super-scoped,
/// `pub(in path)` → in-path, `pub(self)` or no marker → private.
pub fn extract_visibility(item: Node, source: &[u8]) -> Visibility {
    let mut cursor = item.walk();
    let marker = item
        .named_children(&mut cursor)
        .find(|c| c.kind() == "visibility_modifier");

    match marker {
        Some(marker) => decode_visibility_text(node_text(marker, source)),
        None => Visibility::Private,
    }
}

/// Generic parameters from an item's `type_parameters` list, merged with any
/// `where` clause bounds on the same names.
fn extract_generics(item: Node, source: &[u8]) -> Vec<GenericParam> {
    let mut generics = Vec::new();

    if let Some(params) = item.child_by_field_name("type_parameters") {
        let mut cursor = params.walk();
        for child in params.named_children(&mut cursor) {
            match child.kind() {
                "type_identifier" => {
                    generics.push(GenericParam {
                        name: node_text(child, source).to_owned(),
                        bounds: Vec::new(),
                    });
                }
                "constrained_type_parameter" => {
                    let name = child
                        .child_by_field_name("left")
                        .map(|l| node_text(l, source).to_owned())
                        .unwrap_or_default();
                    if name.is_empty() || name.starts_with('\'') {
                        continue; // lifetime bound, not a type parameter
                    }
                    let bounds = child
                        .child_by_field_name("bounds")
                        .map(|b| extract_trait_bounds(b, source))
                        .unwrap_or_default();
                    generics.push(GenericParam { name, bounds });
                }
                "optional_type_parameter" => {
                    if let Some(name_node) = child.child_by_field_name("name") {
                        generics.push(GenericParam {
                            name: node_text(name_node, source).to_owned(),
                            bounds: Vec::new(),
                        });
                    }
                }
                "const_parameter" => {
                    if let Some(name_node) = child.child_by_field_name("name") {
                        generics.push(GenericParam {
                            name: node_text(name_node, source).to_owned(),
                            bounds: Vec::new(),
                        });
                    }
                }
                _ => {}
            }
        }
    }

    merge_where_clause(item, source, &mut generics);
    generics
}

/// Fold `where` predicates into the generic list: bounds on an existing
/// parameter are appended to it, bounds on anything else become a synthetic
/// entry so the references are not lost.
fn merge_where_clause(item: Node, source: &[u8], generics: &mut Vec<GenericParam>) {
    let mut cursor = item.walk();
    let Some(where_clause) = item
        .named_children(&mut cursor)
        .find(|c| c.kind() == "where_clause")
    else {
        return;
    };

    let mut wc_cursor = where_clause.walk();
    for predicate in where_clause.named_children(&mut wc_cursor) {
        if predicate.kind() != "where_predicate" {
            continue;
        }
        let left = predicate
            .child_by_field_name("left")
            .map(|l| node_text(l, source).to_owned())
            .unwrap_or_default();
        if left.is_empty() || left.starts_with('\'') {
            continue;
        }
        let bounds = predicate
            .child_by_field_name("bounds")
            .map(|b| extract_trait_bounds(b, source))
            .unwrap_or_default();
        if bounds.is_empty() {
            continue;
        }
        match generics.iter_mut().find(|g| g.name == left) {
            Some(param) => param.bounds.extend(bounds),
            None => generics.push(GenericParam { name: left, bounds }),
        }
    }
}

/// Scan the immediately-preceding siblings of a `mod` item for a
/// `#[cfg(test)]`-style attribute, skipping comments and stopping at the
/// first node that is neither an attribute nor a comment.
fn mod_is_cfg_test(mod_node: Node, source: &[u8]) -> bool {
    let mut current = mod_node.prev_named_sibling();
    while let Some(node) = current {
        match node.kind() {
            "line_comment" | "block_comment" => {}
            "attribute_item" => {
                let text = node_text(node, source);
                if text.contains("cfg") && text.contains("test") {
                    return true;
                }
            }
            _ => break,
        }
        current = node.prev_named_sibling();
    }
    false
}

// ---------------------------------------------------------------------------
// Structs and enums
// ---------------------------------------------------------------------------

/// Fields of a `field_declaration_list` (named fields) or an
/// `ordered_field_declaration_list` (tuple fields).
fn extract_fields(body: Node, source: &[u8]) -> Vec<FieldDef> {
    let mut fields = Vec::new();

    match body.kind() {
        "field_declaration_list" => {
            let mut cursor = body.walk();
            for child in body.named_children(&mut cursor) {
                if child.kind() != "field_declaration" {
                    continue;
                }
                let Some(ty) = child.child_by_field_name("type") else {
                    continue;
                };
                fields.push(FieldDef {
                    name: name_of(child, source),
                    visibility: extract_visibility(child, source),
                    ty: extract_type(ty, source),
                });
            }
        }
        "ordered_field_declaration_list" => {
            // Tuple fields: visibility modifiers and types alternate as
            // direct children; a modifier applies to the next type.
            let mut pending_vis = Visibility::Private;
            let mut cursor = body.walk();
            for child in body.named_children(&mut cursor) {
                if child.kind() == "visibility_modifier" {
                    let text = node_text(child, source);
                    pending_vis = decode_visibility_text(text);
                } else if is_type_node(child.kind()) {
                    fields.push(FieldDef {
                        name: None,
                        visibility: std::mem::replace(&mut pending_vis, Visibility::Private),
                        ty: extract_type(child, source),
                    });
                }
            }
        }
        _ => {}
    }

    fields
}

fn decode_visibility_text(text: &str) -> Visibility {
    let rest = text.trim_start_matches("pub").trim();
    if rest.is_empty() {
        return Visibility::Public;
    }
    let inner = rest.trim_start_matches('(').trim_end_matches(')').trim();
    // `in` is checked first: `pub(in crate::x)` also contains "crate".
    if let Some(path) = inner.strip_prefix("in ") {
        Visibility::In(path.trim().to_owned())
    } else if inner == "crate" {
        Visibility::Crate
    } else if inner == "super" {
        Visibility::Super
    } else if inner == "self" {
        Visibility::Private
    } else {
        Visibility::Public
    }
}

fn extract_struct(item: Node, source: &[u8]) -> Option<StructDef> {
    let name = name_of(item, source)?;
    let fields = item
        .child_by_field_name("body")
        .map(|b| extract_fields(b, source))
        .unwrap_or_default();
    Some(StructDef {
        name,
        visibility: extract_visibility(item, source),
        generics: extract_generics(item, source),
        fields,
        span: node_span(item),
    })
}

fn extract_enum(item: Node, source: &[u8]) -> Option<EnumDef> {
    let name = name_of(item, source)?;
    let mut variants = Vec::new();

    if let Some(body) = item.child_by_field_name("body") {
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            if child.kind() != "enum_variant" {
                continue;
            }
            let Some(variant_name) = name_of(child, source) else {
                continue;
            };
            let fields = child
                .child_by_field_name("body")
                .map(|b| extract_fields(b, source))
                .unwrap_or_default();
            variants.push(VariantDef {
                name: variant_name,
                fields,
            });
        }
    }

    Some(EnumDef {
        name,
        visibility: extract_visibility(item, source),
        generics: extract_generics(item, source),
        variants,
        span: node_span(item),
    })
}

// ---------------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------------

fn extract_self_kind(param: Node, source: &[u8]) -> SelfKind {
    let text = node_text(param, source);
    if text.contains("&mut") {
        SelfKind::MutRef
    } else if text.contains('&') {
        SelfKind::SharedRef
    } else {
        SelfKind::Value
    }
}

fn extract_params(item: Node, source: &[u8]) -> Vec<ParamDef> {
    let Some(params) = item.child_by_field_name("parameters") else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut cursor = params.walk();
    for child in params.named_children(&mut cursor) {
        match child.kind() {
            "self_parameter" => {
                out.push(ParamDef {
                    name: Some("self".to_owned()),
                    ty: None,
                    self_kind: extract_self_kind(child, source),
                });
            }
            "parameter" => {
                let name = child
                    .child_by_field_name("pattern")
                    .map(|p| node_text(p, source).to_owned());
                let ty = child
                    .child_by_field_name("type")
                    .map(|t| extract_type(t, source));
                out.push(ParamDef {
                    name,
                    ty,
                    self_kind: SelfKind::None,
                });
            }
            _ => {}
        }
    }
    out
}

/// Extract a `function_item` or a bodiless `function_signature_item`.
pub fn extract_function(item: Node, source: &[u8]) -> Option<FunctionDef> {
    let name = name_of(item, source)?;

    let modifiers = {
        let mut cursor = item.walk();
        item.named_children(&mut cursor)
            .find(|c| c.kind() == "function_modifiers")
            .map(|m| node_text(m, source).to_owned())
            .unwrap_or_default()
    };

    let calls = item
        .child_by_field_name("body")
        .map(|b| extract_calls(b, source))
        .unwrap_or_default();

    Some(FunctionDef {
        name,
        visibility: extract_visibility(item, source),
        generics: extract_generics(item, source),
        params: extract_params(item, source),
        return_type: item
            .child_by_field_name("return_type")
            .map(|t| extract_type(t, source)),
        is_async: modifiers.contains("async"),
        is_const: modifiers.contains("const"),
        is_unsafe: modifiers.contains("unsafe"),
        calls,
        span: node_span(item),
    })
}

// ---------------------------------------------------------------------------
// Traits and impls
// ---------------------------------------------------------------------------

fn extract_trait(item: Node, source: &[u8]) -> Option<TraitDef> {
    let name = name_of(item, source)?;

    let supertraits = item
        .child_by_field_name("bounds")
        .map(|b| extract_trait_bounds(b, source))
        .unwrap_or_default();

    let mut methods = Vec::new();
    let mut assoc_types = Vec::new();
    if let Some(body) = item.child_by_field_name("body") {
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            match child.kind() {
                "function_item" | "function_signature_item" => {
                    if let Some(f) = extract_function(child, source) {
                        methods.push(f);
                    }
                }
                "associated_type" => {
                    if let Some(assoc_name) = name_of(child, source) {
                        assoc_types.push(AssocTypeDecl {
                            name: assoc_name,
                            span: node_span(child),
                        });
                    }
                }
                _ => {}
            }
        }
    }

    Some(TraitDef {
        name,
        visibility: extract_visibility(item, source),
        generics: extract_generics(item, source),
        supertraits,
        methods,
        assoc_types,
        span: node_span(item),
    })
}

fn extract_impl(item: Node, source: &[u8]) -> Option<ImplDef> {
    let self_ty = item
        .child_by_field_name("type")
        .map(|t| extract_type(t, source))?;

    let trait_ref = item
        .child_by_field_name("trait")
        .map(|t| extract_type(t, source));

    let mut methods = Vec::new();
    if let Some(body) = item.child_by_field_name("body") {
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            if child.kind() == "function_item"
                && let Some(f) = extract_function(child, source)
            {
                methods.push(f);
            }
        }
    }

    Some(ImplDef {
        trait_ref,
        self_ty,
        generics: extract_generics(item, source),
        methods,
        span: node_span(item),
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
