//! Crate-definition data model.
//!
//! The resolver produces one [`CrateDef`] per analyzed crate: a tree of
//! [`ModuleDef`]s whose leaves are the extracted declarations. Everything in
//! this module is plain owned data — nodes reference each other only through
//! qualified-path strings, never through pointers, so the tree serializes
//! directly.

use std::path::PathBuf;

use serde::Serialize;

/// A source position (1-based line, 0-based column), as reported by the
/// tree-sitter grammar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

/// Declaration visibility, decoded from the optional `pub` marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Bare `pub`.
    Public,
    /// No visibility marker.
    Private,
    /// `pub(crate)`.
    Crate,
    /// `pub(super)`.
    Super,
    /// `pub(in path)` — carries the restriction path.
    In(String),
}

impl Visibility {
    /// True for `pub` and `pub(crate)` — the visibilities that expose an item
    /// beyond its own module subtree.
    pub fn is_public(&self) -> bool {
        matches!(self, Visibility::Public | Visibility::Crate)
    }
}

/// The `self` receiver form of a function parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfKind {
    /// Not a receiver parameter.
    None,
    /// `self` by value.
    Value,
    /// `&self`.
    SharedRef,
    /// `&mut self`.
    MutRef,
}

/// A reference to a type as written in source, recursive over generic
/// arguments.
///
/// `name` holds the full textual path for qualified references
/// (`crate::a::Foo`), or the bare identifier otherwise. Unknown syntactic
/// shapes are captured by their raw text with no parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeRef {
    pub name: String,
    /// Filled in by name resolution when the reference maps to a known node.
    pub resolved_path: Option<String>,
    /// Generic type arguments, in source order.
    pub params: Vec<TypeRef>,
    pub span: Span,
}

impl TypeRef {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            resolved_path: None,
            params: Vec::new(),
            span,
        }
    }

    /// The last `::` segment of the reference name.
    pub fn base_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }
}

/// A generic parameter with its declared bounds.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericParam {
    pub name: String,
    pub bounds: Vec<TypeRef>,
}

/// A struct or enum-variant field. Tuple fields have no name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    pub name: Option<String>,
    pub visibility: Visibility,
    pub ty: TypeRef,
}

/// A record type declaration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructDef {
    pub name: String,
    pub visibility: Visibility,
    pub generics: Vec<GenericParam>,
    pub fields: Vec<FieldDef>,
    pub span: Span,
}

/// One variant of a sum type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

/// A sum type declaration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumDef {
    pub name: String,
    pub visibility: Visibility,
    pub generics: Vec<GenericParam>,
    pub variants: Vec<VariantDef>,
    pub span: Span,
}

/// An associated-type declaration inside a trait body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssocTypeDecl {
    pub name: String,
    pub span: Span,
}

/// An interface type declaration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitDef {
    pub name: String,
    pub visibility: Visibility,
    pub generics: Vec<GenericParam>,
    pub supertraits: Vec<TypeRef>,
    pub methods: Vec<FunctionDef>,
    pub assoc_types: Vec<AssocTypeDecl>,
    pub span: Span,
}

/// A call site recorded inside a function body.
///
/// `callee` is the called path for plain calls (`foo`, `a::b::foo`) or the
/// bare method name for method calls. Receivers are not resolved here — the
/// graph builder maps the name to a node later.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSite {
    pub callee: String,
    pub is_method: bool,
    pub span: Span,
}

/// One function parameter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamDef {
    pub name: Option<String>,
    pub ty: Option<TypeRef>,
    pub self_kind: SelfKind,
}

/// A free function, trait method, or impl method.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDef {
    pub name: String,
    pub visibility: Visibility,
    pub generics: Vec<GenericParam>,
    pub params: Vec<ParamDef>,
    pub return_type: Option<TypeRef>,
    pub is_async: bool,
    pub is_const: bool,
    pub is_unsafe: bool,
    pub calls: Vec<CallSite>,
    pub span: Span,
}

/// An `impl` block. When `trait_ref` is present this is a trait
/// implementation and yields a `trait_impl` edge from the self type to the
/// trait.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplDef {
    pub trait_ref: Option<TypeRef>,
    pub self_ty: TypeRef,
    pub generics: Vec<GenericParam>,
    pub methods: Vec<FunctionDef>,
    pub span: Span,
}

/// One explicit item of a brace-list import (`use p::{a, b as c}`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UseItem {
    pub name: String,
    pub alias: Option<String>,
}

/// A `use` declaration, flattened.
///
/// Nested brace groups are split by the extractor into one `UseDecl` per
/// group, so `segments` is always a plain path prefix.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UseDecl {
    pub segments: Vec<String>,
    pub alias: Option<String>,
    pub is_glob: bool,
    pub items: Vec<UseItem>,
    pub visibility: Visibility,
    pub span: Span,
}

impl UseDecl {
    /// The path prefix joined with `::`.
    pub fn joined(&self) -> String {
        self.segments.join("::")
    }

    /// First path segment, or `""` for a degenerate empty declaration.
    pub fn first_segment(&self) -> &str {
        self.segments.first().map(String::as_str).unwrap_or("")
    }
}

/// A `const` item.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstDef {
    pub name: String,
    pub visibility: Visibility,
    pub ty: Option<TypeRef>,
    pub span: Span,
}

/// A `static` item.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticDef {
    pub name: String,
    pub visibility: Visibility,
    pub ty: Option<TypeRef>,
    pub span: Span,
}

/// A `type` alias item. Counts toward a module's type total.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeAliasDef {
    pub name: String,
    pub visibility: Visibility,
    pub ty: Option<TypeRef>,
    pub span: Span,
}

/// One module of the crate: the root (`crate`), a file-backed submodule, or
/// an inline `mod name { … }` block.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDef {
    /// Qualified path, doubling as the module's graph id
    /// (`crate`, `crate::parser`, …).
    pub id: String,
    /// Short name. The root module's name is the literal `crate`.
    pub name: String,
    /// Qualified path (same as `id`).
    pub path: String,
    /// Source file backing this module. Inline modules share their parent's
    /// file.
    pub file: PathBuf,
    /// Position of the `mod` declaration in the parent file; line 1 for the
    /// crate root and for `tests/` modules.
    pub span: Span,
    pub visibility: Visibility,
    pub structs: Vec<StructDef>,
    pub enums: Vec<EnumDef>,
    pub traits: Vec<TraitDef>,
    pub functions: Vec<FunctionDef>,
    pub impls: Vec<ImplDef>,
    pub uses: Vec<UseDecl>,
    pub consts: Vec<ConstDef>,
    pub statics: Vec<StaticDef>,
    pub type_aliases: Vec<TypeAliasDef>,
    pub submodules: Vec<ModuleDef>,
}

impl ModuleDef {
    /// An empty module shell — used both as the starting point for
    /// extraction and as the stub emitted for unreadable or unresolvable
    /// modules.
    pub fn empty(id: impl Into<String>, name: impl Into<String>, file: PathBuf) -> Self {
        let id = id.into();
        Self {
            path: id.clone(),
            id,
            name: name.into(),
            file,
            span: Span { line: 1, column: 0 },
            visibility: Visibility::Private,
            structs: Vec::new(),
            enums: Vec::new(),
            traits: Vec::new(),
            functions: Vec::new(),
            impls: Vec::new(),
            uses: Vec::new(),
            consts: Vec::new(),
            statics: Vec::new(),
            type_aliases: Vec::new(),
            submodules: Vec::new(),
        }
    }

    /// Qualified path of a child declaration of this module.
    pub fn child_path(&self, name: &str) -> String {
        format!("{}::{}", self.path, name)
    }

    /// Depth-first pre-order walk over this module and all submodules,
    /// children in source order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ModuleDef)) {
        visit(self);
        for sub in &self.submodules {
            sub.walk(visit);
        }
    }

    /// Flattened list of this module and all submodules, pre-order.
    pub fn all_modules(&self) -> Vec<&ModuleDef> {
        let mut out = Vec::new();
        self.walk(&mut |m| out.push(m));
        out
    }
}

/// A fully resolved crate: its package name and module tree. The definition
/// exclusively owns the tree it was built from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrateDef {
    /// Package name with hyphens normalized to underscores.
    pub name: String,
    pub root: ModuleDef,
}

/// The analyzed project: a single crate or a workspace of crates.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProjectDef {
    Crate(CrateDef),
    Workspace { crates: Vec<CrateDef> },
}

impl ProjectDef {
    pub fn crates(&self) -> Vec<&CrateDef> {
        match self {
            ProjectDef::Crate(c) => vec![c],
            ProjectDef::Workspace { crates } => crates.iter().collect(),
        }
    }
}
