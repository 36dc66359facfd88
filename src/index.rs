//! Symbol index and name resolution.
//!
//! The index is four maps (types, functions, traits, modules) keyed by fully
//! qualified path, built in one walk over the module tree. Import
//! declarations and type references resolve against it: imports through the
//! base-path table (`crate` / `self` / `super` / std roots / assumed
//! intra-crate), type references through a tiered fallback ending in a
//! sorted-order suffix match.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::Diagnostics;
use crate::graph::node::GraphNode;
use crate::model::{CrateDef, ModuleDef, UseDecl};

/// What kind of symbol an import resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Type,
    Function,
    Trait,
    Module,
}

/// One resolved import: the concrete qualified path, the name it is visible
/// under in the importing module, and the symbol kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImport {
    pub path: String,
    pub local_name: String,
    pub kind: ImportKind,
}

/// Global index of every declared qualified path, one set per symbol
/// category. `BTreeSet` keeps enumeration order sorted and stable.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    pub types: BTreeSet<String>,
    pub functions: BTreeSet<String>,
    pub traits: BTreeSet<String>,
    pub modules: BTreeSet<String>,
}

impl SymbolIndex {
    /// Build the index by walking the entire module tree once.
    pub fn build(krate: &CrateDef) -> Self {
        let mut index = Self::default();
        index.add_module_tree(&krate.root);
        index
    }

    fn add_module_tree(&mut self, module: &ModuleDef) {
        module.walk(&mut |m| {
            self.modules.insert(m.path.clone());
            for s in &m.structs {
                self.types.insert(m.child_path(&s.name));
            }
            for e in &m.enums {
                self.types.insert(m.child_path(&e.name));
            }
            for a in &m.type_aliases {
                self.types.insert(m.child_path(&a.name));
            }
            for t in &m.traits {
                self.traits.insert(m.child_path(&t.name));
            }
            for f in &m.functions {
                self.functions.insert(m.child_path(&f.name));
            }
        });
    }

    /// Category lookup for a fully qualified path.
    pub fn kind_of(&self, path: &str) -> Option<ImportKind> {
        if self.types.contains(path) {
            Some(ImportKind::Type)
        } else if self.functions.contains(path) {
            Some(ImportKind::Function)
        } else if self.traits.contains(path) {
            Some(ImportKind::Trait)
        } else if self.modules.contains(path) {
            Some(ImportKind::Module)
        } else {
            None
        }
    }

    /// Every symbol directly under `base`: full path starts with `base::`
    /// and the remainder has no further `::`. Returned in sorted path order.
    pub fn glob_members(&self, base: &str) -> Vec<(String, ImportKind)> {
        let prefix = format!("{base}::");
        let direct = |path: &String| {
            path.strip_prefix(&prefix)
                .is_some_and(|rest| !rest.contains("::"))
        };

        let mut members: Vec<(String, ImportKind)> = Vec::new();
        for path in self.types.iter().filter(|p| direct(p)) {
            members.push((path.clone(), ImportKind::Type));
        }
        for path in self.functions.iter().filter(|p| direct(p)) {
            members.push((path.clone(), ImportKind::Function));
        }
        for path in self.traits.iter().filter(|p| direct(p)) {
            members.push((path.clone(), ImportKind::Trait));
        }
        for path in self.modules.iter().filter(|p| direct(p)) {
            members.push((path.clone(), ImportKind::Module));
        }
        members.sort_by(|a, b| a.0.cmp(&b.0));
        members
    }

    /// Resolve one flattened `use` declaration to concrete imports.
    ///
    /// Unresolvable entries are counted as omissions and dropped; paths with
    /// a standard-library root produce nothing at all.
    pub fn resolve_use_decl(
        &self,
        decl: &UseDecl,
        current_module: &str,
        diagnostics: &mut Diagnostics,
    ) -> Vec<ResolvedImport> {
        let base = match resolve_base(&decl.segments, current_module) {
            BasePath::External => return Vec::new(),
            BasePath::Internal(base) => base,
        };

        if decl.is_glob {
            return self
                .glob_members(&base)
                .into_iter()
                .map(|(path, kind)| {
                    let local_name = last_segment(&path).to_owned();
                    ResolvedImport {
                        path,
                        local_name,
                        kind,
                    }
                })
                .collect();
        }

        if !decl.items.is_empty() {
            let mut out = Vec::new();
            for item in &decl.items {
                let (path, fallback_local) = if item.name == "self" {
                    (base.clone(), last_segment(&base).to_owned())
                } else {
                    (format!("{base}::{}", item.name), item.name.clone())
                };
                match self.kind_of(&path) {
                    Some(kind) => out.push(ResolvedImport {
                        path,
                        local_name: item.alias.clone().unwrap_or(fallback_local),
                        kind,
                    }),
                    None => {
                        diagnostics.unresolved_imports += 1;
                        diagnostics.note(format!("unresolved import: {path}"));
                    }
                }
            }
            return out;
        }

        // Single path.
        match self.kind_of(&base) {
            Some(kind) => {
                let local_name = decl
                    .alias
                    .clone()
                    .unwrap_or_else(|| last_segment(&base).to_owned());
                vec![ResolvedImport {
                    path: base,
                    local_name,
                    kind,
                }]
            }
            None => {
                diagnostics.unresolved_imports += 1;
                diagnostics.note(format!("unresolved import: {base}"));
                Vec::new()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Base-path resolution
// ---------------------------------------------------------------------------

/// Where an import's leading segment points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BasePath {
    /// A path inside this crate, rooted at `crate`.
    Internal(String),
    /// A standard-library path — no edge is ever emitted for it.
    External,
}

/// Resolve the leading segment of an import path.
///
/// `crate` is kept verbatim, `self` and `super` are rebased on the current
/// module, std roots are external, and anything else is assumed intra-crate
/// (workspace linking revisits those).
pub fn resolve_base(segments: &[String], current_module: &str) -> BasePath {
    let Some(first) = segments.first() else {
        return BasePath::External;
    };

    match first.as_str() {
        "crate" => BasePath::Internal(segments.join("::")),
        "std" | "core" | "alloc" => BasePath::External,
        "self" => {
            let rest = &segments[1..];
            if rest.is_empty() {
                BasePath::Internal(current_module.to_owned())
            } else {
                BasePath::Internal(format!("{current_module}::{}", rest.join("::")))
            }
        }
        "super" => {
            // Chained `super::super::…` pops one level each.
            let mut module = current_module.to_owned();
            let mut idx = 0;
            while idx < segments.len() && segments[idx] == "super" {
                module = parent_module(&module).to_owned();
                idx += 1;
            }
            let rest = &segments[idx..];
            if rest.is_empty() {
                BasePath::Internal(module)
            } else {
                BasePath::Internal(format!("{module}::{}", rest.join("::")))
            }
        }
        _ => BasePath::Internal(format!("crate::{}", segments.join("::"))),
    }
}

fn parent_module(module: &str) -> &str {
    match module.rfind("::") {
        Some(idx) => &module[..idx],
        None => module,
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

// ---------------------------------------------------------------------------
// Type-reference resolution
// ---------------------------------------------------------------------------

/// Primitive type names — treated as `std` names, no edge.
fn is_primitive(name: &str) -> bool {
    matches!(
        name,
        "i8" | "i16"
            | "i32"
            | "i64"
            | "i128"
            | "isize"
            | "u8"
            | "u16"
            | "u32"
            | "u64"
            | "u128"
            | "usize"
            | "f32"
            | "f64"
            | "bool"
            | "char"
            | "str"
            | "()"
            | "!"
    )
}

/// Curated standard-library container and wrapper names — external, no edge.
fn is_std_container(name: &str) -> bool {
    matches!(
        name,
        "String"
            | "Vec"
            | "Option"
            | "Result"
            | "Box"
            | "Rc"
            | "Arc"
            | "Cell"
            | "RefCell"
            | "Mutex"
            | "RwLock"
            | "HashMap"
            | "HashSet"
            | "BTreeMap"
            | "BTreeSet"
            | "VecDeque"
            | "LinkedList"
            | "BinaryHeap"
            | "Cow"
            | "PhantomData"
    )
}

/// The outcome of resolving a type or callee name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeResolution {
    /// Resolved to a node in the current graph.
    Node(String),
    /// A primitive or standard-library name — deliberately no edge.
    External,
    /// Nothing matched; the edge is omitted.
    Unknown,
}

/// Resolve a type reference (or call target) to a node id.
///
/// Fallback order: the module-local import alias table, then
/// `<currentModule>::<name>`, then `crate::<name>`, then the last-resort
/// suffix match over the sorted node map. `Self` resolves through the
/// enclosing impl or trait when one is in scope.
pub fn resolve_type_name(
    raw: &str,
    current_module: &str,
    imports: &BTreeMap<String, String>,
    nodes: &BTreeMap<String, GraphNode>,
    self_ty: Option<&str>,
    diagnostics: &mut Diagnostics,
) -> TypeResolution {
    let mut name = raw.trim();
    if name.is_empty() || name.starts_with('(') {
        return TypeResolution::External; // structural shape, nothing to point at
    }
    if is_primitive(name) || is_std_container(name) {
        return TypeResolution::External;
    }

    let expanded;
    if name == "Self" {
        return match self_ty {
            Some(owner) => TypeResolution::Node(owner.to_owned()),
            None => TypeResolution::Unknown,
        };
    }
    if let Some(rest) = name.strip_prefix("Self::") {
        match self_ty {
            Some(owner) => {
                expanded = format!("{owner}::{rest}");
                name = &expanded;
            }
            None => return TypeResolution::Unknown,
        }
    }

    if name.contains("::") {
        let segments: Vec<String> = name.split("::").map(str::to_owned).collect();
        match segments[0].as_str() {
            "std" | "core" | "alloc" => return TypeResolution::External,
            _ => {}
        }
        if let BasePath::Internal(candidate) = resolve_base(&segments, current_module)
            && nodes.contains_key(&candidate)
        {
            return TypeResolution::Node(candidate);
        }
        // An imported module alias as leading segment: `use crate::a;` then
        // `a::Foo`.
        if let Some(target) = imports.get(&segments[0]) {
            let candidate = format!("{target}::{}", segments[1..].join("::"));
            if nodes.contains_key(&candidate) {
                return TypeResolution::Node(candidate);
            }
        }
        // Qualified but unlocatable — fall through to the bare-name tiers on
        // the last segment.
        name = raw.trim().rsplit("::").next().unwrap_or(name);
        if is_primitive(name) || is_std_container(name) {
            return TypeResolution::External;
        }
    }

    if let Some(target) = imports.get(name)
        && nodes.contains_key(target)
    {
        return TypeResolution::Node(target.clone());
    }

    let local = format!("{current_module}::{name}");
    if nodes.contains_key(&local) {
        return TypeResolution::Node(local);
    }

    let crate_level = format!("crate::{name}");
    if nodes.contains_key(&crate_level) {
        return TypeResolution::Node(crate_level);
    }

    // Last resort: any node whose id ends in `::<name>`, first in sorted-key
    // order. More than one candidate is ambiguous and gets a diagnostic.
    let suffix = format!("::{name}");
    let mut matches = nodes.keys().filter(|k| k.ends_with(&suffix));
    if let Some(first) = matches.next() {
        if matches.next().is_some() {
            diagnostics.ambiguous_matches += 1;
            diagnostics.note(format!(
                "ambiguous suffix match for `{name}` in {current_module}; taking {first}"
            ));
        }
        return TypeResolution::Node(first.clone());
    }

    TypeResolution::Unknown
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
