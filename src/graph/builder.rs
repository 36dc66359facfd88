//! Two-pass construction of the dependency graph from a crate definition.
//!
//! Pass 1 creates nodes: one per module, struct, enum, trait, free function,
//! trait method, and impl method. Impl methods are keyed under the impl's
//! resolved self type (`crate::Widget::new`); when the self type cannot be
//! located in the crate the impl's methods are skipped, and when two impl
//! blocks define the same method name on the same self type the first
//! occurrence wins.
//!
//! Pass 2 emits edges per module, in source order: the `mod` tree itself
//! (`use_import` to each submodule), resolved imports, field and variant
//! types, trait supertraits and bounds, function signatures and call sites,
//! and `trait_impl` edges.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::Diagnostics;
use crate::index::{ResolvedImport, SymbolIndex, TypeResolution, resolve_type_name};
use crate::model::{CrateDef, FunctionDef, ModuleDef, Span, TypeRef};

use super::DepGraph;
use super::PendingRef;
use super::edge::{DependencyKind, Location};
use super::node::{GraphNode, NodeKind};

/// Imports of one module after resolution: the edge list (with declaration
/// spans for provenance) and the local-name alias table.
struct ModuleImports {
    resolved: Vec<(ResolvedImport, Span)>,
    aliases: BTreeMap<String, String>,
}

/// Build the dependency graph for one crate.
pub fn build_graph(
    krate: &CrateDef,
    index: &SymbolIndex,
    diagnostics: &mut Diagnostics,
) -> DepGraph {
    let mut builder = Builder {
        graph: DepGraph::new(),
        diagnostics,
        imports: HashMap::new(),
        impl_owners: HashMap::new(),
        claimed_methods: HashMap::new(),
    };

    let modules = krate.root.all_modules();

    // Imports first: the alias tables feed both impl-owner resolution and
    // edge emission.
    for module in &modules {
        builder.resolve_module_imports(module, index);
    }

    for module in &modules {
        builder.add_declaration_nodes(module);
    }
    for module in &modules {
        builder.add_impl_method_nodes(module);
    }
    for module in &modules {
        builder.emit_module_edges(module);
    }

    builder.graph
}

struct Builder<'d> {
    graph: DepGraph,
    diagnostics: &'d mut Diagnostics,
    /// Module id → resolved imports.
    imports: HashMap<String, ModuleImports>,
    /// (module id, impl index) → resolved self-type id.
    impl_owners: HashMap<(String, usize), String>,
    /// Method node id → (module id, impl index) of the winning impl block.
    claimed_methods: HashMap<String, (String, usize)>,
}

impl Builder<'_> {
    fn resolve_module_imports(&mut self, module: &ModuleDef, index: &SymbolIndex) {
        let mut resolved = Vec::new();
        let mut aliases = BTreeMap::new();
        for decl in &module.uses {
            for import in index.resolve_use_decl(decl, &module.path, self.diagnostics) {
                aliases
                    .entry(import.local_name.clone())
                    .or_insert_with(|| import.path.clone());
                resolved.push((import, decl.span));
            }
        }
        self.imports
            .insert(module.id.clone(), ModuleImports { resolved, aliases });
    }

    // -----------------------------------------------------------------------
    // Pass 1a — declaration nodes
    // -----------------------------------------------------------------------

    fn add_declaration_nodes(&mut self, module: &ModuleDef) {
        let parent = parent_id(&module.path);
        self.graph.add_node(GraphNode::new(
            module.id.clone(),
            module.name.clone(),
            NodeKind::Module,
            parent,
            module.file.clone(),
            module.span.line,
        ));

        for s in &module.structs {
            self.graph.add_node(GraphNode::new(
                module.child_path(&s.name),
                s.name.clone(),
                NodeKind::Struct,
                Some(module.id.clone()),
                module.file.clone(),
                s.span.line,
            ));
        }
        for e in &module.enums {
            self.graph.add_node(GraphNode::new(
                module.child_path(&e.name),
                e.name.clone(),
                NodeKind::Enum,
                Some(module.id.clone()),
                module.file.clone(),
                e.span.line,
            ));
        }
        for t in &module.traits {
            let trait_id = module.child_path(&t.name);
            self.graph.add_node(GraphNode::new(
                trait_id.clone(),
                t.name.clone(),
                NodeKind::Trait,
                Some(module.id.clone()),
                module.file.clone(),
                t.span.line,
            ));
            for m in &t.methods {
                self.graph.add_node(GraphNode::new(
                    format!("{trait_id}::{}", m.name),
                    m.name.clone(),
                    NodeKind::Function,
                    Some(trait_id.clone()),
                    module.file.clone(),
                    m.span.line,
                ));
            }
        }
        for f in &module.functions {
            self.graph.add_node(GraphNode::new(
                module.child_path(&f.name),
                f.name.clone(),
                NodeKind::Function,
                Some(module.id.clone()),
                module.file.clone(),
                f.span.line,
            ));
        }
    }

    // -----------------------------------------------------------------------
    // Pass 1b — impl method nodes
    // -----------------------------------------------------------------------

    fn add_impl_method_nodes(&mut self, module: &ModuleDef) {
        for (impl_idx, impl_def) in module.impls.iter().enumerate() {
            let owner = match resolve_type_name(
                &impl_def.self_ty.name,
                &module.path,
                module_aliases(&self.imports, &module.id),
                &self.graph.nodes,
                None,
                self.diagnostics,
            ) {
                TypeResolution::Node(owner) => owner,
                // Self type outside this crate: the impl's methods are
                // skipped entirely.
                _ => continue,
            };

            self.impl_owners
                .insert((module.id.clone(), impl_idx), owner.clone());

            for method in &impl_def.methods {
                let method_id = format!("{owner}::{}", method.name);
                if self.claimed_methods.contains_key(&method_id) {
                    continue; // first impl block wins
                }
                let created = self.graph.add_node(GraphNode::new(
                    method_id.clone(),
                    method.name.clone(),
                    NodeKind::Function,
                    Some(owner.clone()),
                    module.file.clone(),
                    method.span.line,
                ));
                if created {
                    self.claimed_methods
                        .insert(method_id, (module.id.clone(), impl_idx));
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Pass 2 — edges
    // -----------------------------------------------------------------------

    fn emit_module_edges(&mut self, module: &ModuleDef) {
        let file = module.file.clone();

        // The module tree is itself a dependency: declaring `mod child;`
        // imports the child into the parent's namespace.
        for sub in &module.submodules {
            self.graph.add_edge(
                &module.id,
                &sub.id,
                DependencyKind::UseImport,
                location(&file, sub.span),
            );
        }

        // 1. Resolved use declarations.
        let resolved = self
            .imports
            .get(&module.id)
            .map(|m| m.resolved.clone())
            .unwrap_or_default();
        for (import, span) in resolved {
            self.graph.add_edge(
                &module.id,
                &import.path,
                DependencyKind::UseImport,
                location(&file, span),
            );
        }

        // 2. Struct and enum type references.
        for s in &module.structs {
            let from = module.child_path(&s.name);
            for field in &s.fields {
                self.emit_type_edges(&from, &field.ty, DependencyKind::FieldType, module, None);
            }
            self.emit_generic_bounds(&from, &s.generics, module, None);
        }
        for e in &module.enums {
            let from = module.child_path(&e.name);
            for variant in &e.variants {
                for field in &variant.fields {
                    self.emit_type_edges(&from, &field.ty, DependencyKind::FieldType, module, None);
                }
            }
            self.emit_generic_bounds(&from, &e.generics, module, None);
        }

        // 3. Traits: supertraits, bounds, then methods under the trait id.
        for t in &module.traits {
            let trait_id = module.child_path(&t.name);
            for supertrait in &t.supertraits {
                self.emit_bound_edge(&trait_id, supertrait, module, None);
            }
            self.emit_generic_bounds(&trait_id, &t.generics, module, None);
            for method in &t.methods {
                let method_id = format!("{trait_id}::{}", method.name);
                self.emit_function_edges(&method_id, method, module, Some(&trait_id));
            }
        }

        // 4. Free functions.
        for f in &module.functions {
            let fn_id = module.child_path(&f.name);
            self.emit_function_edges(&fn_id, f, module, None);
        }

        // 5. Impl blocks: trait_impl edge, then methods under the self type.
        for (impl_idx, impl_def) in module.impls.iter().enumerate() {
            let key = (module.id.clone(), impl_idx);
            let Some(owner) = self.impl_owners.get(&key).cloned() else {
                continue;
            };

            if let Some(trait_ref) = &impl_def.trait_ref {
                let resolution = resolve_type_name(
                    &trait_ref.name,
                    &module.path,
                    module_aliases(&self.imports, &module.id),
                    &self.graph.nodes,
                    None,
                    self.diagnostics,
                );
                if let TypeResolution::Node(trait_id) = resolution {
                    self.graph.add_edge(
                        &owner,
                        &trait_id,
                        DependencyKind::TraitImpl,
                        location(&file, trait_ref.span),
                    );
                }
            }

            for method in &impl_def.methods {
                let method_id = format!("{owner}::{}", method.name);
                if self.claimed_methods.get(&method_id) != Some(&key) {
                    continue; // a method of the same name in an earlier impl won
                }
                self.emit_function_edges(&method_id, method, module, Some(&owner));
            }
        }
    }

    /// Parameter, return, bound, and call edges of one function or method.
    fn emit_function_edges(
        &mut self,
        fn_id: &str,
        f: &FunctionDef,
        module: &ModuleDef,
        self_ty: Option<&str>,
    ) {
        if !self.graph.contains(fn_id) {
            return;
        }

        for param in &f.params {
            if let Some(ty) = &param.ty {
                self.emit_type_edges(fn_id, ty, DependencyKind::ParameterType, module, self_ty);
            }
        }
        if let Some(ret) = &f.return_type {
            self.emit_type_edges(fn_id, ret, DependencyKind::ReturnType, module, self_ty);
        }
        self.emit_generic_bounds(fn_id, &f.generics, module, self_ty);

        for call in &f.calls {
            let resolution = resolve_type_name(
                &call.callee,
                &module.path,
                module_aliases(&self.imports, &module.id),
                &self.graph.nodes,
                self_ty,
                self.diagnostics,
            );
            match resolution {
                TypeResolution::Node(target) => {
                    let kind = if call.is_method {
                        DependencyKind::MethodCall
                    } else {
                        DependencyKind::FunctionCall
                    };
                    self.graph
                        .add_edge(fn_id, &target, kind, location(&module.file, call.span));
                }
                TypeResolution::External => {}
                TypeResolution::Unknown => {
                    // Unresolvable callees are pure omission — method names
                    // on external receivers land here constantly, so they
                    // are not even counted.
                }
            }
        }
    }

    fn emit_generic_bounds(
        &mut self,
        from: &str,
        generics: &[crate::model::GenericParam],
        module: &ModuleDef,
        self_ty: Option<&str>,
    ) {
        for param in generics {
            for bound in &param.bounds {
                self.emit_bound_edge(from, bound, module, self_ty);
            }
        }
    }

    fn emit_bound_edge(
        &mut self,
        from: &str,
        bound: &TypeRef,
        module: &ModuleDef,
        self_ty: Option<&str>,
    ) {
        self.resolve_and_edge(from, bound, DependencyKind::TraitBound, module, self_ty);
        for param in &bound.params {
            self.emit_type_edges(from, param, DependencyKind::TraitBound, module, self_ty);
        }
    }

    /// Emit `kind` edges from `from` to every resolvable id in the type
    /// tree, recursing through generic arguments.
    fn emit_type_edges(
        &mut self,
        from: &str,
        ty: &TypeRef,
        kind: DependencyKind,
        module: &ModuleDef,
        self_ty: Option<&str>,
    ) {
        self.resolve_and_edge(from, ty, kind, module, self_ty);
        for param in &ty.params {
            self.emit_type_edges(from, param, kind, module, self_ty);
        }
    }

    fn resolve_and_edge(
        &mut self,
        from: &str,
        ty: &TypeRef,
        kind: DependencyKind,
        module: &ModuleDef,
        self_ty: Option<&str>,
    ) {
        let resolution = resolve_type_name(
            &ty.name,
            &module.path,
            module_aliases(&self.imports, &module.id),
            &self.graph.nodes,
            self_ty,
            self.diagnostics,
        );
        match resolution {
            TypeResolution::Node(target) => {
                self.graph
                    .add_edge(from, &target, kind, location(&module.file, ty.span));
            }
            TypeResolution::External => {}
            TypeResolution::Unknown => {
                self.diagnostics.unresolved_types += 1;
                // Plain single-segment names may belong to another workspace
                // crate; keep them for the linker to retry.
                if !ty.name.contains("::") && self.graph.contains(from) {
                    self.graph.pending.push(PendingRef {
                        from: from.to_owned(),
                        module: module.id.clone(),
                        name: ty.name.clone(),
                        kind,
                        location: location(&module.file, ty.span),
                    });
                }
            }
        }
    }
}

fn parent_id(path: &str) -> Option<String> {
    path.rfind("::").map(|idx| path[..idx].to_owned())
}

/// Alias table of a module, or an empty one. A free function so the borrow
/// of `imports` stays disjoint from the builder's other fields.
fn module_aliases<'m>(
    imports: &'m HashMap<String, ModuleImports>,
    module_id: &str,
) -> &'m BTreeMap<String, String> {
    static EMPTY: BTreeMap<String, String> = BTreeMap::new();
    imports
        .get(module_id)
        .map(|m| &m.aliases)
        .unwrap_or(&EMPTY)
}

fn location(file: &Path, span: Span) -> Location {
    Location {
        file: file.to_path_buf(),
        line: span.line,
        column: span.column,
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::resolver::resolve_crate;
    use std::fs;
    use std::path::Path;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn build_fixture(files: &[(&str, &str)]) -> (DepGraph, Diagnostics) {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "Cargo.toml",
            "[package]\nname = \"fixture\"\nversion = \"0.1.0\"\n",
        );
        for (rel, content) in files {
            write(tmp.path(), rel, content);
        }
        let res = resolve_crate(tmp.path(), &FilterConfig::default()).unwrap();
        let index = SymbolIndex::build(&res.krate);
        let mut diagnostics = res.diagnostics;
        let graph = build_graph(&res.krate, &index, &mut diagnostics);
        (graph, diagnostics)
    }

    fn has_edge(graph: &DepGraph, from: &str, to: &str, kind: DependencyKind) -> bool {
        graph
            .edges
            .iter()
            .any(|e| e.from == from && e.to == to && e.kind == kind)
    }

    /// The two-file scenario: `mod a;` plus `use crate::a::Foo;` yields a
    /// use_import edge to the module and one to the type.
    #[test]
    fn test_two_file_crate_with_one_import() {
        let (graph, _) = build_fixture(&[
            ("src/lib.rs", "mod a;\nuse crate::a::Foo;\n"),
            ("src/a.rs", "pub struct Foo;\n"),
        ]);

        let ids: Vec<&str> = graph.nodes.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["crate", "crate::a", "crate::a::Foo"]);
        assert!(has_edge(&graph, "crate", "crate::a", DependencyKind::UseImport));
        assert!(has_edge(&graph, "crate", "crate::a::Foo", DependencyKind::UseImport));
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.out_degree("crate"), 2);
        assert_eq!(graph.in_degree("crate::a::Foo"), 1);
    }

    #[test]
    fn test_empty_crate_has_one_node_no_edges() {
        let (graph, _) = build_fixture(&[("src/lib.rs", "")]);
        assert_eq!(graph.node_count(), 1);
        assert!(graph.nodes.contains_key("crate"));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_self_import_emits_no_self_edge() {
        let (graph, _) = build_fixture(&[("src/lib.rs", "use self::helper;\npub fn helper() {}\n")]);
        // The `use self::helper` edge goes crate -> crate::helper; no
        // module-to-itself edge may appear.
        assert!(!graph.edges.iter().any(|e| e.from == e.to));
        assert!(has_edge(&graph, "crate", "crate::helper", DependencyKind::UseImport));
    }

    #[test]
    fn test_field_type_edges_recurse_generics() {
        let (graph, _) = build_fixture(&[(
            "src/lib.rs",
            "pub struct Inner;\npub struct Outer { items: Vec<Inner>, pair: (Inner, u32) }\n",
        )]);
        assert!(has_edge(&graph, "crate::Outer", "crate::Inner", DependencyKind::FieldType));
        // Vec and u32 are external: exactly one distinct neighbor.
        assert_eq!(graph.out_degree("crate::Outer"), 1);
        // Two occurrences through two fields.
        let edge = graph
            .edges
            .iter()
            .find(|e| e.from == "crate::Outer")
            .unwrap();
        assert_eq!(edge.count, 2);
        assert_eq!(edge.locations.len(), 2);
    }

    #[test]
    fn test_trait_impl_edge_and_method_nodes() {
        let (graph, _) = build_fixture(&[(
            "src/lib.rs",
            "pub trait Render { fn draw(&self); }\npub struct S;\nimpl Render for S { fn draw(&self) {} }\n",
        )]);
        assert!(has_edge(&graph, "crate::S", "crate::Render", DependencyKind::TraitImpl));
        assert!(graph.nodes.contains_key("crate::S::draw"), "impl method node");
        assert!(graph.nodes.contains_key("crate::Render::draw"), "trait method node");
        assert_eq!(
            graph.nodes["crate::S::draw"].parent.as_deref(),
            Some("crate::S")
        );
    }

    #[test]
    fn test_duplicate_method_first_impl_wins() {
        let (graph, _) = build_fixture(&[(
            "src/lib.rs",
            "pub struct S;\npub struct Arg1;\npub struct Arg2;\nimpl S { fn go(&self, a: Arg1) {} }\nimpl S { fn go(&self, b: Arg2) {} }\n",
        )]);
        // One node; edges only from the first impl's signature.
        assert!(graph.nodes.contains_key("crate::S::go"));
        assert!(has_edge(&graph, "crate::S::go", "crate::Arg1", DependencyKind::ParameterType));
        assert!(!has_edge(&graph, "crate::S::go", "crate::Arg2", DependencyKind::ParameterType));
    }

    #[test]
    fn test_function_signature_and_call_edges() {
        let (graph, _) = build_fixture(&[(
            "src/lib.rs",
            "pub struct In;\npub struct Out;\npub fn helper() {}\npub fn main_fn(x: In) -> Out { helper(); Out }\n",
        )]);
        assert!(has_edge(&graph, "crate::main_fn", "crate::In", DependencyKind::ParameterType));
        assert!(has_edge(&graph, "crate::main_fn", "crate::Out", DependencyKind::ReturnType));
        assert!(has_edge(&graph, "crate::main_fn", "crate::helper", DependencyKind::FunctionCall));
    }

    #[test]
    fn test_method_call_edge_via_suffix_match() {
        let (graph, _) = build_fixture(&[(
            "src/lib.rs",
            "pub struct Engine;\nimpl Engine { pub fn start(&self) {} }\npub fn run(e: Engine) { e.start(); }\n",
        )]);
        assert!(has_edge(&graph, "crate::run", "crate::Engine::start", DependencyKind::MethodCall));
    }

    #[test]
    fn test_trait_bound_edges() {
        let (graph, _) = build_fixture(&[(
            "src/lib.rs",
            "pub trait Codec {}\npub fn encode<T: Codec>(value: T) {}\npub struct Holder<C: Codec> { c: C }\n",
        )]);
        assert!(has_edge(&graph, "crate::encode", "crate::Codec", DependencyKind::TraitBound));
        assert!(has_edge(&graph, "crate::Holder", "crate::Codec", DependencyKind::TraitBound));
    }

    #[test]
    fn test_supertrait_cycle_appears_in_graph() {
        let (graph, _) = build_fixture(&[(
            "src/lib.rs",
            "pub trait A: B {}\npub trait B: A {}\n",
        )]);
        assert!(has_edge(&graph, "crate::A", "crate::B", DependencyKind::TraitBound));
        assert!(has_edge(&graph, "crate::B", "crate::A", DependencyKind::TraitBound));
    }

    #[test]
    fn test_glob_import_emits_one_edge_per_member() {
        let (graph, _) = build_fixture(&[
            ("src/lib.rs", "mod m;\nuse crate::m::*;\n"),
            ("src/m.rs", "pub struct X;\npub struct Y;\npub struct Z;\n"),
        ]);
        for target in ["crate::m::X", "crate::m::Y", "crate::m::Z"] {
            assert!(has_edge(&graph, "crate", target, DependencyKind::UseImport));
        }
        // Plus the mod-declaration edge.
        assert!(has_edge(&graph, "crate", "crate::m", DependencyKind::UseImport));
    }

    #[test]
    fn test_glob_of_empty_module_adds_no_edges() {
        let (graph, diag) = build_fixture(&[
            ("src/lib.rs", "mod empty;\nuse crate::empty::*;\n"),
            ("src/empty.rs", ""),
        ]);
        // Only the mod-declaration edge exists.
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(diag.unresolved_imports, 0);
    }

    #[test]
    fn test_impl_for_external_type_skips_methods() {
        let (graph, _) = build_fixture(&[(
            "src/lib.rs",
            "impl String { fn helper(&self) {} }\n",
        )]);
        assert!(!graph.nodes.keys().any(|k| k.ends_with("::helper")));
    }

    #[test]
    fn test_unresolved_field_type_goes_pending() {
        let (graph, diag) = build_fixture(&[(
            "src/lib.rs",
            "use other_crate::Widget;\npub struct S { w: Widget }\n",
        )]);
        assert_eq!(diag.unresolved_types, 1);
        assert_eq!(graph.pending.len(), 1);
        assert_eq!(graph.pending[0].name, "Widget");
        assert_eq!(graph.pending[0].from, "crate::S");
        assert_eq!(graph.pending[0].kind, DependencyKind::FieldType);
    }

    #[test]
    fn test_inline_module_nodes_and_mod_edges() {
        let (graph, _) = build_fixture(&[(
            "src/lib.rs",
            "pub mod outer { pub struct T; pub mod inner { pub struct U; } }\n",
        )]);
        assert!(graph.nodes.contains_key("crate::outer::inner::U"));
        assert!(has_edge(&graph, "crate", "crate::outer", DependencyKind::UseImport));
        assert!(has_edge(&graph, "crate::outer", "crate::outer::inner", DependencyKind::UseImport));
        assert_eq!(
            graph.nodes["crate::outer"].children,
            vec!["crate::outer::T", "crate::outer::inner"]
        );
    }
}
