//! Workspace linking.
//!
//! Merges per-crate graphs under a crate-prefixed namespace
//! (`<crateName>::crate::…`) and synthesizes the inter-crate edges that
//! per-crate resolution could not see: `use` declarations whose first
//! segment names a sibling crate, and type references whose unqualified name
//! matches something imported from a sibling crate. Crate names are
//! normalized hyphens-to-underscores when matching import segments.

use std::collections::{BTreeMap, HashMap};

use crate::error::Diagnostics;
use crate::model::CrateDef;

use super::DepGraph;
use super::edge::{DependencyKind, Location};
use super::node::{GraphNode, NodeKind};

/// Merge per-crate graphs into one workspace graph and add cross-crate
/// edges.
pub fn link_workspace(
    members: &[(CrateDef, DepGraph)],
    diagnostics: &mut Diagnostics,
) -> DepGraph {
    let mut merged = DepGraph::new();

    // -----------------------------------------------------------------------
    // Step 1: prefix and merge every per-crate graph, under a crate node.
    // -----------------------------------------------------------------------
    for (krate, graph) in members {
        merged.add_node(GraphNode::new(
            krate.name.clone(),
            krate.name.clone(),
            NodeKind::Crate,
            None,
            krate.root.file.clone(),
            1,
        ));

        for node in graph.nodes.values() {
            let mut copy = node.clone();
            copy.id = prefix(&krate.name, &node.id);
            copy.path = copy.id.clone();
            copy.parent = match &node.parent {
                Some(parent) => Some(prefix(&krate.name, parent)),
                // The per-crate root module hangs off the crate node.
                None => Some(krate.name.clone()),
            };
            copy.children.clear();
            merged.add_node(copy);
        }

        for edge in &graph.edges {
            let from = prefix(&krate.name, &edge.from);
            let to = prefix(&krate.name, &edge.to);
            for location in &edge.locations {
                merged.add_edge(&from, &to, edge.kind, location.clone());
            }
        }
    }

    // -----------------------------------------------------------------------
    // Step 2: cross-crate use_import edges from first-segment crate matches.
    // -----------------------------------------------------------------------
    // (crate name, module id) → imported local name → remote target id.
    let mut remote_imports: HashMap<(String, String), BTreeMap<String, String>> = HashMap::new();

    for (krate, _) in members {
        for module in krate.root.all_modules() {
            let from_id = prefix(&krate.name, &module.id);
            for decl in &module.uses {
                let first = decl.first_segment();
                if matches!(first, "" | "crate" | "self" | "super" | "std" | "core" | "alloc") {
                    continue;
                }
                let target_crate = first.replace('-', "_");
                if target_crate == krate.name
                    || !members.iter().any(|(k, _)| k.name == target_crate)
                {
                    continue;
                }

                let location = Location {
                    file: module.file.clone(),
                    line: decl.span.line,
                    column: decl.span.column,
                };
                let imports_entry = remote_imports
                    .entry((krate.name.clone(), module.id.clone()))
                    .or_default();

                if decl.is_glob {
                    // A glob of a sibling crate points at that crate's root
                    // module. Glob misses are never counted as unresolved,
                    // so nothing to decrement here.
                    let root = format!("{target_crate}::crate");
                    if merged.contains(&root) {
                        merged.add_edge(&from_id, &root, DependencyKind::UseImport, location);
                    }
                    continue;
                }

                if !decl.items.is_empty() {
                    for item in &decl.items {
                        let seg = if item.name == "self" {
                            decl.segments.last().map(String::as_str).unwrap_or(first)
                        } else {
                            item.name.as_str()
                        };
                        if let Some(target) = find_by_last_segment(&merged, &target_crate, seg) {
                            merged.add_edge(
                                &from_id,
                                &target,
                                DependencyKind::UseImport,
                                location.clone(),
                            );
                            let local = item.alias.clone().unwrap_or_else(|| seg.to_owned());
                            imports_entry.insert(local, target);
                            resolved_remote(diagnostics);
                        }
                    }
                    continue;
                }

                let Some(seg) = decl.segments.last() else {
                    continue;
                };
                // `use alpha;` alone imports the crate root module.
                let target = if decl.segments.len() == 1 {
                    let root = format!("{target_crate}::crate");
                    merged.contains(&root).then_some(root)
                } else {
                    find_by_last_segment(&merged, &target_crate, seg)
                };
                if let Some(target) = target {
                    merged.add_edge(&from_id, &target, DependencyKind::UseImport, location);
                    let local = decl.alias.clone().unwrap_or_else(|| seg.clone());
                    imports_entry.insert(local, target);
                    resolved_remote(diagnostics);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Step 3: retry type references that failed per-crate resolution against
    // the names imported from sibling crates.
    // -----------------------------------------------------------------------
    for (krate, graph) in members {
        for pending in &graph.pending {
            let key = (krate.name.clone(), pending.module.clone());
            let Some(target) = remote_imports.get(&key).and_then(|m| m.get(&pending.name)) else {
                continue;
            };
            let from = prefix(&krate.name, &pending.from);
            merged.add_edge(&from, target, pending.kind, pending.location.clone());
            diagnostics.unresolved_types = diagnostics.unresolved_types.saturating_sub(1);
        }
    }

    merged
}

fn prefix(crate_name: &str, id: &str) -> String {
    format!("{crate_name}::{id}")
}

/// An import that per-crate resolution flagged as unresolved turned out to
/// target a sibling crate.
fn resolved_remote(diagnostics: &mut Diagnostics) {
    diagnostics.unresolved_imports = diagnostics.unresolved_imports.saturating_sub(1);
}

/// First node (in sorted-id order) inside `target_crate`'s namespace whose
/// id ends with `::<segment>`.
fn find_by_last_segment(graph: &DepGraph, target_crate: &str, segment: &str) -> Option<String> {
    let ns = format!("{target_crate}::");
    let suffix = format!("::{segment}");
    graph
        .nodes
        .keys()
        .find(|id| id.starts_with(&ns) && id.ends_with(&suffix))
        .cloned()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::graph::builder::build_graph;
    use crate::index::SymbolIndex;
    use crate::resolver::resolve_crate;
    use std::fs;
    use std::path::Path;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn member(root: &Path, rel: &str, name: &str, lib: &str) {
        let dir = root.join(rel);
        write(
            &dir,
            "Cargo.toml",
            &format!("[package]\nname = \"{name}\"\nversion = \"0.1.0\"\n"),
        );
        write(&dir, "src/lib.rs", lib);
    }

    fn link_fixture(
        crates: &[(&str, &str, &str)],
    ) -> (DepGraph, Diagnostics) {
        let tmp = tempfile::tempdir().unwrap();
        let mut members = Vec::new();
        let mut diagnostics = Diagnostics::default();
        for (rel, name, lib) in crates {
            member(tmp.path(), rel, name, lib);
            let res = resolve_crate(&tmp.path().join(rel), &FilterConfig::default()).unwrap();
            diagnostics.merge(res.diagnostics);
            let index = SymbolIndex::build(&res.krate);
            let graph = build_graph(&res.krate, &index, &mut diagnostics);
            members.push((res.krate, graph));
        }
        let merged = link_workspace(&members, &mut diagnostics);
        (merged, diagnostics)
    }

    fn has_edge(graph: &DepGraph, from: &str, to: &str, kind: DependencyKind) -> bool {
        graph
            .edges
            .iter()
            .any(|e| e.from == from && e.to == to && e.kind == kind)
    }

    /// The two-crate scenario: beta consumes alpha's Widget both through a
    /// use declaration and a parameter type.
    #[test]
    fn test_two_crate_workspace_links_import_and_parameter() {
        let (graph, diag) = link_fixture(&[
            ("crates/alpha", "alpha", "pub struct Widget;\n"),
            (
                "crates/beta",
                "beta",
                "use alpha::Widget;\npub fn f(w: Widget) {}\n",
            ),
        ]);

        for id in ["alpha", "alpha::crate", "alpha::crate::Widget", "beta", "beta::crate", "beta::crate::f"] {
            assert!(graph.nodes.contains_key(id), "missing node {id}");
        }
        assert!(has_edge(
            &graph,
            "beta::crate",
            "alpha::crate::Widget",
            DependencyKind::UseImport
        ));
        assert!(has_edge(
            &graph,
            "beta::crate::f",
            "alpha::crate::Widget",
            DependencyKind::ParameterType
        ));
        // Both cross-crate references ended up resolved.
        assert_eq!(diag.unresolved_imports, 0);
        assert_eq!(diag.unresolved_types, 0);
    }

    #[test]
    fn test_hyphenated_crate_name_normalization() {
        let (graph, _) = link_fixture(&[
            ("crates/util-core", "util-core", "pub struct Helper;\n"),
            (
                "crates/app",
                "app",
                "use util_core::Helper;\npub struct S { h: Helper }\n",
            ),
        ]);
        assert!(graph.nodes.contains_key("util_core::crate::Helper"));
        assert!(has_edge(
            &graph,
            "app::crate",
            "util_core::crate::Helper",
            DependencyKind::UseImport
        ));
        assert!(has_edge(
            &graph,
            "app::crate::S",
            "util_core::crate::Helper",
            DependencyKind::FieldType
        ));
    }

    #[test]
    fn test_intra_crate_edges_survive_prefixing() {
        let (graph, _) = link_fixture(&[(
            "crates/solo",
            "solo",
            "pub struct Inner;\npub struct Outer { i: Inner }\n",
        )]);
        assert!(has_edge(
            &graph,
            "solo::crate::Outer",
            "solo::crate::Inner",
            DependencyKind::FieldType
        ));
        assert_eq!(
            graph.nodes["solo::crate"].parent.as_deref(),
            Some("solo")
        );
        assert_eq!(graph.nodes["solo"].children, vec!["solo::crate"]);
    }

    #[test]
    fn test_crate_root_import_via_bare_crate_name() {
        let (graph, _) = link_fixture(&[
            ("crates/alpha", "alpha", "pub struct Widget;\n"),
            ("crates/beta", "beta", "use alpha;\n"),
        ]);
        assert!(has_edge(
            &graph,
            "beta::crate",
            "alpha::crate",
            DependencyKind::UseImport
        ));
    }

    #[test]
    fn test_unmatched_external_crate_stays_unresolved() {
        let (graph, diag) = link_fixture(&[(
            "crates/app",
            "app",
            "use serde::Serialize;\n",
        )]);
        assert!(!graph.edges.iter().any(|e| e.to.starts_with("serde")));
        assert_eq!(diag.unresolved_imports, 1);
    }
}
