//! Coupling, instability, abstractness, and distance metrics.
//!
//! Per node: afferent/efferent coupling from the adjacency lists, fan
//! counts from edge occurrence sums, instability `Ce / (Ca + Ce)`,
//! abstractness 1 for traits, and distance from the main sequence
//! `|A + I − 1|`. Isolated nodes (no coupling at all) report distance 0
//! rather than the formula value — an unconnected declaration has no
//! position on the main sequence worth flagging.
//!
//! Per module the abstractness formula switches to the trait ratio
//! `traits / (types + traits)` and distance is recomputed from it. Crate
//! level adds totals, averages across modules, and top-10 rankings over
//! non-module nodes.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::Serialize;

use crate::analysis::cycles::Cycle;
use crate::graph::DepGraph;
use crate::graph::node::NodeKind;
use crate::model::{ModuleDef, ProjectDef};

/// Constant stand-in for lines of code of non-module nodes; spans are not
/// mapped back to line counts.
const NODE_LOC_PLACEHOLDER: usize = 10;

/// How many entries each crate-level ranking keeps.
const TOP_LIST_LEN: usize = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetrics {
    /// Afferent coupling: distinct incoming neighbors.
    pub ca: usize,
    /// Efferent coupling: distinct outgoing neighbors.
    pub ce: usize,
    pub instability: f64,
    pub abstractness: f64,
    pub distance: f64,
    /// Occurrence-count sum of incoming edges.
    pub fan_in: usize,
    /// Occurrence-count sum of outgoing edges.
    pub fan_out: usize,
    pub lines_of_code: usize,
    pub complexity: usize,
    pub in_cycle: bool,
    pub cycle_id: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleMetrics {
    #[serde(flatten)]
    pub node: NodeMetrics,
    /// Structs + enums + type aliases.
    pub total_types: usize,
    pub total_traits: usize,
    /// Free functions only.
    pub total_functions: usize,
    pub public_items: usize,
    pub private_items: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedNode {
    pub id: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrateMetrics {
    pub total_modules: usize,
    /// Types plus traits across all modules.
    pub total_types: usize,
    pub total_functions: usize,
    /// Line count summed over distinct module files.
    pub total_lines: usize,
    pub avg_instability: f64,
    pub avg_abstractness: f64,
    pub avg_distance: f64,
    pub cycle_count: usize,
    /// Non-module nodes ranked by `Ca + Ce`.
    pub most_coupled: Vec<RankedNode>,
    /// Non-module nodes ranked by instability.
    pub most_unstable: Vec<RankedNode>,
    /// Non-module nodes ranked by distance.
    pub highest_distance: Vec<RankedNode>,
}

/// The full metrics report: crate aggregate, per-module, per-node.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    #[serde(rename = "crate")]
    pub crate_metrics: CrateMetrics,
    pub modules: BTreeMap<String, ModuleMetrics>,
    pub nodes: BTreeMap<String, NodeMetrics>,
}

/// Compute the metrics report for a finished graph and its cycles.
pub fn compute_metrics(
    graph: &DepGraph,
    cycles: &[Cycle],
    project: &ProjectDef,
) -> MetricsReport {
    let cycle_of: HashMap<&str, usize> = cycles
        .iter()
        .enumerate()
        .flat_map(|(idx, c)| c.nodes.iter().map(move |n| (n.as_str(), idx)))
        .collect();

    let module_defs = collect_module_defs(project);
    let mut loc_cache: HashMap<PathBuf, usize> = HashMap::new();

    let mut nodes: BTreeMap<String, NodeMetrics> = BTreeMap::new();
    let mut modules: BTreeMap<String, ModuleMetrics> = BTreeMap::new();

    for (id, node) in &graph.nodes {
        let ca = graph.in_degree(id);
        let ce = graph.out_degree(id);
        let fan_in = graph.fan_in(id);
        let fan_out = graph.fan_out(id);
        let instability = ratio(ce, ca + ce);

        let lines_of_code = if matches!(node.kind, NodeKind::Module | NodeKind::Crate) {
            file_lines(&mut loc_cache, &node.file)
        } else {
            NODE_LOC_PLACEHOLDER
        };

        let complexity = if node.kind == NodeKind::Function {
            1 + fan_out
        } else {
            1
        };

        let cycle_id = cycle_of.get(id.as_str()).copied();

        match module_defs.get(id.as_str()) {
            // Module nodes: abstractness is the trait ratio.
            Some(def) => {
                let total_types = def.structs.len() + def.enums.len() + def.type_aliases.len();
                let total_traits = def.traits.len();
                let abstractness = ratio(total_traits, total_types + total_traits);
                let distance = main_sequence_distance(abstractness, instability, ca + ce);

                let (public_items, private_items) = visibility_counts(def);
                let metrics = NodeMetrics {
                    ca,
                    ce,
                    instability,
                    abstractness,
                    distance,
                    fan_in,
                    fan_out,
                    lines_of_code,
                    complexity,
                    in_cycle: cycle_id.is_some(),
                    cycle_id,
                };
                modules.insert(
                    id.clone(),
                    ModuleMetrics {
                        node: metrics.clone(),
                        total_types,
                        total_traits,
                        total_functions: def.functions.len(),
                        public_items,
                        private_items,
                    },
                );
                nodes.insert(id.clone(), metrics);
            }
            None => {
                let abstractness = if node.kind == NodeKind::Trait { 1.0 } else { 0.0 };
                let distance = main_sequence_distance(abstractness, instability, ca + ce);
                nodes.insert(
                    id.clone(),
                    NodeMetrics {
                        ca,
                        ce,
                        instability,
                        abstractness,
                        distance,
                        fan_in,
                        fan_out,
                        lines_of_code,
                        complexity,
                        in_cycle: cycle_id.is_some(),
                        cycle_id,
                    },
                );
            }
        }
    }

    let crate_metrics = crate_level(graph, cycles, &modules, &nodes, &loc_cache);

    MetricsReport {
        crate_metrics,
        modules,
        nodes,
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// `|A + I − 1|`, except that a node with no coupling at all sits nowhere on
/// the main sequence and reports 0.
fn main_sequence_distance(abstractness: f64, instability: f64, coupling: usize) -> f64 {
    if coupling == 0 {
        0.0
    } else {
        (abstractness + instability - 1.0).abs()
    }
}

/// Map graph node ids to their module definitions. Workspace graphs carry
/// crate-prefixed ids; single-crate graphs use the definition paths as-is.
fn collect_module_defs(project: &ProjectDef) -> BTreeMap<String, &ModuleDef> {
    let mut map = BTreeMap::new();
    match project {
        ProjectDef::Crate(krate) => {
            for module in krate.root.all_modules() {
                map.insert(module.id.clone(), module);
            }
        }
        ProjectDef::Workspace { crates } => {
            for krate in crates {
                for module in krate.root.all_modules() {
                    map.insert(format!("{}::{}", krate.name, module.id), module);
                }
            }
        }
    }
    map
}

/// Count the module's structs, enums, type aliases, traits, and free
/// functions by visibility. `pub` and `pub(crate)` count as public.
fn visibility_counts(def: &ModuleDef) -> (usize, usize) {
    let mut public = 0usize;
    let mut private = 0usize;
    let mut tally = |is_public: bool| {
        if is_public {
            public += 1;
        } else {
            private += 1;
        }
    };
    for s in &def.structs {
        tally(s.visibility.is_public());
    }
    for e in &def.enums {
        tally(e.visibility.is_public());
    }
    for a in &def.type_aliases {
        tally(a.visibility.is_public());
    }
    for t in &def.traits {
        tally(t.visibility.is_public());
    }
    for f in &def.functions {
        tally(f.visibility.is_public());
    }
    (public, private)
}

fn file_lines(cache: &mut HashMap<PathBuf, usize>, file: &PathBuf) -> usize {
    if let Some(&lines) = cache.get(file) {
        return lines;
    }
    let lines = std::fs::read_to_string(file)
        .map(|s| s.lines().count())
        .unwrap_or(0);
    cache.insert(file.clone(), lines);
    lines
}

fn crate_level(
    graph: &DepGraph,
    cycles: &[Cycle],
    modules: &BTreeMap<String, ModuleMetrics>,
    nodes: &BTreeMap<String, NodeMetrics>,
    loc_cache: &HashMap<PathBuf, usize>,
) -> CrateMetrics {
    let total_modules = modules.len();
    let total_types: usize = modules
        .values()
        .map(|m| m.total_types + m.total_traits)
        .sum();
    let total_functions: usize = modules.values().map(|m| m.total_functions).sum();
    let total_lines: usize = loc_cache.values().sum();

    let module_count = total_modules.max(1) as f64;
    let avg = |f: fn(&ModuleMetrics) -> f64| -> f64 {
        if total_modules == 0 {
            0.0
        } else {
            modules.values().map(f).sum::<f64>() / module_count
        }
    };

    // Rankings cover non-module, non-crate nodes only.
    let ranked: Vec<(&String, &NodeMetrics)> = nodes
        .iter()
        .filter(|(id, _)| {
            graph
                .nodes
                .get(id.as_str())
                .is_some_and(|n| !matches!(n.kind, NodeKind::Module | NodeKind::Crate))
        })
        .collect();

    let top = |value: fn(&NodeMetrics) -> f64| -> Vec<RankedNode> {
        let mut entries: Vec<RankedNode> = ranked
            .iter()
            .map(|(id, m)| RankedNode {
                id: (*id).clone(),
                value: value(m),
            })
            .collect();
        entries.sort_by(|a, b| {
            b.value
                .partial_cmp(&a.value)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        entries.truncate(TOP_LIST_LEN);
        entries
    };

    CrateMetrics {
        total_modules,
        total_types,
        total_functions,
        total_lines,
        avg_instability: avg(|m| m.node.instability),
        avg_abstractness: avg(|m| m.node.abstractness),
        avg_distance: avg(|m| m.node.distance),
        cycle_count: cycles.len(),
        most_coupled: top(|m| (m.ca + m.ce) as f64),
        most_unstable: top(|m| m.instability),
        highest_distance: top(|m| m.distance),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::cycles::detect_cycles;
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

    fn analyzed(files: &[(&str, &str)]) -> (DepGraph, Vec<Cycle>, MetricsReport) {
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
        let cycles = detect_cycles(&graph);
        let project = ProjectDef::Crate(res.krate);
        let metrics = compute_metrics(&graph, &cycles, &project);
        (graph, cycles, metrics)
    }

    #[test]
    fn test_coupling_and_instability_two_file_import() {
        let (_, cycles, metrics) = analyzed(&[
            ("src/lib.rs", "mod a;\nuse crate::a::Foo;\n"),
            ("src/a.rs", "pub struct Foo;\n"),
        ]);
        assert!(cycles.is_empty());
        let root = &metrics.nodes["crate"];
        assert_eq!(root.ce, 2);
        let foo = &metrics.nodes["crate::a::Foo"];
        assert_eq!(foo.ca, 1);
        assert_eq!(foo.instability, 0.0);
    }

    #[test]
    fn test_empty_crate_all_zero() {
        let (graph, cycles, metrics) = analyzed(&[("src/lib.rs", "")]);
        assert_eq!(graph.node_count(), 1);
        assert!(cycles.is_empty());
        let cm = &metrics.crate_metrics;
        assert_eq!(cm.total_modules, 1);
        assert_eq!(cm.avg_instability, 0.0);
        assert_eq!(cm.avg_abstractness, 0.0);
        assert_eq!(cm.avg_distance, 0.0);
        assert_eq!(cm.cycle_count, 0);
    }

    #[test]
    fn test_trait_abstractness_one_concrete_zero() {
        let (_, _, metrics) = analyzed(&[(
            "src/lib.rs",
            "pub trait T { fn go(&self); }\npub struct S;\nimpl T for S { fn go(&self) {} }\n",
        )]);
        assert_eq!(metrics.nodes["crate::T"].abstractness, 1.0);
        assert_eq!(metrics.nodes["crate::S"].abstractness, 0.0);
    }

    #[test]
    fn test_mutual_recursion_cycle_membership() {
        let (_, cycles, metrics) = analyzed(&[
            ("src/lib.rs", "pub mod a;\npub mod b;\n"),
            (
                "src/a.rs",
                "use crate::b::U;\npub struct T { u: Option<Box<U>> }\n",
            ),
            (
                "src/b.rs",
                "use crate::a::T;\npub struct U { t: Option<Box<T>> }\n",
            ),
        ]);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].nodes, vec!["crate::a::T", "crate::b::U"]);
        let t = &metrics.nodes["crate::a::T"];
        let u = &metrics.nodes["crate::b::U"];
        assert!(t.in_cycle && u.in_cycle);
        assert_eq!(t.cycle_id, u.cycle_id);
        assert_eq!(t.cycle_id, Some(0));
        assert!(!metrics.nodes["crate"].in_cycle);
    }

    #[test]
    fn test_module_metrics_counts_and_abstractness() {
        let (_, _, metrics) = analyzed(&[(
            "src/lib.rs",
            "pub struct A;\nstruct B;\npub enum E { X }\npub type Al = A;\npub trait Tr {}\npub fn f() {}\nfn g() {}\n",
        )]);
        let m = &metrics.modules["crate"];
        assert_eq!(m.total_types, 4, "structs + enums + aliases");
        assert_eq!(m.total_traits, 1);
        assert_eq!(m.total_functions, 2);
        assert_eq!(m.public_items, 5);
        assert_eq!(m.private_items, 2);
        assert!((m.node.abstractness - 0.2).abs() < 1e-9, "1 trait / 5 types+traits");
    }

    #[test]
    fn test_function_complexity_tracks_fan_out() {
        let (_, _, metrics) = analyzed(&[(
            "src/lib.rs",
            "pub fn callee_a() {}\npub fn callee_b() {}\npub fn caller() { callee_a(); callee_b(); callee_a(); }\n",
        )]);
        let caller = &metrics.nodes["crate::caller"];
        assert_eq!(caller.fan_out, 3, "three call occurrences");
        assert_eq!(caller.complexity, 4, "1 + fanOut");
        assert_eq!(metrics.nodes["crate::callee_a"].complexity, 1);
        assert_eq!(metrics.nodes["crate::callee_a"].fan_in, 2);
    }

    #[test]
    fn test_metric_ranges_hold() {
        let (_, _, metrics) = analyzed(&[
            ("src/lib.rs", "pub mod a;\npub mod b;\npub trait Tr {}\n"),
            ("src/a.rs", "use crate::b::U;\npub struct T { u: U }\n"),
            ("src/b.rs", "pub struct U;\n"),
        ]);
        for m in metrics.nodes.values() {
            assert!((0.0..=1.0).contains(&m.instability));
            assert!((0.0..=1.0).contains(&m.abstractness));
            assert!((0.0..=1.0).contains(&m.distance));
        }
    }

    #[test]
    fn test_top_lists_exclude_modules() {
        let (_, _, metrics) = analyzed(&[
            ("src/lib.rs", "mod a;\nuse crate::a::Foo;\n"),
            ("src/a.rs", "pub struct Foo;\n"),
        ]);
        for entry in metrics
            .crate_metrics
            .most_coupled
            .iter()
            .chain(&metrics.crate_metrics.most_unstable)
            .chain(&metrics.crate_metrics.highest_distance)
        {
            assert!(
                entry.id != "crate" && entry.id != "crate::a",
                "module {} must not be ranked",
                entry.id
            );
        }
    }

    #[test]
    fn test_module_lines_of_code_counts_file() {
        let (_, _, metrics) = analyzed(&[(
            "src/lib.rs",
            "pub struct A;\npub struct B;\npub fn f() {}\n",
        )]);
        assert_eq!(metrics.modules["crate"].node.lines_of_code, 3);
        assert_eq!(metrics.nodes["crate::A"].lines_of_code, 10, "placeholder LoC");
    }
}
