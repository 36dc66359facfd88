//! Cycle detection.
//!
//! Mirrors the id-keyed dependency graph into a petgraph `Graph` and runs
//! Tarjan's strongly-connected-components algorithm over it (petgraph's
//! implementation is iterative, so deep chains cannot exhaust the system
//! stack). An SCC is reported as a cycle when it has two or more members, or
//! a single member with a self-loop in the adjacency list.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{Graph, NodeIndex};
use serde::Serialize;

use crate::graph::DepGraph;
use crate::graph::aggregate::aggregate_to_modules;
use crate::graph::edge::GraphEdge;

/// One strongly connected component of size ≥ 2 (or a self-loop), with the
/// member ids in sorted order and the edges that stay entirely inside it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
    pub nodes: Vec<String>,
    pub edges: Vec<GraphEdge>,
}

impl Cycle {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n == id)
    }
}

/// Detect all dependency cycles in the graph, ordered by their first member
/// id for deterministic output.
pub fn detect_cycles(graph: &DepGraph) -> Vec<Cycle> {
    // Mirror into a petgraph Graph; node weights are the id strings.
    let mut mirror: Graph<&str, ()> = Graph::new();
    let mut index_of: BTreeMap<&str, NodeIndex> = BTreeMap::new();
    for id in graph.nodes.keys() {
        index_of.insert(id.as_str(), mirror.add_node(id.as_str()));
    }
    for (from, neighbors) in &graph.adjacency {
        let Some(&from_idx) = index_of.get(from.as_str()) else {
            continue;
        };
        for to in neighbors {
            if let Some(&to_idx) = index_of.get(to.as_str()) {
                mirror.add_edge(from_idx, to_idx, ());
            }
        }
    }

    let mut cycles: Vec<Cycle> = tarjan_scc(&mirror)
        .into_iter()
        .filter_map(|scc| {
            let has_self_loop = scc.len() == 1 && {
                let id = mirror[scc[0]];
                graph
                    .adjacency
                    .get(id)
                    .is_some_and(|neighbors| neighbors.contains(id))
            };
            if scc.len() < 2 && !has_self_loop {
                return None;
            }

            let mut nodes: Vec<String> = scc.iter().map(|&idx| mirror[idx].to_owned()).collect();
            nodes.sort();
            let member_set: BTreeSet<&str> = nodes.iter().map(String::as_str).collect();

            let mut edges: Vec<GraphEdge> = graph
                .edges
                .iter()
                .filter(|e| member_set.contains(e.from.as_str()) && member_set.contains(e.to.as_str()))
                .cloned()
                .collect();
            edges.sort_by(|a, b| (&a.from, &a.to, a.kind).cmp(&(&b.from, &b.to, b.kind)));

            Some(Cycle { nodes, edges })
        })
        .collect();

    cycles.sort_by(|a, b| a.nodes[0].cmp(&b.nodes[0]));
    cycles
}

/// Detect cycles at module granularity: aggregate first, then run the same
/// algorithm.
pub fn detect_module_level_cycles(graph: &DepGraph) -> Vec<Cycle> {
    detect_cycles(&aggregate_to_modules(graph))
}

/// The set of all node ids that belong to any cycle.
pub fn nodes_in_cycles(cycles: &[Cycle]) -> BTreeSet<String> {
    cycles
        .iter()
        .flat_map(|c| c.nodes.iter().cloned())
        .collect()
}

/// The cycle containing `id`, if any.
pub fn cycle_for_node<'c>(id: &str, cycles: &'c [Cycle]) -> Option<&'c Cycle> {
    cycles.iter().find(|c| c.contains(id))
}

/// Cycles ordered largest first; ties keep their detection order.
pub fn sort_cycles_by_size(mut cycles: Vec<Cycle>) -> Vec<Cycle> {
    cycles.sort_by(|a, b| b.len().cmp(&a.len()));
    cycles
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::edge::{DependencyKind, Location};
    use crate::graph::node::{GraphNode, NodeKind};
    use std::path::PathBuf;

    fn node(id: &str, kind: NodeKind, parent: Option<&str>) -> GraphNode {
        GraphNode::new(
            id,
            id.rsplit("::").next().unwrap(),
            kind,
            parent.map(str::to_owned),
            PathBuf::from("src/lib.rs"),
            1,
        )
    }

    fn loc() -> Location {
        Location {
            file: PathBuf::from("src/lib.rs"),
            line: 1,
            column: 0,
        }
    }

    fn mutual_pair() -> DepGraph {
        let mut g = DepGraph::new();
        g.add_node(node("crate", NodeKind::Module, None));
        g.add_node(node("crate::a", NodeKind::Module, Some("crate")));
        g.add_node(node("crate::b", NodeKind::Module, Some("crate")));
        g.add_node(node("crate::a::T", NodeKind::Struct, Some("crate::a")));
        g.add_node(node("crate::b::U", NodeKind::Struct, Some("crate::b")));
        g.add_edge("crate::a::T", "crate::b::U", DependencyKind::FieldType, loc());
        g.add_edge("crate::b::U", "crate::a::T", DependencyKind::FieldType, loc());
        g
    }

    #[test]
    fn test_mutual_pair_is_one_cycle() {
        let cycles = detect_cycles(&mutual_pair());
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].nodes, vec!["crate::a::T", "crate::b::U"]);
        assert_eq!(cycles[0].edges.len(), 2, "both internal edges collected");
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let mut g = DepGraph::new();
        g.add_node(node("crate::a", NodeKind::Module, None));
        g.add_node(node("crate::b", NodeKind::Module, None));
        g.add_node(node("crate::c", NodeKind::Module, None));
        g.add_edge("crate::a", "crate::b", DependencyKind::UseImport, loc());
        g.add_edge("crate::b", "crate::c", DependencyKind::UseImport, loc());
        assert!(detect_cycles(&g).is_empty());
    }

    #[test]
    fn test_three_node_ring() {
        let mut g = DepGraph::new();
        for id in ["crate::x", "crate::y", "crate::z"] {
            g.add_node(node(id, NodeKind::Struct, None));
        }
        g.add_edge("crate::x", "crate::y", DependencyKind::FieldType, loc());
        g.add_edge("crate::y", "crate::z", DependencyKind::FieldType, loc());
        g.add_edge("crate::z", "crate::x", DependencyKind::FieldType, loc());
        let cycles = detect_cycles(&g);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 3);
    }

    #[test]
    fn test_cycle_edges_exclude_spokes() {
        // A cycle with an extra incoming edge from outside: the outside edge
        // must not appear in the cycle's edge list.
        let mut g = mutual_pair();
        g.add_node(node("crate::Outside", NodeKind::Struct, Some("crate")));
        g.add_edge("crate::Outside", "crate::a::T", DependencyKind::FieldType, loc());
        let cycles = detect_cycles(&g);
        assert_eq!(cycles.len(), 1);
        assert!(
            cycles[0]
                .edges
                .iter()
                .all(|e| e.from != "crate::Outside"),
            "spoke edges stay out of the cycle"
        );
    }

    #[test]
    fn test_helpers_membership_and_sorting() {
        let cycles = detect_cycles(&mutual_pair());
        let members = nodes_in_cycles(&cycles);
        assert!(members.contains("crate::a::T"));
        assert!(members.contains("crate::b::U"));
        assert!(!members.contains("crate::a"));

        assert!(cycle_for_node("crate::a::T", &cycles).is_some());
        assert!(cycle_for_node("crate", &cycles).is_none());

        let mut g = mutual_pair();
        for id in ["crate::p", "crate::q", "crate::r"] {
            g.add_node(node(id, NodeKind::Struct, None));
        }
        g.add_edge("crate::p", "crate::q", DependencyKind::FieldType, loc());
        g.add_edge("crate::q", "crate::r", DependencyKind::FieldType, loc());
        g.add_edge("crate::r", "crate::p", DependencyKind::FieldType, loc());
        let sorted = sort_cycles_by_size(detect_cycles(&g));
        assert_eq!(sorted[0].len(), 3);
        assert_eq!(sorted[1].len(), 2);
    }

    #[test]
    fn test_module_level_cycles_via_aggregation() {
        // Type-level cycle across modules becomes a module-level cycle after
        // aggregation.
        let cycles = detect_module_level_cycles(&mutual_pair());
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].nodes, vec!["crate::a", "crate::b"]);
    }

    #[test]
    fn test_deterministic_order_across_runs() {
        let a = detect_cycles(&mutual_pair());
        let b = detect_cycles(&mutual_pair());
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
