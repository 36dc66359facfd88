//! Module-level aggregation.
//!
//! Replaces every node by its nearest ancestor of kind module (or crate) and
//! collapses the edges accordingly: same-module edges disappear, cross-module
//! edges sum their counts and concatenate their locations. Aggregating an
//! already-aggregated graph is the identity.

use std::collections::BTreeMap;

use super::DepGraph;
use super::node::NodeKind;

/// Collapse a declaration-level graph to module granularity.
pub fn aggregate_to_modules(graph: &DepGraph) -> DepGraph {
    // Nearest enclosing module per node id.
    let mut owner: BTreeMap<&str, &str> = BTreeMap::new();
    for id in graph.nodes.keys() {
        owner.insert(id.as_str(), nearest_module(graph, id));
    }

    let mut out = DepGraph::new();

    // Sorted-key iteration inserts parents before children (a parent id is
    // always a proper prefix), so child wiring works in one pass.
    for node in graph.nodes.values() {
        if !matches!(node.kind, NodeKind::Module | NodeKind::Crate) {
            continue;
        }
        let mut copy = node.clone();
        copy.children.clear();
        copy.parent = node.parent.as_deref().map(|p| {
            owner
                .get(p)
                .map(|m| (*m).to_owned())
                .unwrap_or_else(|| p.to_owned())
        });
        out.add_node(copy);
    }

    for edge in &graph.edges {
        let (Some(from), Some(to)) = (owner.get(edge.from.as_str()), owner.get(edge.to.as_str()))
        else {
            continue;
        };
        if from == to {
            continue;
        }
        for location in &edge.locations {
            out.add_edge(from, to, edge.kind, location.clone());
        }
    }

    out
}

/// Walk parents until a module (or crate) node is found. Module nodes map to
/// themselves.
fn nearest_module<'g>(graph: &'g DepGraph, id: &'g str) -> &'g str {
    let mut current = id;
    loop {
        let Some(node) = graph.nodes.get(current) else {
            return current;
        };
        if matches!(node.kind, NodeKind::Module | NodeKind::Crate) {
            return current;
        }
        match node.parent.as_deref() {
            Some(parent) => current = parent,
            None => return current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::edge::{DependencyKind, Location};
    use crate::graph::node::GraphNode;
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

    fn loc(line: usize) -> Location {
        Location {
            file: PathBuf::from("src/lib.rs"),
            line,
            column: 0,
        }
    }

    fn sample_graph() -> DepGraph {
        let mut g = DepGraph::new();
        g.add_node(node("crate", NodeKind::Module, None));
        g.add_node(node("crate::a", NodeKind::Module, Some("crate")));
        g.add_node(node("crate::b", NodeKind::Module, Some("crate")));
        g.add_node(node("crate::a::T", NodeKind::Struct, Some("crate::a")));
        g.add_node(node("crate::b::U", NodeKind::Struct, Some("crate::b")));
        g.add_node(node("crate::b::V", NodeKind::Struct, Some("crate::b")));
        // Cross-module type references plus one intra-module reference.
        g.add_edge("crate::a::T", "crate::b::U", DependencyKind::FieldType, loc(3));
        g.add_edge("crate::a::T", "crate::b::V", DependencyKind::FieldType, loc(4));
        g.add_edge("crate::b::U", "crate::b::V", DependencyKind::FieldType, loc(5));
        g
    }

    #[test]
    fn test_aggregation_keeps_only_modules() {
        let agg = aggregate_to_modules(&sample_graph());
        let ids: Vec<&str> = agg.nodes.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["crate", "crate::a", "crate::b"]);
        assert_eq!(agg.nodes["crate"].children, vec!["crate::a", "crate::b"]);
    }

    #[test]
    fn test_cross_module_edges_collapse_and_sum() {
        let agg = aggregate_to_modules(&sample_graph());
        // Both a::T edges collapse onto one module edge with count 2; the
        // intra-b edge disappears.
        assert_eq!(agg.edge_count(), 1);
        let edge = &agg.edges[0];
        assert_eq!(edge.from, "crate::a");
        assert_eq!(edge.to, "crate::b");
        assert_eq!(edge.count, 2);
        assert_eq!(edge.locations.len(), 2);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let once = aggregate_to_modules(&sample_graph());
        let twice = aggregate_to_modules(&once);
        assert_eq!(
            once.nodes.keys().collect::<Vec<_>>(),
            twice.nodes.keys().collect::<Vec<_>>()
        );
        assert_eq!(once.edge_count(), twice.edge_count());
        assert_eq!(once.edges[0].count, twice.edges[0].count);
    }
}
