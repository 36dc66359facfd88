//! The typed dependency multigraph.
//!
//! A single owning map keyed by id holds every node; edges, adjacency lists,
//! and the parent/child tree all reference nodes by id string only. The map
//! is a `BTreeMap` so every enumeration over nodes — serialization, glob
//! expansion, suffix matching — runs in sorted-key order and the whole
//! pipeline stays deterministic across filesystems.

pub mod aggregate;
pub mod builder;
pub mod edge;
pub mod linker;
pub mod node;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use edge::{DependencyKind, GraphEdge, Location};
use node::GraphNode;

/// A type or call reference that failed to resolve inside its own crate.
/// Workspace linking retries these against cross-crate imports.
#[derive(Debug, Clone)]
pub struct PendingRef {
    /// Id of the referencing node (unprefixed, crate-local).
    pub from: String,
    /// Module the reference occurred in (unprefixed).
    pub module: String,
    /// Unqualified name that failed to resolve.
    pub name: String,
    pub kind: DependencyKind,
    pub location: Location,
}

/// The dependency graph: node map, deduplicated edge list, and forward plus
/// reverse adjacency.
#[derive(Debug, Default)]
pub struct DepGraph {
    pub nodes: BTreeMap<String, GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Dedup index over `(from, to, kind)`.
    edge_index: HashMap<(String, String, DependencyKind), usize>,
    /// Distinct outgoing neighbors per node id.
    pub adjacency: BTreeMap<String, BTreeSet<String>>,
    /// Distinct incoming neighbors per node id.
    pub reverse_adjacency: BTreeMap<String, BTreeSet<String>>,
    /// Unresolved references kept for the workspace linker.
    pub pending: Vec<PendingRef>,
}

impl DepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node and register it as a child of its parent.
    ///
    /// Returns `false` without touching anything when the id already exists —
    /// the first declaration wins.
    pub fn add_node(&mut self, node: GraphNode) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        if let Some(parent_id) = node.parent.clone()
            && let Some(parent) = self.nodes.get_mut(&parent_id)
        {
            parent.children.push(node.id.clone());
        }
        self.nodes.insert(node.id.clone(), node);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Add one occurrence of an edge.
    ///
    /// Silently refused when either endpoint is missing from the node map or
    /// the edge would be a self-loop. A repeat of an existing `(from, to,
    /// kind)` increments the count and appends the location.
    pub fn add_edge(&mut self, from: &str, to: &str, kind: DependencyKind, location: Location) {
        if from == to || !self.nodes.contains_key(from) || !self.nodes.contains_key(to) {
            return;
        }

        let key = (from.to_owned(), to.to_owned(), kind);
        match self.edge_index.get(&key) {
            Some(&idx) => {
                let edge = &mut self.edges[idx];
                edge.count += 1;
                edge.locations.push(location);
            }
            None => {
                self.edges.push(GraphEdge {
                    from: from.to_owned(),
                    to: to.to_owned(),
                    kind,
                    count: 1,
                    locations: vec![location],
                });
                self.edge_index.insert(key, self.edges.len() - 1);
                self.adjacency
                    .entry(from.to_owned())
                    .or_default()
                    .insert(to.to_owned());
                self.reverse_adjacency
                    .entry(to.to_owned())
                    .or_default()
                    .insert(from.to_owned());
            }
        }
    }

    /// Distinct incoming neighbors (afferent coupling).
    pub fn in_degree(&self, id: &str) -> usize {
        self.reverse_adjacency.get(id).map_or(0, BTreeSet::len)
    }

    /// Distinct outgoing neighbors (efferent coupling).
    pub fn out_degree(&self, id: &str) -> usize {
        self.adjacency.get(id).map_or(0, BTreeSet::len)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Total occurrence count of incoming edges (fan-in).
    pub fn fan_in(&self, id: &str) -> usize {
        self.edges
            .iter()
            .filter(|e| e.to == id)
            .map(|e| e.count)
            .sum()
    }

    /// Total occurrence count of outgoing edges (fan-out).
    pub fn fan_out(&self, id: &str) -> usize {
        self.edges
            .iter()
            .filter(|e| e.from == id)
            .map(|e| e.count)
            .sum()
    }
}

impl Serialize for DepGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Nodes in sorted-id order, edges sorted by (from, to, kind), so the
        // JSON document is byte-identical across runs.
        let nodes: Vec<&GraphNode> = self.nodes.values().collect();
        let mut edges: Vec<&GraphEdge> = self.edges.iter().collect();
        edges.sort_by(|a, b| {
            (&a.from, &a.to, a.kind).cmp(&(&b.from, &b.to, b.kind))
        });

        let mut state = serializer.serialize_struct("DepGraph", 2)?;
        state.serialize_field("nodes", &nodes)?;
        state.serialize_field("edges", &edges)?;
        state.end()
    }
}
