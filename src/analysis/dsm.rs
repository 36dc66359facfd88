//! Design-structure-matrix view.
//!
//! A square matrix over a stable node ordering where cell (i, j) holds the
//! number of dependency occurrences from node i to node j. Usually consumed
//! at module granularity via [`module_dsm`].

use std::collections::BTreeMap;

use serde::Serialize;

use crate::graph::DepGraph;
use crate::graph::aggregate::aggregate_to_modules;

/// A DSM: row/column ids in sorted order plus the dependency-count matrix.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DsmMatrix {
    pub ids: Vec<String>,
    pub matrix: Vec<Vec<usize>>,
}

impl DsmMatrix {
    /// The cell value for a `(from, to)` id pair, 0 when either is unknown.
    pub fn cell(&self, from: &str, to: &str) -> usize {
        let row = self.ids.iter().position(|id| id == from);
        let col = self.ids.iter().position(|id| id == to);
        match (row, col) {
            (Some(r), Some(c)) => self.matrix[r][c],
            _ => 0,
        }
    }
}

/// Build the DSM at the graph's own granularity.
pub fn build_dsm(graph: &DepGraph) -> DsmMatrix {
    let ids: Vec<String> = graph.nodes.keys().cloned().collect();
    let index: BTreeMap<&str, usize> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    let mut matrix = vec![vec![0usize; ids.len()]; ids.len()];
    for edge in &graph.edges {
        if let (Some(&row), Some(&col)) =
            (index.get(edge.from.as_str()), index.get(edge.to.as_str()))
        {
            matrix[row][col] += edge.count;
        }
    }

    DsmMatrix { ids, matrix }
}

/// Build the DSM at module granularity.
pub fn module_dsm(graph: &DepGraph) -> DsmMatrix {
    build_dsm(&aggregate_to_modules(graph))
}
