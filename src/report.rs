//! Output aggregates and rendering-free serialization.
//!
//! [`Analysis`] bundles the four results of a run — crate definition tree,
//! dependency graph, cycle list, metrics report — and serializes to the JSON
//! interchange document. The plain-text printers below give the binary a
//! cargo-style summary; anything richer is a consumer's job.

use serde::Serialize;

use crate::analysis::cycles::Cycle;
use crate::analysis::dsm::DsmMatrix;
use crate::analysis::metrics::MetricsReport;
use crate::error::Diagnostics;
use crate::graph::DepGraph;
use crate::graph::node::NodeKind;
use crate::model::ProjectDef;

/// Everything one run produces. Serializes as
/// `{ "crate": …, "graph": …, "cycles": …, "metrics": … }`.
#[derive(Debug, Serialize)]
pub struct Analysis {
    #[serde(rename = "crate")]
    pub project: ProjectDef,
    pub graph: DepGraph,
    pub cycles: Vec<Cycle>,
    pub metrics: MetricsReport,
    /// Recoverable omissions; not part of the interchange document.
    #[serde(skip)]
    pub diagnostics: Diagnostics,
}

impl Analysis {
    /// The JSON interchange document, pretty-printed. Deterministic: every
    /// map is ordered and every list is sorted or source-ordered.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Print a cargo-style summary of an analysis run to stdout.
///
/// Omission counts go to stderr so stdout stays clean for piping.
pub fn print_summary(analysis: &Analysis) {
    let graph = &analysis.graph;
    let by_kind = |kind: NodeKind| graph.nodes.values().filter(|n| n.kind == kind).count();

    println!(
        "Analyzed {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    println!(
        "  modules: {}  structs: {}  enums: {}  traits: {}  functions: {}",
        by_kind(NodeKind::Module),
        by_kind(NodeKind::Struct),
        by_kind(NodeKind::Enum),
        by_kind(NodeKind::Trait),
        by_kind(NodeKind::Function),
    );

    let cm = &analysis.metrics.crate_metrics;
    println!(
        "  instability: {:.2}  abstractness: {:.2}  distance: {:.2}",
        cm.avg_instability, cm.avg_abstractness, cm.avg_distance
    );

    if analysis.cycles.is_empty() {
        println!("  no dependency cycles");
    } else {
        println!("  {} dependency cycle(s):", analysis.cycles.len());
        for cycle in &analysis.cycles {
            println!("    {}", cycle.nodes.join(" -> "));
        }
    }

    if !cm.most_coupled.is_empty() {
        println!("  most coupled:");
        for entry in cm.most_coupled.iter().take(3) {
            println!("    {} ({})", entry.id, entry.value as usize);
        }
    }

    let omissions = analysis.diagnostics.omission_count();
    if omissions > 0 {
        eprintln!("warning: {omissions} unresolved reference(s) omitted (use --verbose for details)");
    }
}

/// Print diagnostics detail lines to stderr.
pub fn print_diagnostics(diagnostics: &Diagnostics) {
    eprintln!(
        "  [diagnostics] unresolved imports: {}, unresolved types: {}, unreadable files: {}, unresolved mods: {}, ambiguous matches: {}",
        diagnostics.unresolved_imports,
        diagnostics.unresolved_types,
        diagnostics.unreadable_files,
        diagnostics.unresolved_modules,
        diagnostics.ambiguous_matches,
    );
    for message in &diagnostics.messages {
        eprintln!("  [diagnostics] {message}");
    }
}

/// Print a cycle list, one line per cycle, largest context first handled by
/// the caller's ordering.
pub fn print_cycles(cycles: &[Cycle]) {
    if cycles.is_empty() {
        println!("no dependency cycles");
        return;
    }
    for (idx, cycle) in cycles.iter().enumerate() {
        println!("cycle {} ({} nodes):", idx, cycle.len());
        for node in &cycle.nodes {
            println!("  {node}");
        }
    }
}

/// Print a DSM as an aligned text matrix: one row per id, counts per column.
pub fn print_dsm(dsm: &DsmMatrix) {
    let width = dsm
        .ids
        .iter()
        .map(String::len)
        .max()
        .unwrap_or(0)
        .max(4);

    for (row_idx, id) in dsm.ids.iter().enumerate() {
        let cells: Vec<String> = dsm.matrix[row_idx]
            .iter()
            .map(|c| format!("{c:>4}"))
            .collect();
        println!("{id:<width$} |{}", cells.join(""));
    }
}
