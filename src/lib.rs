//! Static dependency-graph analysis for Rust crates.
//!
//! crate-dsm resolves a crate's module tree from its manifest and the
//! filesystem conventions, extracts declarations and references from
//! tree-sitter parse trees, resolves names across modules, and builds a
//! typed dependency multigraph. On top of the graph it detects strongly
//! connected cycles, computes coupling/instability/abstractness metrics,
//! and derives a design-structure-matrix view.
//!
//! The pipeline is single-threaded, single-shot, and deterministic:
//! analyzing the same tree twice yields byte-identical JSON.
//!
//! ```no_run
//! use crate_dsm::{FilterConfig, analyze};
//!
//! let analysis = analyze(std::path::Path::new("."), &FilterConfig::no_tests())?;
//! println!("{}", analysis.to_json()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod graph;
pub mod index;
pub mod model;
pub mod parser;
pub mod report;
pub mod resolver;

use std::path::{Path, PathBuf};

pub use config::FilterConfig;
pub use error::{AnalysisError, Diagnostics};
pub use report::Analysis;

use analysis::cycles::detect_cycles;
use analysis::metrics::compute_metrics;
use graph::builder::build_graph;
use graph::linker::link_workspace;
use index::SymbolIndex;
use model::ProjectDef;
use resolver::manifest::Manifest;
use resolver::resolve_crate;
use resolver::workspace::expand_members;

/// Analyze the project at `project_root`.
///
/// A manifest with `[workspace] members` triggers workspace mode: every
/// member crate is resolved and built separately, then merged under
/// crate-prefixed ids. Otherwise the root is analyzed as a single crate.
pub fn analyze(project_root: &Path, config: &FilterConfig) -> Result<Analysis, AnalysisError> {
    let manifest = Manifest::read(project_root);

    if !manifest.workspace_members.is_empty() {
        let mut member_dirs = expand_members(project_root, &manifest.workspace_members);
        // A combined workspace-plus-package manifest analyzes the root
        // package as a member too.
        if manifest.package_name.is_some() && !member_dirs.contains(&project_root.to_path_buf()) {
            member_dirs.push(project_root.to_path_buf());
            member_dirs.sort();
        }
        if !member_dirs.is_empty() {
            return analyze_workspace(&member_dirs, config);
        }
    }

    analyze_single(project_root, config)
}

fn analyze_single(crate_dir: &Path, config: &FilterConfig) -> Result<Analysis, AnalysisError> {
    let resolution = resolve_crate(crate_dir, config)?;
    let mut diagnostics = resolution.diagnostics;

    let symbol_index = SymbolIndex::build(&resolution.krate);
    let graph = build_graph(&resolution.krate, &symbol_index, &mut diagnostics);
    let cycles = detect_cycles(&graph);

    let project = ProjectDef::Crate(resolution.krate);
    let metrics = compute_metrics(&graph, &cycles, &project);

    Ok(Analysis {
        project,
        graph,
        cycles,
        metrics,
        diagnostics,
    })
}

fn analyze_workspace(
    member_dirs: &[PathBuf],
    config: &FilterConfig,
) -> Result<Analysis, AnalysisError> {
    let mut diagnostics = Diagnostics::default();
    let mut members = Vec::new();

    for dir in member_dirs {
        let resolution = resolve_crate(dir, config)?;
        diagnostics.merge(resolution.diagnostics);
        let symbol_index = SymbolIndex::build(&resolution.krate);
        let member_graph = build_graph(&resolution.krate, &symbol_index, &mut diagnostics);
        members.push((resolution.krate, member_graph));
    }

    let graph = link_workspace(&members, &mut diagnostics);
    let crates = members.into_iter().map(|(krate, _)| krate).collect();
    let cycles = detect_cycles(&graph);

    let project = ProjectDef::Workspace { crates };
    let metrics = compute_metrics(&graph, &cycles, &project);

    Ok(Analysis {
        project,
        graph,
        cycles,
        metrics,
        diagnostics,
    })
}
