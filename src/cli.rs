use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Dependency-graph, coupling-metric, and DSM analysis for Rust crates.
///
/// crate-dsm resolves the module tree of a crate or workspace, builds a
/// typed dependency graph of its declarations, and reports cycles and
/// coupling metrics without compiling anything.
#[derive(Parser, Debug)]
#[command(name = "crate-dsm", version, about, long_about = None, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Filter flags shared by every subcommand.
#[derive(clap::Args, Debug)]
pub struct FilterArgs {
    /// Apply the no-tests preset: drop `*_test(s).*` files, the `tests/`
    /// directory, and `#[cfg(test)]` inline modules.
    #[arg(long)]
    pub no_tests: bool,

    /// Additional glob patterns to exclude (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Glob patterns to include; when set, a file must match one
    /// (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub include: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a crate or workspace and print a summary or the full JSON
    /// report.
    Analyze {
        /// Path to the project root (where Cargo.toml lives).
        path: PathBuf,

        /// Emit the full JSON interchange document instead of a summary.
        #[arg(long)]
        json: bool,

        /// Print resolution diagnostics to stderr.
        #[arg(short, long)]
        verbose: bool,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Detect dependency cycles, at declaration or module granularity.
    Cycles {
        /// Path to the project root.
        path: PathBuf,

        /// Aggregate to module granularity before detecting.
        #[arg(long)]
        modules: bool,

        /// Emit cycles as JSON.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Print the design structure matrix at module granularity.
    Dsm {
        /// Path to the project root.
        path: PathBuf,

        /// Emit the matrix as JSON.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        filters: FilterArgs,
    },
}
