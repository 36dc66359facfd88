mod cli;

use std::path::Path;

use anyhow::Result;
use clap::Parser;

use crate_dsm::analysis::cycles::{detect_module_level_cycles, sort_cycles_by_size};
use crate_dsm::analysis::dsm::module_dsm;
use crate_dsm::report::{print_cycles, print_diagnostics, print_dsm, print_summary};
use crate_dsm::{FilterConfig, analyze};

use cli::{Cli, Commands, FilterArgs};

/// Compose the effective filter configuration: the preset or the project's
/// `crate-dsm.toml`, extended by command-line globs.
fn effective_config(path: &Path, filters: &FilterArgs) -> FilterConfig {
    let mut config = if filters.no_tests {
        FilterConfig::no_tests()
    } else {
        FilterConfig::load(path)
    };
    config.exclude_patterns.extend(filters.exclude.iter().cloned());
    config.include_patterns.extend(filters.include.iter().cloned());
    config
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            path,
            json,
            verbose,
            filters,
        } => {
            let config = effective_config(&path, &filters);
            let analysis = analyze(&path, &config)?;
            if verbose {
                print_diagnostics(&analysis.diagnostics);
            }
            if json {
                println!("{}", analysis.to_json()?);
            } else {
                print_summary(&analysis);
            }
        }

        Commands::Cycles {
            path,
            modules,
            json,
            filters,
        } => {
            let config = effective_config(&path, &filters);
            let analysis = analyze(&path, &config)?;
            let cycles = if modules {
                detect_module_level_cycles(&analysis.graph)
            } else {
                analysis.cycles
            };
            let cycles = sort_cycles_by_size(cycles);
            if json {
                println!("{}", serde_json::to_string_pretty(&cycles)?);
            } else {
                print_cycles(&cycles);
            }
        }

        Commands::Dsm { path, json, filters } => {
            let config = effective_config(&path, &filters);
            let analysis = analyze(&path, &config)?;
            let dsm = module_dsm(&analysis.graph);
            if json {
                println!("{}", serde_json::to_string_pretty(&dsm)?);
            } else {
                print_dsm(&dsm);
            }
        }
    }

    Ok(())
}
