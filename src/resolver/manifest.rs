//! Minimal manifest reader.
//!
//! Pulls the handful of fields module resolution needs out of `Cargo.toml`:
//! package name, library entry override, binary entries, and workspace
//! member globs. A missing or unparsable manifest is non-fatal and yields an
//! empty structure — entry-point probing then falls back to the
//! `src/lib.rs` / `src/main.rs` conventions.

use std::path::{Path, PathBuf};

/// One `[[bin]]` entry.
#[derive(Debug, Clone, Default)]
pub struct BinEntry {
    pub name: Option<String>,
    pub path: Option<PathBuf>,
}

/// The subset of the manifest the analyzer consumes.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub package_name: Option<String>,
    /// `[lib] path = "…"` override, relative to the crate directory.
    pub lib_path: Option<PathBuf>,
    pub bins: Vec<BinEntry>,
    /// `[workspace] members` glob patterns, relative to the project root.
    pub workspace_members: Vec<String>,
}

impl Manifest {
    /// Read `Cargo.toml` from `crate_dir`. Never fails: anything missing or
    /// malformed produces the empty default.
    pub fn read(crate_dir: &Path) -> Self {
        let manifest_path = crate_dir.join("Cargo.toml");
        let content = match std::fs::read_to_string(&manifest_path) {
            Ok(c) => c,
            Err(_) => return Self::default(),
        };
        let value: toml::Value = match toml::from_str(&content) {
            Ok(v) => v,
            Err(_) => return Self::default(),
        };

        let package_name = value
            .get("package")
            .and_then(|p| p.get("name"))
            .and_then(|n| n.as_str())
            .map(str::to_owned);

        let lib_path = value
            .get("lib")
            .and_then(|l| l.get("path"))
            .and_then(|p| p.as_str())
            .map(PathBuf::from);

        let bins = value
            .get("bin")
            .and_then(|b| b.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| BinEntry {
                        name: entry
                            .get("name")
                            .and_then(|n| n.as_str())
                            .map(str::to_owned),
                        path: entry
                            .get("path")
                            .and_then(|p| p.as_str())
                            .map(PathBuf::from),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let workspace_members = value
            .get("workspace")
            .and_then(|w| w.get("members"))
            .and_then(|m| m.as_array())
            .map(|members| {
                members
                    .iter()
                    .filter_map(|m| m.as_str())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            package_name,
            lib_path,
            bins,
            workspace_members,
        }
    }

    /// Package name with the directory basename as fallback, normalized to
    /// the `use`-path convention (hyphens become underscores).
    pub fn crate_name(&self, crate_dir: &Path) -> String {
        let raw = self
            .package_name
            .clone()
            .or_else(|| {
                crate_dir
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| "crate".to_owned());
        raw.replace('-', "_")
    }
}
