//! Workspace member discovery.
//!
//! Expands `[workspace] members` glob patterns against the project root and
//! keeps every matching directory that carries its own manifest. Results are
//! sorted by path so workspace analysis order is stable across filesystems.

use std::path::{Path, PathBuf};

/// Expand workspace member globs to concrete crate directories.
pub fn expand_members(project_root: &Path, members: &[String]) -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    for member_glob in members {
        let pattern = format!("{}/{}", project_root.display(), member_glob);
        let entries = match glob::glob(&pattern) {
            Ok(e) => e,
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            if entry.is_dir() && entry.join("Cargo.toml").exists() && !dirs.contains(&entry) {
                dirs.push(entry);
            }
        }
    }

    dirs.sort();
    dirs
}
