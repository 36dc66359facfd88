use std::path::PathBuf;

use thiserror::Error;

/// Fatal analysis failures. Anything not in this enum is recoverable and is
/// reported through [`Diagnostics`] instead of aborting the run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A file or directory that must exist could not be read (entry point,
    /// manifest directory).
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tree-sitter parser failed outright on the crate entry file.
    #[error("failed to parse {path}")]
    Parse { path: PathBuf },

    /// No library or binary entry point could be located for a crate.
    #[error("no lib or bin entry point found under {root}")]
    Manifest { root: PathBuf },
}

/// Recoverable omissions collected across a run.
///
/// Fatal errors abort; everything here is counted, optionally logged when
/// verbose, and the analysis continues with the corresponding edge or module
/// omitted.
#[derive(Debug, Default)]
pub struct Diagnostics {
    /// `use` declarations that mapped to no known symbol.
    pub unresolved_imports: usize,
    /// Type references that mapped to no known node.
    pub unresolved_types: usize,
    /// Non-entry source files that could not be read (stubbed as empty modules).
    pub unreadable_files: usize,
    /// `mod` declarations with no matching file on disk.
    pub unresolved_modules: usize,
    /// Suffix-match lookups that had more than one candidate.
    pub ambiguous_matches: usize,
    /// Human-readable detail lines, emitted to stderr under `--verbose`.
    pub messages: Vec<String>,
}

impl Diagnostics {
    pub fn note(&mut self, message: String) {
        self.messages.push(message);
    }

    /// Total number of recoverable omissions.
    pub fn omission_count(&self) -> usize {
        self.unresolved_imports
            + self.unresolved_types
            + self.unreadable_files
            + self.unresolved_modules
    }

    /// Fold another diagnostics value into this one (used when merging
    /// per-crate runs in workspace mode).
    pub fn merge(&mut self, other: Diagnostics) {
        self.unresolved_imports += other.unresolved_imports;
        self.unresolved_types += other.unresolved_types;
        self.unreadable_files += other.unreadable_files;
        self.unresolved_modules += other.unresolved_modules;
        self.ambiguous_matches += other.ambiguous_matches;
        self.messages.extend(other.messages);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_omission_count_sums_recoverables() {
        let mut d = Diagnostics::default();
        d.unresolved_imports = 2;
        d.unresolved_types = 3;
        d.unreadable_files = 1;
        assert_eq!(d.omission_count(), 6);
    }

    #[test]
    fn test_merge_accumulates() {
        let mut a = Diagnostics::default();
        a.unresolved_imports = 1;
        a.note("first".into());
        let mut b = Diagnostics::default();
        b.unresolved_imports = 2;
        b.ambiguous_matches = 1;
        b.note("second".into());
        a.merge(b);
        assert_eq!(a.unresolved_imports, 3);
        assert_eq!(a.ambiguous_matches, 1);
        assert_eq!(a.messages.len(), 2);
    }
}
