//! Module-tree resolution.
//!
//! Builds the crate definition by combining `mod` declarations with the
//! filesystem conventions: a non-inline `mod name;` resolves to a sibling
//! `name.rs` or a `name/mod.rs` subdirectory, where the search base depends
//! on whether the declaring file is a directory owner (`lib.rs`, `main.rs`,
//! `mod.rs`) or a regular module file. Inline modules recurse into their
//! body within the same file. Files under the crate's top-level `tests/`
//! directory join the tree as additional root-level modules unless filtered.
//!
//! Only the entry file is load-bearing: an unreadable or unresolvable
//! non-entry module degrades to an empty stub plus a diagnostic.

pub mod manifest;
pub mod workspace;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::config::FilterConfig;
use crate::error::{AnalysisError, Diagnostics};
use crate::model::{CrateDef, ModuleDef, Visibility};
use crate::parser::symbols::{Declarations, extract_declarations};
use crate::parser::{parse_source, root_is_error};
use manifest::Manifest;

/// The result of resolving one crate: its definition tree plus the
/// recoverable omissions encountered along the way.
#[derive(Debug)]
pub struct CrateResolution {
    pub krate: CrateDef,
    pub diagnostics: Diagnostics,
}

/// Resolve a single crate rooted at `crate_dir`.
///
/// Entry-point lookup order: manifest `[lib] path` override, `src/lib.rs`,
/// manifest `[[bin]]` path overrides, `src/main.rs`. No hit is a fatal
/// [`AnalysisError::Manifest`].
pub fn resolve_crate(
    crate_dir: &Path,
    config: &FilterConfig,
) -> Result<CrateResolution, AnalysisError> {
    let manifest = Manifest::read(crate_dir);
    let crate_name = manifest.crate_name(crate_dir);

    let entry = locate_entry(crate_dir, &manifest).ok_or_else(|| AnalysisError::Manifest {
        root: crate_dir.to_path_buf(),
    })?;

    let mut resolver = Resolver {
        crate_dir: crate_dir.to_path_buf(),
        config,
        diagnostics: Diagnostics::default(),
        visited: HashSet::new(),
        test_file_re: Regex::new(r"_tests?\.[^.]+$").expect("valid test-file pattern"),
    };

    let mut root = resolver.resolve_file("crate", "crate", Visibility::Public, &entry, true)?;
    resolver.append_tests_directory(&mut root);

    Ok(CrateResolution {
        krate: CrateDef {
            name: crate_name,
            root,
        },
        diagnostics: resolver.diagnostics,
    })
}

/// Locate the crate entry point per the manifest and the conventions.
fn locate_entry(crate_dir: &Path, manifest: &Manifest) -> Option<PathBuf> {
    if let Some(lib) = &manifest.lib_path {
        let path = crate_dir.join(lib);
        if path.exists() {
            return Some(path);
        }
    }
    let lib_rs = crate_dir.join("src").join("lib.rs");
    if lib_rs.exists() {
        return Some(lib_rs);
    }
    for bin in &manifest.bins {
        if let Some(bin_path) = &bin.path {
            let path = crate_dir.join(bin_path);
            if path.exists() {
                return Some(path);
            }
        }
    }
    let main_rs = crate_dir.join("src").join("main.rs");
    if main_rs.exists() {
        return Some(main_rs);
    }
    None
}

struct Resolver<'c> {
    crate_dir: PathBuf,
    config: &'c FilterConfig,
    diagnostics: Diagnostics,
    /// Canonicalized paths of already-resolved files; a second reference
    /// short-circuits to an empty stub instead of reparsing.
    visited: HashSet<PathBuf>,
    test_file_re: Regex,
}

impl Resolver<'_> {
    /// Resolve one file-backed module: read, parse, extract, recurse.
    ///
    /// For the entry file, read and parse failures are fatal. For any other
    /// file they degrade to an empty stub plus a diagnostic.
    fn resolve_file(
        &mut self,
        id: &str,
        name: &str,
        visibility: Visibility,
        file: &Path,
        is_entry: bool,
    ) -> Result<ModuleDef, AnalysisError> {
        let canonical = file.canonicalize().unwrap_or_else(|_| file.to_path_buf());
        if !self.visited.insert(canonical) {
            // Already resolved through another route.
            return Ok(self.stub(id, name, visibility, file));
        }

        let source = match std::fs::read(file) {
            Ok(bytes) => bytes,
            Err(err) => {
                if is_entry {
                    return Err(AnalysisError::Io {
                        path: file.to_path_buf(),
                        source: err,
                    });
                }
                self.diagnostics.unreadable_files += 1;
                self.diagnostics
                    .note(format!("unreadable file: {}", file.display()));
                return Ok(self.stub(id, name, visibility, file));
            }
        };

        let tree = match parse_source(&source) {
            Some(tree) if !(is_entry && root_is_error(&tree)) => tree,
            _ => {
                if is_entry {
                    return Err(AnalysisError::Parse {
                        path: file.to_path_buf(),
                    });
                }
                self.diagnostics
                    .note(format!("parse failure: {}", file.display()));
                return Ok(self.stub(id, name, visibility, file));
            }
        };

        let mut module = self.stub(id, name, visibility, file);
        let decls = extract_declarations(tree.root_node(), &source);
        self.populate(&mut module, decls, &source, file)?;
        Ok(module)
    }

    fn stub(&self, id: &str, name: &str, visibility: Visibility, file: &Path) -> ModuleDef {
        let mut module = ModuleDef::empty(id, name, file.to_path_buf());
        module.visibility = visibility;
        module
    }

    /// Install extracted declarations on `module` and recurse into its
    /// submodules, children in source order.
    fn populate(
        &mut self,
        module: &mut ModuleDef,
        decls: Declarations,
        source: &[u8],
        file: &Path,
    ) -> Result<(), AnalysisError> {
        module.structs = decls.structs;
        module.enums = decls.enums;
        module.traits = decls.traits;
        module.functions = decls.functions;
        module.impls = decls.impls;
        module.uses = decls.uses;
        module.consts = decls.consts;
        module.statics = decls.statics;
        module.type_aliases = decls.type_aliases;

        for mod_decl in decls.mods {
            let child_id = module.child_path(&mod_decl.name);

            match mod_decl.body {
                // Inline module: same file, recurse into the body.
                Some(body) => {
                    if mod_decl.is_cfg_test && self.config.exclude_cfg_test {
                        continue;
                    }
                    let mut child =
                        self.stub(&child_id, &mod_decl.name, mod_decl.visibility, file);
                    child.span = mod_decl.span;
                    let child_decls = extract_declarations(body, source);
                    self.populate(&mut child, child_decls, source, file)?;
                    module.submodules.push(child);
                }

                // File-backed module: probe the filesystem conventions.
                None => match self.find_child_file(file, &mod_decl.name) {
                    Some(child_file) => {
                        if self.is_filtered(&child_file) {
                            continue;
                        }
                        let mut child = self.resolve_file(
                            &child_id,
                            &mod_decl.name,
                            mod_decl.visibility,
                            &child_file,
                            false,
                        )?;
                        child.span = mod_decl.span;
                        module.submodules.push(child);
                    }
                    None => {
                        self.diagnostics.unresolved_modules += 1;
                        self.diagnostics.note(format!(
                            "unresolved mod `{}` declared in {}",
                            mod_decl.name,
                            file.display()
                        ));
                        let expected = file
                            .parent()
                            .map(|d| d.join(format!("{}.rs", mod_decl.name)))
                            .unwrap_or_default();
                        let mut stub =
                            self.stub(&child_id, &mod_decl.name, mod_decl.visibility, &expected);
                        stub.span = mod_decl.span;
                        module.submodules.push(stub);
                    }
                },
            }
        }

        Ok(())
    }

    /// Resolve `mod name;` declared in `current_file` to a file on disk.
    ///
    /// Directory owners (`lib.rs`, `main.rs`, `mod.rs`) search their own
    /// directory; any other file searches a subdirectory named after its
    /// stem. Probes `name.rs` first, then `name/mod.rs`.
    fn find_child_file(&self, current_file: &Path, name: &str) -> Option<PathBuf> {
        let parent_dir = current_file.parent()?;
        let file_name = current_file.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let is_directory_owner = matches!(file_name, "mod.rs" | "lib.rs" | "main.rs");

        let base = if is_directory_owner {
            parent_dir.to_path_buf()
        } else {
            let stem = current_file.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            parent_dir.join(stem)
        };

        let candidate_file = base.join(format!("{name}.rs"));
        if candidate_file.exists() {
            return Some(candidate_file);
        }
        let candidate_dir = base.join(name).join("mod.rs");
        if candidate_dir.exists() {
            return Some(candidate_dir);
        }
        None
    }

    /// Apply the filter configuration to a candidate module file.
    ///
    /// Exclude patterns always win; when include patterns are present a file
    /// must match at least one of them.
    fn is_filtered(&self, path: &Path) -> bool {
        let rel = path.strip_prefix(&self.crate_dir).unwrap_or(path);
        let rel_str = rel.to_string_lossy();
        let basename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

        if self.config.exclude_test_files && self.test_file_re.is_match(basename) {
            return true;
        }

        if self.config.exclude_tests_directory {
            let under_tests = rel
                .components()
                .next()
                .and_then(|c| c.as_os_str().to_str())
                .is_some_and(|c| c == "tests");
            if under_tests {
                return true;
            }
        }

        for pattern in &self.config.exclude_patterns {
            if let Ok(p) = glob::Pattern::new(pattern)
                && (p.matches(&rel_str) || p.matches(basename))
            {
                return true;
            }
        }

        if !self.config.include_patterns.is_empty() {
            let included = self.config.include_patterns.iter().any(|pattern| {
                glob::Pattern::new(pattern)
                    .map(|p| p.matches(&rel_str) || p.matches(basename))
                    .unwrap_or(false)
            });
            if !included {
                return true;
            }
        }

        false
    }

    /// Add each `tests/*.rs` file as a root-level module, sorted by name so
    /// the tree is deterministic.
    fn append_tests_directory(&mut self, root: &mut ModuleDef) {
        let tests_dir = self.crate_dir.join("tests");
        let Ok(entries) = std::fs::read_dir(&tests_dir) else {
            return;
        };

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("rs"))
            .collect();
        files.sort();

        for file in files {
            if self.is_filtered(&file) {
                continue;
            }
            let Some(stem) = file.file_stem().and_then(|s| s.to_str()).map(str::to_owned) else {
                continue;
            };
            let id = root.child_path(&stem);
            match self.resolve_file(&id, &stem, Visibility::Private, &file, false) {
                Ok(module) => root.submodules.push(module),
                Err(_) => {}
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn make_simple_crate(root: &Path) {
        write(
            root,
            "Cargo.toml",
            "[package]\nname = \"my-crate\"\nversion = \"0.1.0\"\n",
        );
        write(root, "src/lib.rs", "pub mod parser;\npub mod util;\n");
        write(root, "src/parser.rs", "pub mod imports;\npub struct Parser;\n");
        write(root, "src/parser/imports.rs", "pub struct Import;\n");
        write(root, "src/util.rs", "pub fn helper() {}\n");
    }

    fn module_ids(krate: &CrateDef) -> Vec<String> {
        krate.root.all_modules().iter().map(|m| m.id.clone()).collect()
    }

    #[test]
    fn test_resolves_nested_module_tree() {
        let tmp = tempfile::tempdir().unwrap();
        make_simple_crate(tmp.path());
        let res = resolve_crate(tmp.path(), &FilterConfig::default()).unwrap();
        assert_eq!(res.krate.name, "my_crate");
        assert_eq!(
            module_ids(&res.krate),
            vec!["crate", "crate::parser", "crate::parser::imports", "crate::util"]
        );
        assert_eq!(res.diagnostics.omission_count(), 0);
    }

    #[test]
    fn test_directory_owner_rule() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "Cargo.toml",
            "[package]\nname = \"owner\"\nversion = \"0.1.0\"\n",
        );
        // lib.rs searches siblings; graph/mod.rs owns its directory.
        write(tmp.path(), "src/lib.rs", "pub mod graph;\n");
        write(tmp.path(), "src/graph/mod.rs", "pub mod node;\n");
        write(tmp.path(), "src/graph/node.rs", "pub struct Node;\n");
        let res = resolve_crate(tmp.path(), &FilterConfig::default()).unwrap();
        assert_eq!(
            module_ids(&res.krate),
            vec!["crate", "crate::graph", "crate::graph::node"]
        );
    }

    #[test]
    fn test_missing_entry_point_is_manifest_error() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "Cargo.toml",
            "[package]\nname = \"empty\"\nversion = \"0.1.0\"\n",
        );
        let err = resolve_crate(tmp.path(), &FilterConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::Manifest { .. }));
    }

    #[test]
    fn test_lib_path_override_wins() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "Cargo.toml",
            "[package]\nname = \"custom\"\n\n[lib]\npath = \"src/custom.rs\"\n",
        );
        write(tmp.path(), "src/custom.rs", "pub struct Root;\n");
        write(tmp.path(), "src/lib.rs", "pub struct Decoy;\n");
        let res = resolve_crate(tmp.path(), &FilterConfig::default()).unwrap();
        assert_eq!(res.krate.root.structs[0].name, "Root");
    }

    #[test]
    fn test_unresolved_mod_becomes_stub_with_diagnostic() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "Cargo.toml",
            "[package]\nname = \"stubby\"\nversion = \"0.1.0\"\n",
        );
        write(tmp.path(), "src/lib.rs", "pub mod ghost;\n");
        let res = resolve_crate(tmp.path(), &FilterConfig::default()).unwrap();
        assert_eq!(res.diagnostics.unresolved_modules, 1);
        assert_eq!(res.krate.root.submodules.len(), 1);
        let ghost = &res.krate.root.submodules[0];
        assert_eq!(ghost.id, "crate::ghost");
        assert!(ghost.structs.is_empty() && ghost.submodules.is_empty());
    }

    #[test]
    fn test_inline_modules_share_the_parent_file() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "Cargo.toml",
            "[package]\nname = \"inline\"\nversion = \"0.1.0\"\n",
        );
        write(
            tmp.path(),
            "src/lib.rs",
            "pub mod outer { pub mod inner { pub struct Deep; } }\n",
        );
        let res = resolve_crate(tmp.path(), &FilterConfig::default()).unwrap();
        let ids = module_ids(&res.krate);
        assert_eq!(ids, vec!["crate", "crate::outer", "crate::outer::inner"]);
        let inner = &res.krate.root.submodules[0].submodules[0];
        assert!(inner.file.ends_with("src/lib.rs"));
        assert_eq!(inner.structs[0].name, "Deep");
    }

    /// The test-filter scenario: `utils_tests.rs`, `tests/integration.rs`,
    /// and an inline `#[cfg(test)] mod tests` all vanish under the no-tests
    /// preset and all appear under the default preset.
    #[test]
    fn test_no_tests_preset_drops_all_test_shapes() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "Cargo.toml",
            "[package]\nname = \"filters\"\nversion = \"0.1.0\"\n",
        );
        write(
            tmp.path(),
            "src/lib.rs",
            "pub mod utils;\npub mod utils_tests;\n#[cfg(test)]\nmod tests { struct Probe; }\n",
        );
        write(tmp.path(), "src/utils.rs", "pub fn real() {}\n");
        write(tmp.path(), "src/utils_tests.rs", "pub fn fake() {}\n");
        write(tmp.path(), "tests/integration.rs", "fn main() {}\n");

        let all = resolve_crate(tmp.path(), &FilterConfig::default()).unwrap();
        let ids = module_ids(&all.krate);
        assert!(ids.contains(&"crate::utils".to_owned()));
        assert!(ids.contains(&"crate::utils_tests".to_owned()));
        assert!(ids.contains(&"crate::tests".to_owned()));
        assert!(ids.contains(&"crate::integration".to_owned()));

        let none = resolve_crate(tmp.path(), &FilterConfig::no_tests()).unwrap();
        let ids = module_ids(&none.krate);
        assert!(ids.contains(&"crate::utils".to_owned()));
        assert!(!ids.contains(&"crate::utils_tests".to_owned()));
        assert!(!ids.contains(&"crate::tests".to_owned()));
        assert!(!ids.contains(&"crate::integration".to_owned()));
    }

    #[test]
    fn test_include_patterns_must_match() {
        let tmp = tempfile::tempdir().unwrap();
        make_simple_crate(tmp.path());
        let config = FilterConfig {
            include_patterns: vec!["**/parser*".to_owned(), "parser*".to_owned()],
            ..FilterConfig::default()
        };
        let res = resolve_crate(tmp.path(), &config).unwrap();
        let ids = module_ids(&res.krate);
        assert!(ids.contains(&"crate::parser".to_owned()));
        assert!(!ids.contains(&"crate::util".to_owned()), "util matches no include");
    }

    #[test]
    fn test_exclude_patterns_always_win() {
        let tmp = tempfile::tempdir().unwrap();
        make_simple_crate(tmp.path());
        let config = FilterConfig {
            exclude_patterns: vec!["**/imports.rs".to_owned()],
            ..FilterConfig::default()
        };
        let res = resolve_crate(tmp.path(), &config).unwrap();
        let ids = module_ids(&res.krate);
        assert!(ids.contains(&"crate::parser".to_owned()));
        assert!(!ids.contains(&"crate::parser::imports".to_owned()));
    }
}
