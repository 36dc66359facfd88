use std::path::Path;

use serde::Deserialize;

/// File-filter configuration applied during module-tree resolution.
///
/// All flags default to off (nothing filtered). The [`FilterConfig::no_tests`]
/// preset enables every test-related filter at once.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Glob patterns for files to exclude. Exclusions always win.
    pub exclude_patterns: Vec<String>,
    /// Glob patterns for files to include. When non-empty, a file must match
    /// at least one pattern to be kept.
    pub include_patterns: Vec<String>,
    /// Skip files whose basename matches `*_test.*` or `*_tests.*`.
    pub exclude_test_files: bool,
    /// Skip files under the project's top-level `tests/` directory.
    pub exclude_tests_directory: bool,
    /// Skip inline modules carrying a `#[cfg(test)]` attribute.
    pub exclude_cfg_test: bool,
}

impl FilterConfig {
    /// Preset with every test-related filter enabled.
    pub fn no_tests() -> Self {
        Self {
            exclude_test_files: true,
            exclude_tests_directory: true,
            exclude_cfg_test: true,
            ..Self::default()
        }
    }

    /// Load filter configuration from `crate-dsm.toml` in the given root
    /// directory.
    ///
    /// Returns the default (empty) configuration if the file does not exist
    /// or cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join("crate-dsm.toml");

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    eprintln!("warning: failed to parse crate-dsm.toml: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                eprintln!("warning: failed to read crate-dsm.toml: {err}. Using defaults.");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_preset_filters_nothing() {
        let config = FilterConfig::default();
        assert!(!config.exclude_test_files);
        assert!(!config.exclude_tests_directory);
        assert!(!config.exclude_cfg_test);
        assert!(config.exclude_patterns.is_empty());
        assert!(config.include_patterns.is_empty());
    }

    #[test]
    fn test_no_tests_preset_enables_all_test_filters() {
        let config = FilterConfig::no_tests();
        assert!(config.exclude_test_files);
        assert!(config.exclude_tests_directory);
        assert!(config.exclude_cfg_test);
        assert!(config.exclude_patterns.is_empty());
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let tmp = tempfile::tempdir().unwrap();
        let config = FilterConfig::load(tmp.path());
        assert!(!config.exclude_test_files);
    }

    #[test]
    fn test_load_parses_filter_fields() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("crate-dsm.toml"),
            "exclude_test_files = true\nexclude_patterns = [\"**/generated/**\"]\n",
        )
        .unwrap();
        let config = FilterConfig::load(tmp.path());
        assert!(config.exclude_test_files);
        assert_eq!(config.exclude_patterns, vec!["**/generated/**".to_string()]);
        assert!(!config.exclude_cfg_test, "unset flags stay default");
    }
}
