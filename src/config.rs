//! File filtering and watch configuration.
//!
//! Configuration is optional. When present it is read once, before the
//! engine is built, and supports:
//! - Exact filename exclusion
//! - Glob pattern exclusion
//! - File extension exclusion
//! - Regex pattern exclusion
//! - Include (whitelist) patterns that override exclude rules
//! - The settle delay used in watch mode
//!
//! Hidden files are always left alone by the engine, include rules or not.
//!
//! # Configuration File Format
//!
//! ```toml
//! [filters.exclude]
//! filenames = ["Thumbs.db", "desktop.ini"]
//! patterns = ["*.tmp", "*.part"]
//! extensions = ["crdownload"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//!
//! [watch]
//! settle_delay_ms = 1000
//! ```

use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_NAME: &str = ".smart-organizer.toml";

/// Lower bound for the watch settle delay.
pub const MIN_SETTLE_DELAY_MS: u64 = 1000;

/// Errors that can occur during configuration loading and filtering.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
    #[error("Invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },
    #[error("IO error reading configuration: {0}")]
    IoError(String),
}

/// Top-level configuration file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizerConfig {
    #[serde(default)]
    pub filters: FilterRules,
    #[serde(default)]
    pub watch: WatchSettings,
}

/// Which files the organizer should leave in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRules {
    #[serde(default)]
    pub exclude: ExcludeRules,
    /// Rules for including files (whitelist, overrides exclude rules).
    #[serde(default)]
    pub include: IncludeRules,
}

/// Rules for excluding files from organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g., "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the file name (e.g., "*.tmp").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude, without the dot.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Rules for including files, overriding exclude rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Watch mode tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchSettings {
    /// Wait after a creation event before touching the file.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

fn default_settle_delay_ms() -> u64 {
    MIN_SETTLE_DELAY_MS
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl WatchSettings {
    /// The configured delay, never shorter than one second.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms.max(MIN_SETTLE_DELAY_MS))
    }
}

impl OrganizerConfig {
    /// Load configuration, falling back to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.smart-organizer.toml` in the target directory
    /// 3. Look for `~/.config/smart-organizer/config.toml`
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but cannot be read,
    /// or if any discovered file is not valid TOML.
    pub fn load(config_path: Option<&Path>, target_dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = target_dir.join(LOCAL_CONFIG_NAME);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("smart-organizer")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        tracing::debug!(path = %path.display(), "loaded configuration");

        toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Compile the filter rules for matching.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob patterns are invalid.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.filters)
    }
}

/// Pre-compiled filter rules.
#[derive(Debug, Clone)]
pub struct CompiledFilters {
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl CompiledFilters {
    fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns: compile_globs(&rules.exclude.patterns)?,
            exclude_regexes,
            include_patterns: compile_globs(&rules.include.patterns)?,
        })
    }

    /// Check if a file should be organized.
    ///
    /// Checks are performed in this order, with early termination:
    /// 1. Include patterns - if matched, always include
    /// 2. Exact filename match - if matched, exclude
    /// 3. File extension match - if matched, exclude
    /// 4. Glob pattern match - if matched, exclude
    /// 5. Regex pattern match - if matched, exclude
    /// 6. Default: include
    pub fn should_include(&self, file_path: &Path) -> bool {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.include_patterns.iter().any(|p| p.matches_path(file_path)) {
            return true;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if let Some(ext) = file_path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return false;
            }
        }

        if self.exclude_patterns.iter().any(|p| p.matches_path(file_path)) {
            return false;
        }

        !self.exclude_regexes.iter().any(|re| re.is_match(&file_name))
    }
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn filters(toml_source: &str) -> CompiledFilters {
        let config: OrganizerConfig = toml::from_str(toml_source).expect("valid config");
        config.compile_filters().expect("valid filters")
    }

    #[test]
    fn test_default_config_includes_everything() {
        let compiled = OrganizerConfig::default().compile_filters().unwrap();
        assert!(compiled.should_include(Path::new("anything.pdf")));
        assert!(compiled.should_include(Path::new("Makefile")));
    }

    #[test]
    fn test_exclude_exact_filename() {
        let compiled = filters(
            r#"
            [filters.exclude]
            filenames = ["Thumbs.db"]
            "#,
        );
        assert!(!compiled.should_include(Path::new("Thumbs.db")));
        assert!(compiled.should_include(Path::new("image.jpg")));
    }

    #[test]
    fn test_exclude_extensions_case_insensitive() {
        let compiled = filters(
            r#"
            [filters.exclude]
            extensions = ["crdownload", ".PART"]
            "#,
        );
        assert!(!compiled.should_include(Path::new("movie.mp4.crdownload")));
        assert!(!compiled.should_include(Path::new("file.CRDOWNLOAD")));
        assert!(!compiled.should_include(Path::new("file.part")));
        assert!(compiled.should_include(Path::new("file.mp4")));
    }

    #[test]
    fn test_exclude_glob_and_character_class() {
        let compiled = filters(
            r#"
            [filters.exclude]
            patterns = ["*.tmp", "[0-9]*.log", "file?.txt"]
            "#,
        );
        assert!(!compiled.should_include(Path::new("cache.tmp")));
        assert!(!compiled.should_include(Path::new("1debug.log")));
        assert!(compiled.should_include(Path::new("debug.log")));
        assert!(!compiled.should_include(Path::new("file1.txt")));
        assert!(compiled.should_include(Path::new("file12.txt")));
    }

    #[test]
    fn test_exclude_regex() {
        let compiled = filters(
            r#"
            [filters.exclude]
            regex = ['^~\$.*']
            "#,
        );
        assert!(!compiled.should_include(Path::new("~$report.docx")));
        assert!(compiled.should_include(Path::new("report.docx")));
    }

    #[test]
    fn test_include_overrides_exclude() {
        let compiled = filters(
            r#"
            [filters.exclude]
            extensions = ["tmp"]

            [filters.include]
            patterns = ["keep_*.tmp"]
            "#,
        );
        assert!(compiled.should_include(Path::new("keep_me.tmp")));
        assert!(!compiled.should_include(Path::new("drop_me.tmp")));
    }

    #[test]
    fn test_invalid_patterns_return_errors() {
        let config: OrganizerConfig = toml::from_str(
            r#"
            [filters.exclude]
            regex = ["[invalid("]
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.compile_filters(),
            Err(ConfigError::InvalidRegexPattern { .. })
        ));

        let config: OrganizerConfig = toml::from_str(
            r#"
            [filters.exclude]
            patterns = ["[invalid"]
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.compile_filters(),
            Err(ConfigError::InvalidGlobPattern(_))
        ));
    }

    #[test]
    fn test_settle_delay_has_a_floor() {
        let config: OrganizerConfig = toml::from_str("[watch]\nsettle_delay_ms = 10").unwrap();
        assert_eq!(config.watch.settle_delay(), Duration::from_secs(1));

        let config: OrganizerConfig = toml::from_str("[watch]\nsettle_delay_ms = 2500").unwrap();
        assert_eq!(config.watch.settle_delay(), Duration::from_millis(2500));

        assert_eq!(
            OrganizerConfig::default().watch.settle_delay(),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_load_from_target_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(
            temp_dir.path().join(LOCAL_CONFIG_NAME),
            "[watch]\nsettle_delay_ms = 3000\n",
        )
        .unwrap();

        let config = OrganizerConfig::load(None, temp_dir.path()).unwrap();
        assert_eq!(config.watch.settle_delay_ms, 3000);
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let missing = temp_dir.path().join("nope.toml");

        let result = OrganizerConfig::load(Some(&missing), temp_dir.path());
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("bad.toml");
        fs::write(&path, "[filters\n").unwrap();

        let result = OrganizerConfig::load(Some(&path), temp_dir.path());
        assert!(matches!(result, Err(ConfigError::ConfigInvalid(_))));
    }
}
