//! Configuration loading: category table, file filters and history location.
//!
//! Configuration is read from TOML or JSON. The TOML layout is:
//!
//! ```toml
//! [categories]
//! Images = ["jpg", ".png"]
//! Documents = [".pdf", "txt"]
//!
//! [filters]
//! enable_hidden_files = false
//!
//! [filters.exclude]
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["*.tmp", "node_modules/**"]
//! extensions = ["bak", "tmp"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//!
//! [history]
//! path = "/var/lib/tidyfold/history.json"
//! ```
//!
//! A bare JSON object mapping category names to extension lists is accepted as
//! well and is read as the `categories` table alone. Category order in the file
//! is the lookup order.

use crate::file_category::ExtensionMap;
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-directory configuration file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = ".tidyfoldrc.toml";

const SECTION_KEYS: &[&str] = &["categories", "filters", "history"];

/// Errors that can occur during configuration loading and filter compilation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML/JSON syntax or structure.
    #[error("Invalid configuration in {}: {reason}", path.display())]
    ConfigInvalid { path: PathBuf, reason: String },
    /// Invalid glob pattern provided.
    #[error("Invalid glob pattern '{0}': expected *.ext or dir/**")]
    InvalidGlobPattern(String),
    /// Invalid regex pattern provided.
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },
    /// IO error while reading configuration.
    #[error("IO error reading configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Category table used for by-type organizing and stats.
    #[serde(default)]
    pub categories: ExtensionMap,

    /// Which files take part in a scan.
    #[serde(default)]
    pub filters: FilterRules,

    #[serde(default)]
    pub history: HistorySettings,
}

/// Where the move history is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySettings {
    /// Explicit history file. Defaults to a hidden file inside the target root.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Root-level filter rules configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether to include hidden files (starting with "."). Defaults to false.
    #[serde(default = "default_enable_hidden_files")]
    pub enable_hidden_files: bool,

    /// Rules for excluding files.
    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Rules for including files (whitelist, overrides exclude rules).
    #[serde(default)]
    pub include: IncludeRules,
}

fn default_enable_hidden_files() -> bool {
    false
}

/// Rules for excluding files from a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g., ".DS_Store", "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the path relative to the scan root.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude, with or without the leading dot.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Rules for including files, overriding exclude rules (whitelist).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeRules {
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl Config {
    /// Load configuration, with fallback to defaults.
    ///
    /// Lookup order:
    /// 1. `config_path`, if provided
    /// 2. `.tidyfoldrc.toml` in the current directory
    /// 3. `<config dir>/tidyfold/config.toml` (e.g. `~/.config/tidyfold/config.toml`)
    /// 4. Built-in defaults
    ///
    /// # Errors
    ///
    /// Returns an error if a file is found (or explicitly given) but cannot be
    /// read or parsed, or if its filters don't compile.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match Self::locate(config_path) {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };
        // Surface bad patterns at load time rather than at the first scan.
        config.filters.compile()?;
        Ok(config)
    }

    /// Like [`Config::load`], but recovers from any error by returning the
    /// defaults together with the error so the caller can warn about it.
    pub fn load_or_default(config_path: Option<&Path>) -> (Self, Option<ConfigError>) {
        match Self::load(config_path) {
            Ok(config) => (config, None),
            Err(e) => {
                log::warn!("{}; falling back to default configuration", e);
                (Self::default(), Some(e))
            }
        }
    }

    fn locate(config_path: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = config_path {
            return Some(path.to_path_buf());
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tidyfold").join("config.toml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }

    /// Load configuration from a specific file. `.json` files are parsed as
    /// JSON, everything else as TOML.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config = if is_json {
            Self::parse_json(&content)
        } else {
            Self::parse_toml(&content)
        }
        .map_err(|reason| ConfigError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        })?;

        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parses TOML configuration text.
    pub fn parse_toml(content: &str) -> Result<Self, String> {
        let table: toml::Table = toml::from_str(content).map_err(|e| e.to_string())?;
        if is_sectioned(table.keys()) {
            toml::Value::Table(table)
                .try_into()
                .map_err(|e: toml::de::Error| e.to_string())
        } else {
            let categories = toml::Value::Table(table)
                .try_into()
                .map_err(|e: toml::de::Error| e.to_string())?;
            Ok(Self {
                categories,
                ..Self::default()
            })
        }
    }

    /// Parses JSON configuration text, accepting the bare category object form.
    pub fn parse_json(content: &str) -> Result<Self, String> {
        let value: serde_json::Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
        let object = value
            .as_object()
            .ok_or_else(|| "expected a JSON object at the top level".to_string())?;

        if is_sectioned(object.keys()) {
            serde_json::from_value(value).map_err(|e| e.to_string())
        } else {
            let categories = serde_json::from_value(value).map_err(|e| e.to_string())?;
            Ok(Self {
                categories,
                ..Self::default()
            })
        }
    }

    /// Compiles the filter rules.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        self.filters.compile()
    }
}

fn is_sectioned<'a>(mut keys: impl Iterator<Item = &'a String>) -> bool {
    keys.any(|key| SECTION_KEYS.contains(&key.as_str()))
}

impl FilterRules {
    /// Compile rules into optimized filter structures for matching.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob patterns are invalid.
    pub fn compile(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(self)
    }
}

/// Compiled filter structures for file matching.
#[derive(Debug, Clone)]
pub struct CompiledFilters {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
    excluded_paths: HashSet<PathBuf>,
}

impl CompiledFilters {
    fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let compile_globs = |patterns: &[String]| {
            patterns
                .iter()
                .map(|pattern| {
                    Pattern::new(pattern)
                        .map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
                })
                .collect::<Result<Vec<_>, _>>()
        };

        let exclude_patterns = compile_globs(&rules.exclude.patterns)?;
        let include_patterns = compile_globs(&rules.include.patterns)?;

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
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns,
            exclude_regexes,
            include_patterns,
            excluded_paths: HashSet::new(),
        })
    }

    /// Always skips this exact path, regardless of include rules. Used to keep
    /// the history file out of the scan that it records.
    pub fn exclude_path(&mut self, path: &Path) {
        self.excluded_paths.insert(path.to_path_buf());
    }

    /// Whether `absolute` was registered through [`CompiledFilters::exclude_path`].
    pub fn is_excluded_path(&self, absolute: &Path) -> bool {
        self.excluded_paths.contains(absolute)
    }

    /// Whether a recursive scan should enter `dir_path` (relative to the scan root).
    pub fn should_descend(&self, dir_path: &Path) -> bool {
        let hidden = dir_path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('.'));
        self.enable_hidden_files || !hidden
    }

    /// Check if a file should take part in a scan.
    ///
    /// `file_path` is the path relative to the scan root. Checks run in this
    /// order, with early termination:
    /// 1. Include patterns (whitelist) - if matched, always include
    /// 2. Hidden file filter - if hidden and disabled, exclude
    /// 3. Exact filename match - if matched, exclude
    /// 4. File extension match - if matched, exclude
    /// 5. Glob pattern match - if matched, exclude
    /// 6. Regex pattern match - if matched, exclude
    /// 7. Default: include
    pub fn should_include(&self, file_path: &Path) -> bool {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.matches_include_patterns(file_path) {
            return true;
        }

        if !self.enable_hidden_files && file_name.starts_with('.') {
            return false;
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

        if self.matches_exclude_patterns(file_path) {
            return false;
        }

        !self.matches_exclude_regex(&file_name)
    }

    fn matches_include_patterns(&self, file_path: &Path) -> bool {
        self.include_patterns
            .iter()
            .any(|pattern| pattern.matches_path(file_path))
    }

    fn matches_exclude_patterns(&self, file_path: &Path) -> bool {
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.matches_path(file_path))
    }

    fn matches_exclude_regex(&self, file_name: &str) -> bool {
        self.exclude_regexes
            .iter()
            .any(|regex| regex.is_match(file_name))
    }
}

impl Default for CompiledFilters {
    fn default() -> Self {
        Self {
            enable_hidden_files: false,
            exclude_filenames: HashSet::new(),
            exclude_extensions: HashSet::new(),
            exclude_patterns: Vec::new(),
            exclude_regexes: Vec::new(),
            include_patterns: Vec::new(),
            excluded_paths: HashSet::new(),
        }
    }
}
