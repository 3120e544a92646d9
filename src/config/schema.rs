//! Settings schema for `stylegraph.toml`
//!
//! Defines the structure and validation rules for project settings. The same
//! schema is accepted from `stylegraph.json`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CSS output formatting
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    /// Nested indentation (rendered as expanded by Dart Sass)
    Nested,
    /// One declaration per line
    #[default]
    Expanded,
    /// One rule per line (rendered as compressed by Dart Sass)
    Compact,
    /// Minified output
    Compressed,
}

impl OutputStyle {
    /// Style name understood by the `sass` command line.
    pub fn sass_style(&self) -> &'static str {
        match self {
            OutputStyle::Nested | OutputStyle::Expanded => "expanded",
            OutputStyle::Compact | OutputStyle::Compressed => "compressed",
        }
    }
}

impl std::fmt::Display for OutputStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OutputStyle::Nested => "nested",
            OutputStyle::Expanded => "expanded",
            OutputStyle::Compact => "compact",
            OutputStyle::Compressed => "compressed",
        };
        write!(f, "{}", name)
    }
}

/// Source and output layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Directory holding stylesheet sources
    #[serde(default = "default_source")]
    pub source: PathBuf,
    /// Directory receiving compiled `.css` files
    #[serde(default = "default_target")]
    pub target: PathBuf,
    /// Extra import search directories, searched in order
    #[serde(default)]
    pub library_paths: Vec<PathBuf>,
    /// Glob patterns (relative to `source`) of sources never compiled
    #[serde(default)]
    pub excludes: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            target: default_target(),
            library_paths: Vec::new(),
            excludes: Vec::new(),
        }
    }
}

fn default_source() -> PathBuf {
    PathBuf::from("scss")
}

fn default_target() -> PathBuf {
    PathBuf::from("css")
}

/// Compiled output options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// CSS output style
    #[serde(default)]
    pub style: OutputStyle,
    /// Embed a source map in each compiled file
    #[serde(default)]
    pub source_map: bool,
    /// Suffix inserted before `.css` (`main.<suffix>.css`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_suffix: Option<String>,
}

/// External compiler invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Executable to run
    #[serde(default = "default_program")]
    pub program: String,
    /// Extra arguments placed before the generated ones
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self { program: default_program(), args: Vec::new() }
    }
}

fn default_program() -> String {
    "sass".to_string()
}

/// Watch mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Clear terminal between rebuilds
    #[serde(default)]
    pub clear_screen: bool,
}

fn default_debounce_ms() -> u32 {
    200
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), clear_screen: false }
    }
}

/// Complete project settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Source/target layout
    #[serde(default)]
    pub project: ProjectConfig,
    /// Output options
    #[serde(default)]
    pub output: OutputConfig,
    /// Compiler invocation
    #[serde(default)]
    pub compiler: CompilerConfig,
    /// Watch mode settings
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Settings validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "project.target")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "settings: '{}' {}", self.field, self.message)
    }
}

impl Settings {
    /// Validate the settings and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.project.source.as_os_str().is_empty() {
            errors.push(ConfigValidationError {
                field: "project.source".to_string(),
                message: "must be a non-empty path".to_string(),
            });
        }

        if self.project.target.as_os_str().is_empty() {
            errors.push(ConfigValidationError {
                field: "project.target".to_string(),
                message: "must be a non-empty path".to_string(),
            });
        } else if self.project.target == self.project.source {
            errors.push(ConfigValidationError {
                field: "project.target".to_string(),
                message: "must differ from project.source".to_string(),
            });
        }

        for (i, lib) in self.project.library_paths.iter().enumerate() {
            if lib.as_os_str().is_empty() {
                errors.push(ConfigValidationError {
                    field: format!("project.library_paths[{}]", i),
                    message: "must be a non-empty path".to_string(),
                });
            }
        }

        if let Some(ref hash) = self.output.hash_suffix {
            if hash.is_empty() || hash.contains('/') || hash.contains('\\') {
                errors.push(ConfigValidationError {
                    field: "output.hash_suffix".to_string(),
                    message: "must be non-empty and contain no path separators".to_string(),
                });
            }
        }

        if self.compiler.program.trim().is_empty() {
            errors.push(ConfigValidationError {
                field: "compiler.program".to_string(),
                message: "must name an executable".to_string(),
            });
        }

        if self.watch.debounce_ms == 0 {
            errors.push(ConfigValidationError {
                field: "watch.debounce_ms".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
