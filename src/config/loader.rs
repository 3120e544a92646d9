//! Settings loading and discovery
//!
//! Provides functions to find, load, and merge project settings.

use super::schema::{OutputStyle, Settings};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Settings file names, in lookup order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["stylegraph.toml", "stylegraph.json"];

/// Settings loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse stylegraph.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// JSON parsing error
    #[error("Failed to parse stylegraph.json: {0}")]
    Json(#[from] serde_json::Error),
    /// Settings file with an extension that is neither `.toml` nor `.json`
    #[error("Unsupported settings format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    /// Validation error
    #[error("Settings validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
    /// A configured directory does not exist
    #[error("{field} does not exist: {}", .path.display())]
    MissingPath { field: String, path: PathBuf },
}

/// CLI arguments that can override settings values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override source directory
    pub source: Option<PathBuf>,
    /// Override target directory
    pub target: Option<PathBuf>,
    /// Override output style
    pub style: Option<OutputStyle>,
    /// Override source map generation
    pub source_map: Option<bool>,
    /// Library paths appended after the configured ones
    pub library_paths: Vec<PathBuf>,
}

/// Find a settings file by walking up from the current working directory.
///
/// # Returns
/// - `Some(path)` if a `stylegraph.toml` or `stylegraph.json` file is found
/// - `None` if no settings file is found
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find a settings file by walking up from a specific directory.
///
/// In each directory `stylegraph.toml` wins over `stylegraph.json`.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        for name in CONFIG_FILE_NAMES {
            let config_path = current.join(name);
            if config_path.is_file() {
                return Some(config_path);
            }
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load settings.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the settings file. If none is found, returns default settings.
///
/// # Example
/// ```ignore
/// // Load from discovered settings
/// let settings = load_config(None)?;
///
/// // Load from specific path
/// let settings = load_config(Some(Path::new("site/stylegraph.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(default_config()),
    }
}

/// Load settings from a specific file path, choosing the format by extension.
fn load_config_file(path: &Path) -> Result<Settings, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let settings: Settings = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&contents)?,
        Some("json") => serde_json::from_str(&contents)?,
        _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    };

    let errors = settings.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(settings)
}

/// Settings used when no settings file is found.
pub fn default_config() -> Settings {
    Settings::default()
}

/// Merge CLI overrides into settings.
///
/// CLI arguments take precedence over settings file values.
pub fn merge_cli_overrides(settings: &mut Settings, overrides: &CliOverrides) {
    if let Some(ref source) = overrides.source {
        settings.project.source = source.clone();
    }

    if let Some(ref target) = overrides.target {
        settings.project.target = target.clone();
    }

    if let Some(style) = overrides.style {
        settings.output.style = style;
    }

    if let Some(source_map) = overrides.source_map {
        settings.output.source_map = source_map;
    }

    for lib in &overrides.library_paths {
        if !settings.project.library_paths.contains(lib) {
            settings.project.library_paths.push(lib.clone());
        }
    }
}

/// Get the project root directory from a settings file path.
///
/// Returns the parent directory of the settings file.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

/// Resolve a path relative to the project root.
///
/// If the path is absolute, returns it unchanged.
/// If relative, joins it with the project root.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}
