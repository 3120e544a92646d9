//! Build context containing settings and resolved paths for a build.

use crate::compiler::CompileOptions;
use crate::config::{ConfigError, Settings};
use crate::finder::{self, compile_excludes, DiscoveryError, FinderOptions};
use crate::resolver::{is_allowed_source, normalize_path};
use std::path::{Path, PathBuf};

/// Build context containing settings and paths for a build operation.
///
/// Relative settings paths are resolved against the project root (the
/// directory holding the settings file).
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The loaded settings
    settings: Settings,
    /// Project root directory (where the settings file is located)
    project_root: PathBuf,
    /// Whether to run in verbose mode
    verbose: bool,
}

impl BuildContext {
    /// Create a new build context.
    ///
    /// # Arguments
    /// - `settings` - The loaded settings
    /// - `project_root` - The project root directory
    pub fn new(settings: Settings, project_root: PathBuf) -> Self {
        Self { settings, project_root: normalize_path(&project_root), verbose: false }
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Get the source directory (resolved to absolute path).
    pub fn source_dir(&self) -> PathBuf {
        self.resolve_path(&self.settings.project.source)
    }

    /// Get the target directory (resolved to absolute path).
    pub fn target_dir(&self) -> PathBuf {
        self.resolve_path(&self.settings.project.target)
    }

    /// Get the library paths (resolved to absolute paths), in search order.
    pub fn library_paths(&self) -> Vec<PathBuf> {
        self.settings.project.library_paths.iter().map(|p| self.resolve_path(p)).collect()
    }

    /// Whether verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Resolve a path relative to the project root.
    ///
    /// If the path is absolute, returns it normalized.
    /// If relative, joins it with the project root first.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        normalize_path(&self.project_root.join(path))
    }

    /// Check that the source directory and every library path exist.
    pub fn verify_paths(&self) -> Result<(), ConfigError> {
        let source = self.source_dir();
        if !source.is_dir() {
            return Err(ConfigError::MissingPath { field: "project.source".to_string(), path: source });
        }
        for (i, lib) in self.library_paths().into_iter().enumerate() {
            if !lib.is_dir() {
                return Err(ConfigError::MissingPath {
                    field: format!("project.library_paths[{}]", i),
                    path: lib,
                });
            }
        }
        Ok(())
    }

    /// Finder options for enumerating main sources.
    ///
    /// Library directories nested inside the source directory are skipped.
    pub fn finder_options(&self) -> Result<FinderOptions, DiscoveryError> {
        Ok(FinderOptions {
            recursive: true,
            absolute: true,
            excludes: compile_excludes(&self.settings.project.excludes)?,
            excluded_dirs: self.library_paths(),
            hash_suffix: self.settings.output.hash_suffix.clone(),
        })
    }

    /// Options handed to the compiler.
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            style: self.settings.output.style,
            source_map: self.settings.output.source_map,
            library_paths: self.library_paths(),
        }
    }

    /// Whether `path` is a main source this project compiles.
    ///
    /// It must live under the source directory but outside every library
    /// path, be a stylesheet, not be a partial and not match an exclude.
    pub fn is_main_source(&self, path: &Path, options: &FinderOptions) -> bool {
        let path = normalize_path(path);
        let Ok(relative) = path.strip_prefix(self.source_dir()) else {
            return false;
        };
        if options.excluded_dirs.iter().any(|lib| path.starts_with(lib)) {
            return false;
        }
        if !is_allowed_source(&path) || finder::is_partial(&path) {
            return false;
        }
        finder::is_allowed(relative, &options.excludes).unwrap_or(false)
    }

    /// Output path for a main source, or `None` if it is outside the source directory.
    pub fn destination_for(&self, source: &Path) -> Option<PathBuf> {
        let relative = finder::relative_from_paths(source, &[self.source_dir()])?;
        let target = self.target_dir();
        Some(finder::destination(
            &relative,
            Some(&target),
            self.settings.output.hash_suffix.as_deref(),
        ))
    }
}
