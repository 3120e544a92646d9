//! Error kinds shared by import parsing, path resolution and the dependency graph.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure while extracting, resolving or walking stylesheet imports.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImportError {
    /// An import target with unbalanced or mismatched quotes
    #[error("Import rule is badly quoted: {rule}{}", in_file(.file))]
    InvalidImportRule { rule: String, file: Option<PathBuf> },

    /// No candidate for the target exists in any base directory
    #[error("Imported path '{target}' from '{}' could not be resolved", .source_file.display())]
    UnresolvablePath { target: String, source_file: PathBuf },

    /// More than one candidate exists in the same base directory
    #[error(
        "Import '{target}' from '{}' is ambiguous in '{}': {}",
        .source_file.display(),
        .base_dir.display(),
        list_paths(.candidates)
    )]
    UnclearResolution {
        target: String,
        source_file: PathBuf,
        base_dir: PathBuf,
        candidates: Vec<PathBuf>,
    },

    /// The file reaches itself through its imports
    #[error("Circular import involving '{}'", .path.display())]
    CircularImport { path: PathBuf },

    /// Filesystem failure while reading a source
    #[error("Failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ImportError {
    /// Attach the file being parsed to a quoting error that does not carry one yet.
    pub fn in_file(self, path: &Path) -> Self {
        match self {
            ImportError::InvalidImportRule { rule, file: None } => {
                ImportError::InvalidImportRule { rule, file: Some(path.to_path_buf()) }
            }
            other => other,
        }
    }

    /// Path of the file the error is about, when there is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ImportError::InvalidImportRule { file, .. } => file.as_deref(),
            ImportError::UnresolvablePath { source_file, .. }
            | ImportError::UnclearResolution { source_file, .. } => Some(source_file),
            ImportError::CircularImport { path } | ImportError::Io { path, .. } => Some(path),
        }
    }
}

fn in_file(file: &Option<PathBuf>) -> String {
    match file {
        Some(path) => format!(" (in {})", path.display()),
        None => String::new(),
    }
}

fn list_paths(paths: &[PathBuf]) -> String {
    paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
}
