//! Discovery of compilable stylesheet sources and their output paths.
//!
//! A compilable source is a stylesheet that is not a partial, is not matched
//! by an exclude pattern and does not live in a library directory. Each one is
//! mirrored into the target directory as a `.css` file with the same relative
//! path.

use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::resolver::{is_allowed_source, normalize_path};

/// Extension of compiled output files.
pub const COMPILED_EXTENSION: &str = "css";

/// Error during source discovery.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DiscoveryError {
    /// Invalid glob pattern
    #[error("Invalid exclude pattern '{0}': {1}")]
    InvalidPattern(String, glob::PatternError),
    /// Exclude matching needs a path relative to the source directory
    #[error("Expected a path relative to the source directory, got '{}'", .0.display())]
    AbsolutePath(PathBuf),
    /// IO error during file enumeration
    #[error("IO error reading '{}': {1}", .0.display())]
    Io(PathBuf, std::io::Error),
}

/// Options controlling source enumeration.
#[derive(Debug, Clone)]
pub struct FinderOptions {
    /// Descend into subdirectories
    pub recursive: bool,
    /// Return absolute paths instead of paths relative to the search root
    pub absolute: bool,
    /// Exclude patterns, matched against paths relative to the search root
    pub excludes: Vec<Pattern>,
    /// Directories skipped entirely (library paths nested in the source tree)
    pub excluded_dirs: Vec<PathBuf>,
    /// Suffix inserted before `.css` in destination names
    pub hash_suffix: Option<String>,
}

impl Default for FinderOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            absolute: false,
            excludes: Vec::new(),
            excluded_dirs: Vec::new(),
            hash_suffix: None,
        }
    }
}

/// Compile exclude glob patterns.
pub fn compile_excludes(patterns: &[String]) -> Result<Vec<Pattern>, DiscoveryError> {
    patterns
        .iter()
        .map(|p| Pattern::new(p).map_err(|e| DiscoveryError::InvalidPattern(p.clone(), e)))
        .collect()
}

/// Check whether a file is a partial (basename starts with `_`).
pub fn is_partial(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.starts_with('_'))
}

/// Check a relative path against exclude patterns.
///
/// `*` matches across directory separators, so `legacy/*` also excludes
/// `legacy/deep/main.scss`.
pub fn is_allowed(relative_path: &Path, excludes: &[Pattern]) -> Result<bool, DiscoveryError> {
    if relative_path.is_absolute() {
        return Err(DiscoveryError::AbsolutePath(relative_path.to_path_buf()));
    }
    Ok(!excludes.iter().any(|pattern| pattern.matches_path(relative_path)))
}

/// Output path for a source given relative to the source directory.
///
/// `scss/main.scss` becomes `main.css`, or `main.<hash>.css` with a hash
/// suffix, rooted under `target_dir` when one is given.
pub fn destination(relative_source: &Path, target_dir: Option<&Path>, hash_suffix: Option<&str>) -> PathBuf {
    let extension = match hash_suffix {
        Some(hash) => format!("{}.{}", hash, COMPILED_EXTENSION),
        None => COMPILED_EXTENSION.to_string(),
    };
    let relative = relative_source.with_extension(extension);
    match target_dir {
        Some(dir) => dir.join(relative),
        None => relative,
    }
}

/// Make `path` relative to the first base directory that contains it.
pub fn relative_from_paths(path: &Path, bases: &[PathBuf]) -> Option<PathBuf> {
    let path = normalize_path(path);
    bases.iter().find_map(|base| path.strip_prefix(normalize_path(base)).ok().map(Path::to_path_buf))
}

/// List compilable sources under `root`, sorted by path.
pub fn compilable_sources(root: &Path, options: &FinderOptions) -> Result<Vec<PathBuf>, DiscoveryError> {
    let root_abs = normalize_path(root);
    let excluded_dirs: Vec<PathBuf> = options.excluded_dirs.iter().map(|d| normalize_path(d)).collect();

    let mut found = Vec::new();
    gather_sources(&root_abs, &root_abs, options, &excluded_dirs, &mut found)?;

    if options.absolute {
        Ok(found)
    } else {
        Ok(found
            .into_iter()
            .filter_map(|p| p.strip_prefix(&root_abs).ok().map(Path::to_path_buf))
            .collect())
    }
}

fn gather_sources(
    root: &Path,
    dir: &Path,
    options: &FinderOptions,
    excluded_dirs: &[PathBuf],
    found: &mut Vec<PathBuf>,
) -> Result<(), DiscoveryError> {
    let io_error = |e: std::io::Error| DiscoveryError::Io(dir.to_path_buf(), e);
    let mut entries = fs::read_dir(dir)
        .map_err(io_error)?
        .map(|entry| entry.and_then(|e| Ok((e.path(), e.file_type()?))))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_error)?;
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    for (path, file_type) in entries {
        if file_type.is_dir() {
            if options.recursive && !excluded_dirs.iter().any(|d| d == &path) {
                gather_sources(root, &path, options, excluded_dirs, found)?;
            }
            continue;
        }
        // Symlinked directories are never entered; symlinked files count.
        if file_type.is_symlink() && path.is_dir() {
            continue;
        }

        if !is_allowed_source(&path) || is_partial(&path) {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(&path);
        if is_allowed(relative, &options.excludes)? {
            found.push(path);
        }
    }
    Ok(())
}

/// Pair every compilable source with its destination.
///
/// With a target directory both sides are rooted (`root/rel`, `target/rel.css`);
/// without one both stay relative to their roots.
pub fn mirror_sources(
    root: &Path,
    target_dir: Option<&Path>,
    options: &FinderOptions,
) -> Result<Vec<(PathBuf, PathBuf)>, DiscoveryError> {
    let relative_options = FinderOptions { absolute: false, ..options.clone() };
    let sources = compilable_sources(root, &relative_options)?;

    Ok(sources
        .into_iter()
        .map(|relative| {
            let dest = destination(&relative, target_dir, options.hash_suffix.as_deref());
            let source = if target_dir.is_some() { root.join(&relative) } else { relative };
            (source, dest)
        })
        .collect())
}
