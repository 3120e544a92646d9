//! Resolution of import targets to concrete files on disk
//!
//! A target such as `components/buttons` may live at any of several candidate
//! filenames: each supported extension, with or without the partial underscore
//! prefix. Candidates are looked up in the importing file's directory first,
//! then in each library path in order.
//!
//! | Target | Candidates |
//! |--------|------------|
//! | `vendor.scss` | `vendor.scss`, `_vendor.scss` |
//! | `vendor` | `vendor.scss`, `_vendor.scss`, `vendor.sass`, `_vendor.sass`, `vendor.css`, `_vendor.css` |
//!
//! Exactly one existing candidate in a directory resolves the import. Two or
//! more in the same directory is an error, never a silent pick.

use std::env;
use std::iter;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::ImportError;

/// Recognised source extensions, highest priority first.
pub const SOURCE_EXTENSIONS: [&str; 3] = ["scss", "sass", "css"];

/// Inner extensions that disqualify a file from being a source (`foo.part.scss`).
pub const DISALLOWED_PSEUDO_EXTENSIONS: [&str; 1] = ["part"];

/// Outcome of looking up candidates in one base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateMatch {
    /// No candidate exists
    None,
    /// Exactly one candidate exists
    One(PathBuf),
    /// Several candidates exist; the import is ambiguous
    Many(Vec<PathBuf>),
}

fn recognised_extension(ext: &str) -> bool {
    SOURCE_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext))
}

/// Check whether a path names a stylesheet source by its extensions.
pub fn is_allowed_source(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    if !recognised_extension(ext) {
        return false;
    }

    let inner = path.file_stem().map(Path::new).and_then(|stem| stem.extension());
    match inner.and_then(|e| e.to_str()) {
        Some(inner) => !DISALLOWED_PSEUDO_EXTENSIONS.iter().any(|d| d.eq_ignore_ascii_case(inner)),
        None => true,
    }
}

/// Build the ordered list of filenames an import target may refer to.
///
/// Leading directories are kept as written (including `..`); only the final
/// segment gets the underscore prefix.
pub fn candidate_paths(target: &str) -> Vec<PathBuf> {
    let (dir, name) = match target.rfind('/') {
        Some(idx) => (&target[..=idx], &target[idx + 1..]),
        None => ("", target),
    };
    let variants = [name.to_string(), format!("_{}", name)];

    let has_extension =
        Path::new(name).extension().and_then(|e| e.to_str()).is_some_and(recognised_extension);

    if has_extension {
        variants.iter().map(|v| PathBuf::from(format!("{}{}", dir, v))).collect()
    } else {
        SOURCE_EXTENSIONS
            .iter()
            .flat_map(|ext| variants.iter().map(move |v| PathBuf::from(format!("{}{}.{}", dir, v, ext))))
            .collect()
    }
}

/// Find which candidates exist as files under `base_dir`.
pub fn check_candidate_exists(base_dir: &Path, candidates: &[PathBuf]) -> CandidateMatch {
    let mut found: Vec<PathBuf> = candidates
        .iter()
        .map(|candidate| normalize_path(&base_dir.join(candidate)))
        .filter(|path| path.is_file())
        .collect();

    match found.len() {
        0 => CandidateMatch::None,
        1 => CandidateMatch::One(found.remove(0)),
        _ => CandidateMatch::Many(found),
    }
}

/// Resolve every target imported by `source_file` to an absolute path.
///
/// The importing file's directory is searched first, then `library_paths` in
/// order; the first directory holding any candidate decides the outcome. The
/// call fails as a whole on the first ambiguous or unresolvable target.
pub fn resolve(
    source_file: &Path,
    targets: &[String],
    library_paths: &[PathBuf],
) -> Result<Vec<PathBuf>, ImportError> {
    let source_file = normalize_path(source_file);
    let source_dir = source_file.parent().map(Path::to_path_buf).unwrap_or_default();
    let bases: Vec<PathBuf> =
        iter::once(source_dir).chain(library_paths.iter().map(|p| normalize_path(p))).collect();

    targets.iter().map(|target| resolve_target(&source_file, target, &bases)).collect()
}

fn resolve_target(
    source_file: &Path,
    target: &str,
    bases: &[PathBuf],
) -> Result<PathBuf, ImportError> {
    let candidates = candidate_paths(target);

    for base in bases {
        match check_candidate_exists(base, &candidates) {
            CandidateMatch::None => continue,
            CandidateMatch::One(path) => {
                debug!(target, resolved = %path.display(), "resolved import");
                return Ok(path);
            }
            CandidateMatch::Many(candidates) => {
                return Err(ImportError::UnclearResolution {
                    target: target.to_string(),
                    source_file: source_file.to_path_buf(),
                    base_dir: base.clone(),
                    candidates,
                });
            }
        }
    }

    Err(ImportError::UnresolvablePath {
        target: target.to_string(),
        source_file: source_file.to_path_buf(),
    })
}

/// Make a path absolute and fold `.` and `..` components lexically.
///
/// Symlinks are not followed, so two paths are the same graph node exactly
/// when they normalize to the same text.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_file(dir: &Path, relative_path: &str, content: &str) -> PathBuf {
        let path = dir.join(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("should create parent dirs");
        }
        fs::write(&path, content).expect("should write file");
        path
    }

    fn targets(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_candidates_without_extension() {
        let candidates = candidate_paths("vendor");
        let expected: Vec<PathBuf> = [
            "vendor.scss",
            "_vendor.scss",
            "vendor.sass",
            "_vendor.sass",
            "vendor.css",
            "_vendor.css",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();
        assert_eq!(candidates, expected);
    }

    #[test]
    fn test_candidates_with_extension() {
        assert_eq!(
            candidate_paths("vendor.scss"),
            vec![PathBuf::from("vendor.scss"), PathBuf::from("_vendor.scss")]
        );
        assert_eq!(
            candidate_paths("reset.css"),
            vec![PathBuf::from("reset.css"), PathBuf::from("_reset.css")]
        );
    }

    #[test]
    fn test_candidates_with_unknown_extension() {
        let candidates = candidate_paths("foo.bar");
        assert_eq!(candidates.len(), 6);
        assert_eq!(candidates[0], PathBuf::from("foo.bar.scss"));
        assert_eq!(candidates[1], PathBuf::from("_foo.bar.scss"));
    }

    #[test]
    fn test_candidates_keep_leading_dirs() {
        let candidates = candidate_paths("../components/buttons");
        assert_eq!(candidates[0], PathBuf::from("../components/buttons.scss"));
        assert_eq!(candidates[1], PathBuf::from("../components/_buttons.scss"));
        assert_eq!(candidates[5], PathBuf::from("../components/_buttons.css"));
    }

    #[test]
    fn test_candidates_of_underscored_name() {
        let candidates = candidate_paths("_empty");
        assert_eq!(candidates.len(), 6);
        assert_eq!(candidates[0], PathBuf::from("_empty.scss"));
        assert_eq!(candidates[1], PathBuf::from("__empty.scss"));
    }

    #[test]
    fn test_is_allowed_source() {
        assert!(is_allowed_source(Path::new("main.scss")));
        assert!(is_allowed_source(Path::new("main.sass")));
        assert!(is_allowed_source(Path::new("reset.css")));
        assert!(is_allowed_source(Path::new("dir/_partial.scss")));
        assert!(!is_allowed_source(Path::new("main.part.scss")));
        assert!(!is_allowed_source(Path::new("readme.md")));
        assert!(!is_allowed_source(Path::new("noextension")));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/project/./scss/../lib/_a.scss")),
            PathBuf::from("/project/lib/_a.scss")
        );
        assert_eq!(normalize_path(Path::new("/../a")), PathBuf::from("/a"));
        assert!(normalize_path(Path::new("relative/file.scss")).is_absolute());
    }

    #[test]
    fn test_check_candidate_exists() {
        let temp = TempDir::new().expect("should create temp dir");
        create_file(temp.path(), "_vendor.scss", "");

        let found = check_candidate_exists(temp.path(), &candidate_paths("vendor"));
        assert_eq!(found, CandidateMatch::One(normalize_path(&temp.path().join("_vendor.scss"))));

        let missing = check_candidate_exists(temp.path(), &candidate_paths("nope"));
        assert_eq!(missing, CandidateMatch::None);
    }

    #[test]
    fn test_check_candidate_ignores_directories() {
        let temp = TempDir::new().expect("should create temp dir");
        fs::create_dir_all(temp.path().join("vendor.scss")).expect("should create dir");

        let found = check_candidate_exists(temp.path(), &candidate_paths("vendor"));
        assert_eq!(found, CandidateMatch::None);
    }

    #[test]
    fn test_resolve_local_files() {
        let temp = TempDir::new().expect("should create temp dir");
        let main = create_file(temp.path(), "main_basic.scss", "");
        let vendor = create_file(temp.path(), "_vendor.scss", "");
        let empty = create_file(temp.path(), "_empty.scss", "");

        let resolved =
            resolve(&main, &targets(&["vendor", "_empty"]), &[]).expect("should resolve");
        assert_eq!(resolved, vec![normalize_path(&vendor), normalize_path(&empty)]);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let temp = TempDir::new().expect("should create temp dir");
        let main = create_file(temp.path(), "main.scss", "");
        create_file(temp.path(), "components/_buttons.scss", "");

        let list = targets(&["components/buttons"]);
        let first = resolve(&main, &list, &[]).expect("should resolve");
        let second = resolve(&main, &list, &[]).expect("should resolve");
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_parent_relative() {
        let temp = TempDir::new().expect("should create temp dir");
        let main = create_file(temp.path(), "scss/main.scss", "");
        let shared = create_file(temp.path(), "shared/_mixins.scss", "");

        let resolved = resolve(&main, &targets(&["../shared/mixins"]), &[]).expect("should resolve");
        assert_eq!(resolved, vec![normalize_path(&shared)]);
    }

    #[test]
    fn test_resolve_prefers_local_over_library() {
        let temp = TempDir::new().expect("should create temp dir");
        let main = create_file(temp.path(), "scss/main.scss", "");
        let local = create_file(temp.path(), "scss/_toolkit.scss", "");
        create_file(temp.path(), "lib/_toolkit.scss", "");

        let resolved = resolve(&main, &targets(&["toolkit"]), &[temp.path().join("lib")])
            .expect("should resolve");
        assert_eq!(resolved, vec![normalize_path(&local)]);
    }

    #[test]
    fn test_resolve_falls_back_to_libraries_in_order() {
        let temp = TempDir::new().expect("should create temp dir");
        let main = create_file(temp.path(), "scss/main.scss", "");
        let first = create_file(temp.path(), "lib1/_grid.scss", "");
        create_file(temp.path(), "lib2/_grid.scss", "");

        let libs = vec![temp.path().join("lib1"), temp.path().join("lib2")];
        let resolved = resolve(&main, &targets(&["grid"]), &libs).expect("should resolve");
        assert_eq!(resolved, vec![normalize_path(&first)]);
    }

    #[test]
    fn test_resolve_ambiguous_twins() {
        let temp = TempDir::new().expect("should create temp dir");
        let main = create_file(temp.path(), "main_twins_1.scss", "");
        create_file(temp.path(), "twin.scss", "");
        create_file(temp.path(), "_twin.scss", "");

        let err = resolve(&main, &targets(&["twin"]), &[]).unwrap_err();
        match err {
            ImportError::UnclearResolution { target, candidates, .. } => {
                assert_eq!(target, "twin");
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_ambiguity_does_not_fall_through() {
        let temp = TempDir::new().expect("should create temp dir");
        let main = create_file(temp.path(), "scss/main.scss", "");
        create_file(temp.path(), "scss/grid.scss", "");
        create_file(temp.path(), "scss/grid.sass", "");
        create_file(temp.path(), "lib/_grid.scss", "");

        let err = resolve(&main, &targets(&["grid"]), &[temp.path().join("lib")]).unwrap_err();
        assert!(matches!(err, ImportError::UnclearResolution { .. }));
    }

    #[test]
    fn test_resolve_unresolvable() {
        let temp = TempDir::new().expect("should create temp dir");
        let main = create_file(temp.path(), "main_error.scss", "");
        create_file(temp.path(), "_vendor.scss", "");

        let err = resolve(&main, &targets(&["vendor", "idontexist"]), &[]).unwrap_err();
        match err {
            ImportError::UnresolvablePath { target, source_file } => {
                assert_eq!(target, "idontexist");
                assert_eq!(source_file, normalize_path(&main));
            }
            other => panic!("expected unresolvable path, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_explicit_extension() {
        let temp = TempDir::new().expect("should create temp dir");
        let main = create_file(temp.path(), "main.scss", "");
        let css = create_file(temp.path(), "reset.css", "");
        create_file(temp.path(), "reset.scss", "");

        let resolved = resolve(&main, &targets(&["reset.css"]), &[]).expect("should resolve");
        assert_eq!(resolved, vec![normalize_path(&css)]);
    }
}
