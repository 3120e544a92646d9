//! Import Graph Test Suite
//!
//! Integration tests for import parsing, resolution, source discovery and the
//! dependency inspector, run against a small project tree on disk.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use stylegraph::finder::{compilable_sources, mirror_sources, FinderOptions};
use stylegraph::parser::{parse, SyntaxMode};
use stylegraph::resolver::{normalize_path, resolve};
use stylegraph::{ImportError, Inspector};

// ============================================================================
// Test Utilities
// ============================================================================

/// Create a test file with content, returning its normalized path.
fn create_test_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    normalize_path(&path)
}

/// Project layout:
///
/// ```text
/// scss/
///   main_basic.scss      @import "vendor", "_empty";
///   main_usage.scss      @import "components/buttons";
///   main_library.scss    @import "grid";
///   main_twins_1.scss    @import "twin";
///   main_error.scss      @import "idontexist";
///   main_circular.scss   @import "circle_a";
///   _vendor.scss, _empty.scss, twin.scss, _twin.scss
///   _circle_a.scss -> _circle_b.scss -> _circle_a.scss
///   components/_buttons.scss   @import "../vendor";
/// lib_one/_grid.scss, lib_one/_vendor.scss
/// lib_two/_grid.scss
/// ```
fn create_fixture() -> TempDir {
    let temp = TempDir::new().unwrap();
    let scss = temp.path().join("scss");

    create_test_file(&scss, "main_basic.scss", "@import \"vendor\", \"_empty\";\nbody { margin: 0; }\n");
    create_test_file(&scss, "main_usage.scss", "@import \"components/buttons\";\n");
    create_test_file(&scss, "main_library.scss", "@import 'grid';\n");
    create_test_file(&scss, "main_twins_1.scss", "@import \"twin\";\n");
    create_test_file(&scss, "main_error.scss", "@import \"idontexist\";\n");
    create_test_file(&scss, "main_circular.scss", "@import \"circle_a\";\n");
    create_test_file(&scss, "_vendor.scss", "$vendor: 1;\n");
    create_test_file(&scss, "_empty.scss", "");
    create_test_file(&scss, "twin.scss", "");
    create_test_file(&scss, "_twin.scss", "");
    create_test_file(&scss, "_circle_a.scss", "@import \"circle_b\";\n");
    create_test_file(&scss, "_circle_b.scss", "@import \"circle_a\";\n");
    create_test_file(&scss, "components/_buttons.scss", "// @import \"nothing\";\n@import \"../vendor\";\n");

    create_test_file(temp.path(), "lib_one/_grid.scss", "/* one */");
    create_test_file(temp.path(), "lib_one/_vendor.scss", "/* library vendor */");
    create_test_file(temp.path(), "lib_two/_grid.scss", "/* two */");
    temp
}

fn scss(temp: &TempDir, name: &str) -> PathBuf {
    normalize_path(&temp.path().join("scss").join(name))
}

fn libraries(temp: &TempDir) -> Vec<PathBuf> {
    vec![temp.path().join("lib_one"), temp.path().join("lib_two")]
}

fn targets_of(path: &Path) -> Vec<String> {
    parse(&fs::read_to_string(path).unwrap(), SyntaxMode::for_path(path)).unwrap()
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_resolve_main_basic() {
    let temp = create_fixture();
    let main = scss(&temp, "main_basic.scss");

    let resolved = resolve(&main, &targets_of(&main), &libraries(&temp)).unwrap();
    assert_eq!(resolved, vec![scss(&temp, "_vendor.scss"), scss(&temp, "_empty.scss")]);
}

#[test]
fn test_resolve_local_match_ignores_library() {
    let temp = create_fixture();
    let main = scss(&temp, "main_basic.scss");

    let resolved = resolve(&main, &["vendor".to_string()], &libraries(&temp)).unwrap();
    assert_eq!(resolved, vec![scss(&temp, "_vendor.scss")]);
}

#[test]
fn test_resolve_first_library_wins() {
    let temp = create_fixture();
    let main = scss(&temp, "main_library.scss");

    let resolved = resolve(&main, &targets_of(&main), &libraries(&temp)).unwrap();
    assert_eq!(resolved, vec![normalize_path(&temp.path().join("lib_one/_grid.scss"))]);

    let reversed: Vec<PathBuf> = libraries(&temp).into_iter().rev().collect();
    let resolved = resolve(&main, &targets_of(&main), &reversed).unwrap();
    assert_eq!(resolved, vec![normalize_path(&temp.path().join("lib_two/_grid.scss"))]);
}

#[test]
fn test_resolve_main_twins_is_ambiguous() {
    let temp = create_fixture();
    let main = scss(&temp, "main_twins_1.scss");

    let err = resolve(&main, &targets_of(&main), &libraries(&temp)).unwrap_err();
    match err {
        ImportError::UnclearResolution { target, candidates, .. } => {
            assert_eq!(target, "twin");
            assert_eq!(candidates, vec![scss(&temp, "twin.scss"), scss(&temp, "_twin.scss")]);
        }
        other => panic!("expected ambiguity, got {other}"),
    }
}

#[test]
fn test_resolve_main_error_is_unresolvable() {
    let temp = create_fixture();
    let main = scss(&temp, "main_error.scss");

    let err = resolve(&main, &targets_of(&main), &libraries(&temp)).unwrap_err();
    assert!(matches!(err, ImportError::UnresolvablePath { ref target, .. } if target == "idontexist"));
    assert!(err.to_string().contains("idontexist"));
}

#[test]
fn test_resolve_is_idempotent() {
    let temp = create_fixture();
    let main = scss(&temp, "main_usage.scss");
    let targets = targets_of(&main);

    let first = resolve(&main, &targets, &libraries(&temp)).unwrap();
    let second = resolve(&main, &targets, &libraries(&temp)).unwrap();
    assert_eq!(first, second);
}

// ============================================================================
// Discovery
// ============================================================================

#[test]
fn test_compilable_sources_lists_main_files() {
    let temp = create_fixture();
    let sources = compilable_sources(&temp.path().join("scss"), &FinderOptions::default()).unwrap();

    let names: Vec<String> = sources.iter().map(|p| p.display().to_string()).collect();
    assert_eq!(
        names,
        vec![
            "main_basic.scss",
            "main_circular.scss",
            "main_error.scss",
            "main_library.scss",
            "main_twins_1.scss",
            "main_usage.scss",
            "twin.scss",
        ]
    );
}

#[test]
fn test_mirror_sources_into_target() {
    let temp = create_fixture();
    let root = temp.path().join("scss");
    let target = temp.path().join("css");

    let pairs = mirror_sources(&root, Some(&target), &FinderOptions::default()).unwrap();
    assert_eq!(pairs.len(), 7);
    assert_eq!(pairs[0], (root.join("main_basic.scss"), target.join("main_basic.css")));
}

// ============================================================================
// Inspector
// ============================================================================

#[test]
fn test_inspect_usage_closure() {
    let temp = create_fixture();
    let usage = scss(&temp, "main_usage.scss");
    let buttons = scss(&temp, "components/_buttons.scss");
    let vendor = scss(&temp, "_vendor.scss");

    let mut inspector = Inspector::new();
    inspector.inspect(&[&usage], &libraries(&temp)).unwrap();

    assert_eq!(inspector.children(&usage).unwrap(), &[buttons.clone(), vendor.clone()]);
    assert_eq!(inspector.parents(&vendor).unwrap(), &[buttons.clone(), usage.clone()]);
    assert_eq!(inspector.direct_parents(&vendor), &[buttons]);
}

#[test]
fn test_inspect_children_and_parents_agree() {
    let temp = create_fixture();
    let mains = [
        scss(&temp, "main_basic.scss"),
        scss(&temp, "main_usage.scss"),
        scss(&temp, "main_library.scss"),
    ];

    let mut inspector = Inspector::new();
    inspector.inspect(&mains, &libraries(&temp)).unwrap();

    for file in inspector.indexed_files() {
        let children = inspector.children(file).unwrap();
        for direct in inspector.direct_children(file) {
            assert!(children.contains(direct));
            for nested in inspector.children(direct).unwrap() {
                assert!(children.contains(nested));
            }
        }
        for child in children {
            assert!(inspector.parents(child).unwrap().contains(file));
        }
    }
}

#[test]
fn test_inspect_shared_partial_has_both_parents() {
    let temp = create_fixture();
    let basic = scss(&temp, "main_basic.scss");
    let usage = scss(&temp, "main_usage.scss");

    let mut inspector = Inspector::new();
    inspector.inspect(&[&basic, &usage], &libraries(&temp)).unwrap();

    let parents = inspector.parents(&scss(&temp, "_vendor.scss")).unwrap();
    assert!(parents.contains(&basic));
    assert!(parents.contains(&usage));
}

#[test]
fn test_inspect_cycle_raises_for_members() {
    let temp = create_fixture();
    let circular = scss(&temp, "main_circular.scss");

    let mut inspector = Inspector::new();
    inspector.inspect(&[&circular], &libraries(&temp)).unwrap();

    for member in ["_circle_a.scss", "_circle_b.scss"] {
        let path = scss(&temp, member);
        assert!(matches!(inspector.children(&path), Err(ImportError::CircularImport { .. })));
        assert!(matches!(inspector.parents(&path), Err(ImportError::CircularImport { .. })));
    }

    // The entry point is not on the cycle itself.
    let children = inspector.children(&circular).unwrap();
    assert_eq!(children.len(), 2);
}

#[test]
fn test_inspect_failure_leaves_graph_unchanged() {
    let temp = create_fixture();
    let basic = scss(&temp, "main_basic.scss");

    let mut inspector = Inspector::new();
    inspector.inspect(&[&basic], &libraries(&temp)).unwrap();
    let before = inspector.len();

    let err = inspector
        .inspect(&[scss(&temp, "main_usage.scss"), scss(&temp, "main_error.scss")], &libraries(&temp))
        .unwrap_err();
    assert!(matches!(err, ImportError::UnresolvablePath { .. }));
    assert_eq!(inspector.len(), before);
    assert!(!inspector.is_indexed(&scss(&temp, "main_usage.scss")));
}

#[test]
fn test_reset_clears_everything() {
    let temp = create_fixture();
    let circular = scss(&temp, "main_circular.scss");

    let mut inspector = Inspector::new();
    inspector.inspect(&[&circular], &[]).unwrap();
    inspector.reset();

    assert!(inspector.is_empty());
    assert!(inspector.children(&scss(&temp, "_circle_a.scss")).unwrap().is_empty());
    assert!(inspector.parents(&circular).unwrap().is_empty());
}
