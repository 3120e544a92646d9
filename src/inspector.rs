//! Dependency graph of stylesheet imports
//!
//! The [`Inspector`] indexes source files by reading their imports, resolving
//! each one to a file on disk and following the resolved files in turn. It keeps
//! direct edges in both directions plus precomputed transitive closures, so
//! asking which main files depend on a changed partial is a map lookup.
//!
//! # Example
//!
//! ```ignore
//! use stylegraph::inspector::Inspector;
//!
//! let mut inspector = Inspector::new();
//! inspector.inspect(&sources, &library_paths)?;
//! for main in inspector.parents(Path::new("scss/_variables.scss"))? {
//!     println!("needs rebuild: {}", main.display());
//! }
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::ImportError;
use crate::parser::{self, SyntaxMode};
use crate::resolver::{self, normalize_path};

type EdgeMap = HashMap<PathBuf, Vec<PathBuf>>;

/// Import dependency graph over normalized absolute paths.
#[derive(Debug, Default, Clone)]
pub struct Inspector {
    /// Indexed files in the order they were committed
    order: Vec<PathBuf>,
    /// Direct imports of each file, in import order
    direct_children: EdgeMap,
    /// Files that directly import each file, in indexing order
    direct_parents: EdgeMap,
    /// Transitive imports of each file
    children: EdgeMap,
    /// Transitive importers of each file
    parents: EdgeMap,
    /// Files reachable from themselves
    cyclic: HashSet<PathBuf>,
}

/// One file being walked: its resolved imports and the next one to visit.
struct Frame {
    path: PathBuf,
    imports: Vec<PathBuf>,
    next: usize,
}

impl Inspector {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `files` and everything they import.
    ///
    /// Files already indexed are not read again. Any read, parse or
    /// resolution failure aborts the call and leaves the graph as it was.
    pub fn inspect<P: AsRef<Path>>(
        &mut self,
        files: &[P],
        library_paths: &[PathBuf],
    ) -> Result<(), ImportError> {
        let library_paths: Vec<PathBuf> = library_paths.iter().map(|p| normalize_path(p)).collect();
        let mut staged: Vec<(PathBuf, Vec<PathBuf>)> = Vec::new();
        let mut seen: HashSet<PathBuf> = HashSet::new();

        for file in files {
            let root = normalize_path(file.as_ref());
            if self.is_indexed_key(&root) || seen.contains(&root) {
                continue;
            }
            self.walk(root, &library_paths, &mut staged, &mut seen)?;
        }

        if staged.is_empty() {
            return Ok(());
        }

        debug!(files = staged.len(), "indexed import graph batch");
        self.commit(staged);
        self.rebuild_closures();
        Ok(())
    }

    /// Depth-first walk from `root`, staging the direct imports of every file
    /// reached that is not indexed yet.
    ///
    /// The on-stack set only keeps back edges from being re-entered. Cycle
    /// members are marked afterwards by `rebuild_closures`.
    fn walk(
        &self,
        root: PathBuf,
        library_paths: &[PathBuf],
        staged: &mut Vec<(PathBuf, Vec<PathBuf>)>,
        seen: &mut HashSet<PathBuf>,
    ) -> Result<(), ImportError> {
        let mut stack: Vec<Frame> = Vec::new();
        let mut on_stack: HashSet<PathBuf> = HashSet::new();

        let imports = read_imports(&root, library_paths)?;
        seen.insert(root.clone());
        on_stack.insert(root.clone());
        staged.push((root.clone(), imports.clone()));
        stack.push(Frame { path: root, imports, next: 0 });

        loop {
            let Some(frame) = stack.last_mut() else {
                break;
            };
            let Some(child) = frame.imports.get(frame.next).cloned() else {
                if let Some(done) = stack.pop() {
                    on_stack.remove(&done.path);
                }
                continue;
            };
            frame.next += 1;

            if on_stack.contains(&child) {
                trace!(file = %child.display(), "import cycle back edge");
                continue;
            }
            if seen.contains(&child) || self.is_indexed_key(&child) {
                continue;
            }

            let imports = read_imports(&child, library_paths)?;
            seen.insert(child.clone());
            on_stack.insert(child.clone());
            staged.push((child.clone(), imports.clone()));
            stack.push(Frame { path: child, imports, next: 0 });
        }

        Ok(())
    }

    fn commit(&mut self, staged: Vec<(PathBuf, Vec<PathBuf>)>) {
        for (file, imports) in staged {
            for child in &imports {
                let parents = self.direct_parents.entry(child.clone()).or_default();
                if !parents.contains(&file) {
                    parents.push(file.clone());
                }
            }
            self.order.push(file.clone());
            self.direct_children.insert(file, imports);
        }
    }

    /// Recompute closures and cycle markers for every indexed file.
    fn rebuild_closures(&mut self) {
        let mut children = EdgeMap::with_capacity(self.order.len());
        let mut parents = EdgeMap::with_capacity(self.order.len());
        let mut cyclic = HashSet::new();

        for file in &self.order {
            let reachable = reachable_from(file, &self.direct_children);
            if reachable.contains(file) {
                cyclic.insert(file.clone());
            }
            children.insert(file.clone(), reachable);
            parents.insert(file.clone(), reachable_from(file, &self.direct_parents));
        }

        if !cyclic.is_empty() {
            debug!(files = cyclic.len(), "files involved in import cycles");
        }
        self.children = children;
        self.parents = parents;
        self.cyclic = cyclic;
    }

    /// Every file `file` imports, directly or through other imports.
    ///
    /// Unindexed files have no children. A file on an import cycle fails with
    /// [`ImportError::CircularImport`].
    pub fn children(&self, file: &Path) -> Result<&[PathBuf], ImportError> {
        self.closure(&self.children, file)
    }

    /// Every file that imports `file`, directly or through other imports.
    pub fn parents(&self, file: &Path) -> Result<&[PathBuf], ImportError> {
        self.closure(&self.parents, file)
    }

    fn closure<'a>(&'a self, map: &'a EdgeMap, file: &Path) -> Result<&'a [PathBuf], ImportError> {
        let key = normalize_path(file);
        if self.cyclic.contains(&key) {
            return Err(ImportError::CircularImport { path: key });
        }
        Ok(map.get(&key).map(Vec::as_slice).unwrap_or(&[]))
    }

    /// Files imported by `file` itself, in import order.
    pub fn direct_children(&self, file: &Path) -> &[PathBuf] {
        self.direct_children.get(&normalize_path(file)).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Files that import `file` themselves.
    pub fn direct_parents(&self, file: &Path) -> &[PathBuf] {
        self.direct_parents.get(&normalize_path(file)).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `file` has been indexed.
    pub fn is_indexed(&self, file: &Path) -> bool {
        self.is_indexed_key(&normalize_path(file))
    }

    fn is_indexed_key(&self, key: &Path) -> bool {
        self.direct_children.contains_key(key)
    }

    /// Whether `file` can reach itself through imports.
    pub fn is_cyclic(&self, file: &Path) -> bool {
        self.cyclic.contains(&normalize_path(file))
    }

    /// Indexed files in indexing order.
    pub fn indexed_files(&self) -> &[PathBuf] {
        &self.order
    }

    /// Number of indexed files.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drop every indexed file and edge.
    pub fn reset(&mut self) {
        self.order.clear();
        self.direct_children.clear();
        self.direct_parents.clear();
        self.children.clear();
        self.parents.clear();
        self.cyclic.clear();
    }
}

/// Read a source and resolve its imports, without duplicates.
fn read_imports(path: &Path, library_paths: &[PathBuf]) -> Result<Vec<PathBuf>, ImportError> {
    let content = fs::read_to_string(path)
        .map_err(|source| ImportError::Io { path: path.to_path_buf(), source })?;
    let targets =
        parser::parse(&content, SyntaxMode::for_path(path)).map_err(|e| e.in_file(path))?;
    let resolved = resolver::resolve(path, &targets, library_paths)?;

    let mut unique = Vec::with_capacity(resolved.len());
    for import in resolved {
        if !unique.contains(&import) {
            unique.push(import);
        }
    }
    trace!(file = %path.display(), imports = unique.len(), "read imports");
    Ok(unique)
}

/// Breadth-first reachability over `edges`, in first-seen order.
///
/// `start` is included only when an edge leads back to it.
fn reachable_from(start: &Path, edges: &EdgeMap) -> Vec<PathBuf> {
    let mut seen: HashSet<&Path> = HashSet::new();
    let mut found = Vec::new();
    let mut queue: VecDeque<&Path> = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        for next in edges.get(node).into_iter().flatten() {
            if seen.insert(next.as_path()) {
                found.push(next.clone());
                queue.push_back(next.as_path());
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_file(dir: &Path, relative_path: &str, content: &str) -> PathBuf {
        let path = dir.join(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("should create parent dirs");
        }
        fs::write(&path, content).expect("should write file");
        normalize_path(&path)
    }

    #[test]
    fn test_basic_children_and_parents() {
        let temp = TempDir::new().expect("should create temp dir");
        let main = create_file(temp.path(), "main_basic.scss", "@import \"vendor\", \"_empty\";");
        let vendor = create_file(temp.path(), "_vendor.scss", ".vendor { a: b; }");
        let empty = create_file(temp.path(), "_empty.scss", "");

        let mut inspector = Inspector::new();
        inspector.inspect(&[&main], &[]).expect("should index");

        assert_eq!(inspector.children(&main).unwrap(), &[vendor.clone(), empty.clone()]);
        assert_eq!(inspector.parents(&vendor).unwrap(), &[main.clone()]);
        assert_eq!(inspector.parents(&empty).unwrap(), &[main.clone()]);
        assert!(inspector.parents(&main).unwrap().is_empty());
        assert_eq!(inspector.len(), 3);
    }

    #[test]
    fn test_children_are_breadth_first() {
        let temp = TempDir::new().expect("should create temp dir");
        let main = create_file(temp.path(), "main.scss", "@import 'a';\n@import 'c';");
        let a = create_file(temp.path(), "_a.scss", "@import 'b';");
        let b = create_file(temp.path(), "_b.scss", "");
        let c = create_file(temp.path(), "_c.scss", "");

        let mut inspector = Inspector::new();
        inspector.inspect(&[&main], &[]).expect("should index");

        assert_eq!(inspector.children(&main).unwrap(), &[a.clone(), c, b.clone()]);
        assert_eq!(inspector.parents(&b).unwrap(), &[a.clone(), main.clone()]);
        assert_eq!(inspector.direct_children(&main).len(), 2);
        assert_eq!(inspector.direct_parents(&b), &[a]);
    }

    #[test]
    fn test_shared_partial_has_all_parents() {
        let temp = TempDir::new().expect("should create temp dir");
        let one = create_file(temp.path(), "one.scss", "@import 'vars';");
        let two = create_file(temp.path(), "two.scss", "@import 'vars';");
        let vars = create_file(temp.path(), "_vars.scss", "");

        let mut inspector = Inspector::new();
        inspector.inspect(&[&one, &two], &[]).expect("should index");

        assert_eq!(inspector.parents(&vars).unwrap(), &[one, two]);
    }

    #[test]
    fn test_duplicate_imports_collapse() {
        let temp = TempDir::new().expect("should create temp dir");
        let main = create_file(temp.path(), "main.scss", "@import 'a';\n@import 'a';");
        let a = create_file(temp.path(), "_a.scss", "");

        let mut inspector = Inspector::new();
        inspector.inspect(&[&main], &[]).expect("should index");
        assert_eq!(inspector.direct_children(&main), &[a]);
    }

    #[test]
    fn test_cycle_marks_every_member() {
        let temp = TempDir::new().expect("should create temp dir");
        let main = create_file(temp.path(), "main.scss", "@import 'a';");
        let a = create_file(temp.path(), "_a.scss", "@import 'b';");
        let b = create_file(temp.path(), "_b.scss", "@import 'a';");

        let mut inspector = Inspector::new();
        inspector.inspect(&[&main], &[]).expect("indexing tolerates cycles");

        for file in [&a, &b] {
            assert!(inspector.is_cyclic(file));
            assert!(matches!(inspector.children(file), Err(ImportError::CircularImport { .. })));
            assert!(matches!(inspector.parents(file), Err(ImportError::CircularImport { .. })));
        }
        assert!(!inspector.is_cyclic(&main));
        assert_eq!(inspector.children(&main).unwrap(), &[a, b]);
    }

    #[test]
    fn test_self_import_is_cyclic() {
        let temp = TempDir::new().expect("should create temp dir");
        let main = create_file(temp.path(), "main.scss", "@import 'main';");

        let mut inspector = Inspector::new();
        inspector.inspect(&[&main], &[]).expect("should index");
        assert!(matches!(
            inspector.children(&main),
            Err(ImportError::CircularImport { ref path }) if path == &main
        ));
    }

    #[test]
    fn test_failed_batch_commits_nothing() {
        let temp = TempDir::new().expect("should create temp dir");
        let good = create_file(temp.path(), "good.scss", "@import 'a';");
        create_file(temp.path(), "_a.scss", "");
        let bad = create_file(temp.path(), "main_error.scss", "@import 'idontexist';");

        let mut inspector = Inspector::new();
        let err = inspector.inspect(&[&good, &bad], &[]).unwrap_err();
        assert!(
            matches!(err, ImportError::UnresolvablePath { ref target, .. } if target == "idontexist")
        );
        assert!(inspector.is_empty());
        assert!(!inspector.is_indexed(&good));
    }

    #[test]
    fn test_failed_batch_keeps_previous_graph() {
        let temp = TempDir::new().expect("should create temp dir");
        let good = create_file(temp.path(), "good.scss", "@import 'a';");
        let a = create_file(temp.path(), "_a.scss", "");
        let bad = create_file(temp.path(), "bad.scss", "@import 'a';\n@import 'missing';");

        let mut inspector = Inspector::new();
        inspector.inspect(&[&good], &[]).expect("should index");
        assert!(inspector.inspect(&[&bad], &[]).is_err());

        assert_eq!(inspector.parents(&a).unwrap(), &[good]);
        assert!(!inspector.is_indexed(&bad));
    }

    #[test]
    fn test_ambiguous_import_aborts() {
        let temp = TempDir::new().expect("should create temp dir");
        let main = create_file(temp.path(), "main_twins_1.scss", "@import 'twin';");
        create_file(temp.path(), "twin.scss", "");
        create_file(temp.path(), "_twin.scss", "");

        let mut inspector = Inspector::new();
        let err = inspector.inspect(&[&main], &[]).unwrap_err();
        assert!(matches!(err, ImportError::UnclearResolution { .. }));
    }

    #[test]
    fn test_parse_error_names_file() {
        let temp = TempDir::new().expect("should create temp dir");
        let main = create_file(temp.path(), "main.scss", "@import \"broken;");

        let mut inspector = Inspector::new();
        let err = inspector.inspect(&[&main], &[]).unwrap_err();
        assert_eq!(err.path(), Some(main.as_path()));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp = TempDir::new().expect("should create temp dir");
        let mut inspector = Inspector::new();
        let err = inspector.inspect(&[temp.path().join("nope.scss")], &[]).unwrap_err();
        assert!(matches!(err, ImportError::Io { .. }));
    }

    #[test]
    fn test_library_imports_are_indexed() {
        let temp = TempDir::new().expect("should create temp dir");
        let lib = temp.path().join("lib");
        let main = create_file(temp.path(), "scss/main.scss", "@import 'toolkit';");
        let toolkit = create_file(&lib, "_toolkit.scss", "@import 'toolkit/grid';");
        let grid = create_file(&lib, "toolkit/_grid.scss", "");

        let mut inspector = Inspector::new();
        inspector.inspect(&[&main], &[lib]).expect("should index");

        assert_eq!(inspector.children(&main).unwrap(), &[toolkit, grid.clone()]);
        assert_eq!(inspector.parents(&grid).unwrap().last(), Some(&main));
    }

    #[test]
    fn test_indented_syntax_source() {
        let temp = TempDir::new().expect("should create temp dir");
        let main = create_file(temp.path(), "main.sass", "@import vars\n.a\n  color: red\n");
        let vars = create_file(temp.path(), "_vars.sass", "$c: red\n");

        let mut inspector = Inspector::new();
        inspector.inspect(&[&main], &[]).expect("should index");
        assert_eq!(inspector.children(&main).unwrap(), &[vars]);
    }

    #[test]
    fn test_incremental_batches_extend_closures() {
        let temp = TempDir::new().expect("should create temp dir");
        let one = create_file(temp.path(), "one.scss", "@import 'vars';");
        let vars = create_file(temp.path(), "_vars.scss", "");
        let two = create_file(temp.path(), "two.scss", "@import 'vars';");

        let mut inspector = Inspector::new();
        inspector.inspect(&[&one], &[]).expect("should index");
        inspector.inspect(&[&two, &one], &[]).expect("should index");

        assert_eq!(inspector.parents(&vars).unwrap(), &[one, two]);
        assert_eq!(inspector.len(), 3);
    }

    #[test]
    fn test_unindexed_queries_are_empty() {
        let inspector = Inspector::new();
        assert!(inspector.children(Path::new("/nowhere/a.scss")).unwrap().is_empty());
        assert!(inspector.parents(Path::new("/nowhere/a.scss")).unwrap().is_empty());
    }

    #[test]
    fn test_reset_clears_everything() {
        let temp = TempDir::new().expect("should create temp dir");
        let main = create_file(temp.path(), "main.scss", "@import 'a';");
        let a = create_file(temp.path(), "_a.scss", "@import 'main';");

        let mut inspector = Inspector::new();
        inspector.inspect(&[&main], &[]).expect("should index");
        assert!(inspector.is_cyclic(&a));

        inspector.reset();
        assert!(inspector.is_empty());
        assert!(inspector.children(&main).unwrap().is_empty());
        assert!(inspector.parents(&a).unwrap().is_empty());
    }

    #[test]
    fn test_reachable_from_excludes_start_without_cycle() {
        let mut edges = EdgeMap::new();
        edges.insert(PathBuf::from("/a"), vec![PathBuf::from("/b")]);
        edges.insert(PathBuf::from("/b"), vec![PathBuf::from("/c")]);
        assert_eq!(
            reachable_from(Path::new("/a"), &edges),
            vec![PathBuf::from("/b"), PathBuf::from("/c")]
        );

        edges.insert(PathBuf::from("/c"), vec![PathBuf::from("/a")]);
        assert!(reachable_from(Path::new("/a"), &edges).contains(&PathBuf::from("/a")));
    }
}
