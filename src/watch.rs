//! Watch mode for incremental rebuilds on file changes
//!
//! A [`WatchHandler`] keeps the import graph of a project and maps every
//! changed stylesheet to the main sources that must be compiled again.
//! [`watch_and_rebuild`] drives it from debounced file system events for the
//! `stylegraph watch` command.

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::build::{BuildContext, BuildError, BuildPipeline, BuildResult};
use crate::compiler::Compiler;
use crate::config::schema::WatchConfig;
use crate::error::ImportError;
use crate::finder::{compilable_sources, DiscoveryError, FinderOptions};
use crate::inspector::Inspector;
use crate::resolver::{is_allowed_source, normalize_path};

/// Error during watch mode
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(notify::Error),
    /// Failed to add watch path
    #[error("Failed to watch '{}': {1}", .0.display())]
    WatchPath(PathBuf, notify::Error),
    /// Channel receive error
    #[error("Watch channel error: {0}")]
    Channel(String),
    /// Source directory not found
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    /// The import graph could not be built
    #[error("Indexing failed: {0}")]
    Index(#[from] ImportError),
    /// Source enumeration failed
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    /// Compilation could not run
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Tracks sources that failed to compile across rebuilds for recovery detection
#[derive(Debug, Default)]
pub struct ErrorTracker {
    /// Sources whose last compilation failed
    files_with_errors: HashSet<PathBuf>,
}

impl ErrorTracker {
    /// Create a new error tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Update tracker with a build result, returns the sources fixed by it.
    ///
    /// Only sources present in `result` change state; a partial rebuild does
    /// not clear errors of sources it did not compile.
    pub fn update(&mut self, result: &BuildResult) -> Vec<PathBuf> {
        let mut fixed = Vec::new();
        for compiled in &result.results {
            if compiled.status.is_failure() {
                self.files_with_errors.insert(compiled.source.clone());
            } else if self.files_with_errors.remove(&compiled.source) {
                fixed.push(compiled.source.clone());
            }
        }
        fixed.sort();
        fixed
    }

    /// Check if there are any tracked errors
    pub fn has_errors(&self) -> bool {
        !self.files_with_errors.is_empty()
    }

    /// Get the number of sources with errors
    pub fn error_count(&self) -> usize {
        self.files_with_errors.len()
    }
}

/// Options for watch mode
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    /// Watch configuration (debounce, clear screen)
    pub config: WatchConfig,
    /// Verbose output
    pub verbose: bool,
}

/// Where a changed file sits in the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    /// Under the source directory
    Project,
    /// Under a library path; never compiled itself
    Library,
}

#[derive(Debug)]
struct Change {
    path: PathBuf,
    role: Role,
    /// Parents known before the change, kept for removed files
    previous_parents: Option<Vec<PathBuf>>,
}

/// What a batch of changes led to.
#[derive(Debug)]
pub enum ChangeOutcome {
    /// No changed path is a stylesheet of this project
    Ignored,
    /// Re-indexing failed; nothing was compiled
    IndexFailed(ImportError),
    /// The affected main sources were compiled
    Rebuilt(BuildResult),
}

/// Keeps the import graph of a project and recompiles what a change affects.
pub struct WatchHandler<C: Compiler> {
    pipeline: BuildPipeline,
    compiler: C,
    inspector: Inspector,
    finder_options: FinderOptions,
    index_error: Option<String>,
}

impl<C: Compiler> WatchHandler<C> {
    /// Create a handler for the project described by `context`.
    ///
    /// The graph is empty until [`WatchHandler::index`] runs.
    pub fn new(context: BuildContext, compiler: C) -> Result<Self, WatchError> {
        let finder_options = context.finder_options()?;
        Ok(Self {
            pipeline: BuildPipeline::new(context),
            compiler,
            inspector: Inspector::new(),
            finder_options,
            index_error: None,
        })
    }

    /// Replace the pipeline settings (jobs, fail-fast) used for rebuilds.
    pub fn with_pipeline(mut self, configure: impl FnOnce(BuildPipeline) -> BuildPipeline) -> Self {
        self.pipeline = configure(self.pipeline);
        self
    }

    /// The project being watched.
    pub fn context(&self) -> &BuildContext {
        self.pipeline.context()
    }

    /// The current import graph.
    pub fn inspector(&self) -> &Inspector {
        &self.inspector
    }

    /// Message of the last indexing failure, cleared by a successful index.
    pub fn index_error(&self) -> Option<&str> {
        self.index_error.as_deref()
    }

    /// Rebuild the import graph from every compilable source.
    ///
    /// On failure the previous graph is kept. Returns the number of indexed files.
    pub fn index(&mut self) -> Result<usize, WatchError> {
        let sources = compilable_sources(&self.context().source_dir(), &self.finder_options)?;
        let mut inspector = Inspector::new();
        inspector.inspect(&sources, &self.context().library_paths())?;
        debug!(sources = sources.len(), files = inspector.len(), "indexed project");
        self.inspector = inspector;
        self.index_error = None;
        Ok(self.inspector.len())
    }

    /// Compile every main source.
    pub fn build_all(&self) -> Result<BuildResult, WatchError> {
        Ok(self.pipeline.build(&self.compiler)?)
    }

    /// Whether `path` is a stylesheet under the source directory or a library path.
    pub fn is_relevant(&self, path: &Path) -> bool {
        is_allowed_source(path) && self.role_of(&normalize_path(path)).is_some()
    }

    fn role_of(&self, path: &Path) -> Option<Role> {
        let ctx = self.context();
        if ctx.library_paths().iter().any(|lib| path.starts_with(lib)) {
            Some(Role::Library)
        } else if path.starts_with(ctx.source_dir()) {
            Some(Role::Project)
        } else {
            None
        }
    }

    fn is_main(&self, path: &Path) -> bool {
        self.context().is_main_source(path, &self.finder_options)
    }

    /// Main sources that depend on `path`, plus `path` itself when
    /// `include_self` is set and it is a main source.
    pub fn affected_sources(&self, path: &Path, include_self: bool) -> Result<Vec<PathBuf>, ImportError> {
        let path = normalize_path(path);
        let mut affected = Vec::new();
        if include_self && self.is_main(&path) {
            affected.push(path.clone());
        }
        for parent in self.inspector.parents(&path)? {
            if self.is_main(parent) && !affected.contains(parent) {
                affected.push(parent.clone());
            }
        }
        Ok(affected)
    }

    /// Handle one changed path.
    pub fn handle_change(&mut self, path: &Path) -> Result<ChangeOutcome, WatchError> {
        self.handle_changes(&[path.to_path_buf()])
    }

    /// Handle a batch of changed paths with a single re-index and rebuild.
    pub fn handle_changes(&mut self, paths: &[PathBuf]) -> Result<ChangeOutcome, WatchError> {
        let mut changes: Vec<Change> = Vec::new();
        for path in paths {
            let path = normalize_path(path);
            if !is_allowed_source(&path) || changes.iter().any(|c| c.path == path) {
                continue;
            }
            let Some(role) = self.role_of(&path) else {
                continue;
            };
            let previous_parents = if path.exists() {
                None
            } else {
                Some(self.inspector.parents(&path).map(<[PathBuf]>::to_vec).unwrap_or_default())
            };
            changes.push(Change { path, role, previous_parents });
        }

        if changes.is_empty() {
            return Ok(ChangeOutcome::Ignored);
        }

        match self.index() {
            Ok(_) => {}
            Err(WatchError::Index(e)) => return Ok(self.index_failed(e)),
            Err(e) => return Err(e),
        }

        let mut sources: Vec<PathBuf> = Vec::new();
        for change in &changes {
            let affected = match &change.previous_parents {
                Some(previous) => {
                    previous.iter().filter(|p| p.exists() && self.is_main(p)).cloned().collect()
                }
                None => match self.affected_sources(&change.path, change.role == Role::Project) {
                    Ok(affected) => affected,
                    Err(e) => return Ok(self.index_failed(e)),
                },
            };
            for source in affected {
                if !sources.contains(&source) {
                    sources.push(source);
                }
            }
        }

        debug!(changed = changes.len(), affected = sources.len(), "rebuilding affected sources");
        let result = self.pipeline.build_sources(&self.compiler, &sources)?;
        Ok(ChangeOutcome::Rebuilt(result))
    }

    fn index_failed(&mut self, e: ImportError) -> ChangeOutcome {
        error!(error = %e, "import graph is broken, nothing compiled");
        self.index_error = Some(e.to_string());
        ChangeOutcome::IndexFailed(e)
    }
}

/// Clear the terminal screen
fn clear_screen() {
    // ANSI escape code to clear screen and move cursor to top-left
    print!("\x1B[2J\x1B[1;1H");
}

/// Format duration for display
fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// Get current timestamp for logging
fn timestamp() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs() % 86400;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Directories to watch: the source directory and every library path outside it.
fn watch_roots(context: &BuildContext) -> Vec<PathBuf> {
    let source = context.source_dir();
    let mut roots = vec![source.clone()];
    for lib in context.library_paths() {
        if !lib.starts_with(&source) && !roots.contains(&lib) {
            roots.push(lib);
        }
    }
    roots
}

/// Watch for file changes and rebuild affected sources.
///
/// This function blocks and runs until interrupted (Ctrl+C).
///
/// # Example
/// ```ignore
/// let handler = WatchHandler::new(context, SassCommand::default())?;
/// watch_and_rebuild(WatchOptions::default(), handler)?;
/// ```
pub fn watch_and_rebuild<C: Compiler>(
    options: WatchOptions,
    mut handler: WatchHandler<C>,
) -> Result<(), WatchError> {
    let source_dir = handler.context().source_dir();
    if !source_dir.is_dir() {
        return Err(WatchError::SourceNotFound(source_dir));
    }

    let (tx, rx) = channel();
    let debounce_duration = Duration::from_millis(options.config.debounce_ms as u64);
    let mut debouncer = new_debouncer(debounce_duration, tx).map_err(WatchError::WatcherInit)?;

    for root in watch_roots(handler.context()) {
        debouncer
            .watcher()
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::WatchPath(root.clone(), e))?;
        debug!(path = %root.display(), "watching");
    }

    let mut error_tracker = ErrorTracker::new();

    if options.config.clear_screen {
        clear_screen();
    }
    println!("[{}] Indexing...", timestamp());
    match handler.index() {
        Ok(files) => println!("[{}] Indexed {} files", timestamp(), files),
        Err(WatchError::Index(e)) => {
            handler.index_failed(e);
        }
        Err(e) => return Err(e),
    }

    println!("[{}] Building...", timestamp());
    let start = Instant::now();
    let result = handler.build_all()?.with_duration(start.elapsed());
    let fixed = error_tracker.update(&result);
    print_build_result(&result, &fixed);
    println!("[{}] Watching {} for changes...", timestamp(), source_dir.display());

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let mut changed: Vec<PathBuf> = Vec::new();
                for event in events {
                    if matches!(event.kind, DebouncedEventKind::Any)
                        && handler.is_relevant(&event.path)
                        && !changed.contains(&event.path)
                    {
                        changed.push(event.path);
                    }
                }
                if changed.is_empty() {
                    continue;
                }

                for path in &changed {
                    if let Some(name) = path.file_name() {
                        println!("[{}] Changed: {}", timestamp(), name.to_string_lossy());
                    }
                }

                if options.config.clear_screen {
                    clear_screen();
                }

                let start = Instant::now();
                match handler.handle_changes(&changed) {
                    Ok(ChangeOutcome::Rebuilt(result)) => {
                        let result = result.with_duration(start.elapsed());
                        let fixed = error_tracker.update(&result);
                        print_build_result(&result, &fixed);
                    }
                    Ok(ChangeOutcome::IndexFailed(e)) => {
                        eprintln!("[{}] Error: {}", timestamp(), e);
                    }
                    Ok(ChangeOutcome::Ignored) => {}
                    Err(e) => {
                        warn!(error = %e, "rebuild failed");
                        eprintln!("[{}] Error: {}", timestamp(), e);
                    }
                }

                println!("[{}] Watching {} for changes...", timestamp(), source_dir.display());
            }
            Ok(Err(error)) => {
                warn!(%error, "watch error");
                eprintln!("[{}] Watch error: {}", timestamp(), error);
                eprintln!("[{}] Continuing to watch...", timestamp());
            }
            Err(e) => {
                return Err(WatchError::Channel(e.to_string()));
            }
        }
    }
}

/// Print build result to console with fixed file notifications
fn print_build_result(result: &BuildResult, fixed_files: &[PathBuf]) {
    for fixed in fixed_files {
        if let Some(name) = fixed.file_name() {
            println!("[{}] Fixed: {}", timestamp(), name.to_string_lossy());
        }
    }

    if result.is_success() {
        println!(
            "[{}] Build complete ({}) - Compiled: {}",
            timestamp(),
            format_duration(result.total_duration),
            result.success_count()
        );
    } else {
        let error_count = result.failed_count();
        println!(
            "[{}] Build failed ({}) - {} error{}",
            timestamp(),
            format_duration(result.total_duration),
            error_count,
            if error_count == 1 { "" } else { "s" }
        );

        for error in result.errors() {
            if let Some(name) = error.file.file_name() {
                eprint!("[{}] Error in {}:", timestamp(), name.to_string_lossy());
                if let Some(line) = error.line {
                    eprint!("\n          Line {}: ", line);
                } else {
                    eprint!(" ");
                }
                eprintln!("{}", error.message);
            } else {
                eprintln!("[{}] {}", timestamp(), error);
            }
        }
    }
}
