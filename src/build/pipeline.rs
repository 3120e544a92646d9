//! Build pipeline orchestration.
//!
//! The pipeline compiles main sources into the target tree. Sources are
//! independent of each other once their imports are inlined by the compiler,
//! so they may be compiled in parallel.

use crate::build::{BuildContext, BuildResult, CompileResult};
use crate::compiler::{CompileError, CompileOptions, Compiler};
use crate::finder::{mirror_sources, DiscoveryError, FinderOptions};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error during build execution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BuildError {
    /// Discovery error
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Default number of parallel jobs (uses available parallelism).
fn default_jobs() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Build pipeline for executing builds.
pub struct BuildPipeline {
    /// Build context
    context: BuildContext,
    /// Whether to stop on first error
    fail_fast: bool,
    /// Whether to do a dry run (don't actually compile)
    dry_run: bool,
    /// Number of parallel compile jobs
    jobs: usize,
}

impl BuildPipeline {
    /// Create a new build pipeline.
    pub fn new(context: BuildContext) -> Self {
        Self { context, fail_fast: false, dry_run: false, jobs: default_jobs() }
    }

    /// Set fail-fast mode (stop on first error, compiles sequentially).
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Set dry-run mode (don't actually compile).
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the number of parallel jobs.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Get the build context.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Get the number of parallel jobs.
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Every main source paired with its destination.
    pub fn plan(&self) -> Result<Vec<(PathBuf, PathBuf)>, BuildError> {
        let options = self.context.finder_options()?;
        self.plan_with(&options)
    }

    fn plan_with(&self, options: &FinderOptions) -> Result<Vec<(PathBuf, PathBuf)>, BuildError> {
        let target = self.context.target_dir();
        Ok(mirror_sources(&self.context.source_dir(), Some(&target), options)?)
    }

    /// Compile every main source of the project.
    pub fn build<C: Compiler + ?Sized>(&self, compiler: &C) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let plan = self.plan()?;

        if self.context.is_verbose() {
            println!("Build plan: {} sources", plan.len());
            for (source, destination) in &plan {
                println!("  - {} -> {}", source.display(), destination.display());
            }
        }

        let mut result = self.execute(compiler, &plan)?;
        result.total_duration = start.elapsed();
        Ok(result)
    }

    /// Compile the given main sources only.
    ///
    /// Sources outside the source directory are reported as failures.
    pub fn build_sources<C: Compiler + ?Sized>(
        &self,
        compiler: &C,
        sources: &[PathBuf],
    ) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let mut result = BuildResult::new();
        let mut plan = Vec::with_capacity(sources.len());

        for source in sources {
            match self.context.destination_for(source) {
                Some(destination) => plan.push((source.clone(), destination)),
                None => result.add_result(CompileResult::failed(
                    source.clone(),
                    PathBuf::new(),
                    CompileError::new(source, "not under the source directory"),
                    std::time::Duration::ZERO,
                )),
            }
        }

        let compiled = self.execute(compiler, &plan)?;
        result.results.extend(compiled.results);
        result.total_duration = start.elapsed();
        Ok(result)
    }

    /// Execute a plan, in parallel unless fail-fast or a single job is requested.
    fn execute<C: Compiler + ?Sized>(
        &self,
        compiler: &C,
        plan: &[(PathBuf, PathBuf)],
    ) -> Result<BuildResult, BuildError> {
        let mut result = BuildResult::new();
        if plan.is_empty() {
            return Ok(result);
        }

        if !self.dry_run {
            fs::create_dir_all(self.context.target_dir())?;
        }

        let options = self.context.compile_options();

        if self.fail_fast || self.jobs == 1 || plan.len() == 1 {
            for (source, destination) in plan {
                let compiled = self.compile_one(compiler, &options, source, destination);
                let stop = compiled.status.is_failure() && self.fail_fast;
                result.add_result(compiled);
                if stop {
                    break;
                }
            }
            return Ok(result);
        }

        let compile_all = || -> Vec<CompileResult> {
            plan.par_iter()
                .map(|(source, destination)| self.compile_one(compiler, &options, source, destination))
                .collect()
        };

        let results = match rayon::ThreadPoolBuilder::new().num_threads(self.jobs).build() {
            Ok(pool) => pool.install(compile_all),
            Err(e) => {
                warn!(error = %e, "could not start compile thread pool, compiling sequentially");
                plan.iter()
                    .map(|(source, destination)| self.compile_one(compiler, &options, source, destination))
                    .collect()
            }
        };

        result.results = results;
        Ok(result)
    }

    /// Compile one source and write its output.
    fn compile_one<C: Compiler + ?Sized>(
        &self,
        compiler: &C,
        options: &CompileOptions,
        source: &Path,
        destination: &Path,
    ) -> CompileResult {
        let start = Instant::now();

        if self.dry_run {
            return CompileResult::skipped(source.to_path_buf(), destination.to_path_buf());
        }

        debug!(source = %source.display(), "compiling");

        let written = compiler.compile(source, options).and_then(|css| {
            write_output(destination, &css)
                .map_err(|e| CompileError::new(destination, format!("failed to write output: {}", e)))
        });

        let duration = start.elapsed();
        match written {
            Ok(()) => {
                info!(source = %source.display(), destination = %destination.display(), "compiled");
                CompileResult::success(source.to_path_buf(), destination.to_path_buf(), duration)
            }
            Err(error) => {
                warn!(source = %source.display(), %error, "compilation failed");
                CompileResult::failed(source.to_path_buf(), destination.to_path_buf(), error, duration)
            }
        }
    }
}

/// Write CSS to `destination`, creating parent directories.
fn write_output(destination: &Path, css: &str) -> std::io::Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(destination, css)
}
