//! Build result types.
//!
//! Contains types for representing the outcome of compiling sources.

use crate::compiler::CompileError;
use std::path::PathBuf;
use std::time::Duration;

/// Status of a single compiled source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// Compiled and written
    Success,
    /// Not compiled (dry run)
    Skipped,
    /// Compilation failed with error
    Failed(String),
}

impl BuildStatus {
    /// Check if the status indicates success.
    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success | BuildStatus::Skipped)
    }

    /// Check if the status indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, BuildStatus::Failed(_))
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildStatus::Success => write!(f, "success"),
            BuildStatus::Skipped => write!(f, "skipped"),
            BuildStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Result of compiling a single source.
#[derive(Debug, Clone)]
pub struct CompileResult {
    /// Source that was compiled
    pub source: PathBuf,
    /// Destination the CSS was (or would be) written to
    pub destination: PathBuf,
    /// Build status
    pub status: BuildStatus,
    /// Compilation duration
    pub duration: Duration,
    /// Compiler error with location, when compilation failed
    pub error: Option<CompileError>,
}

impl CompileResult {
    /// Create a successful result.
    pub fn success(source: PathBuf, destination: PathBuf, duration: Duration) -> Self {
        Self { source, destination, status: BuildStatus::Success, duration, error: None }
    }

    /// Create a skipped result.
    pub fn skipped(source: PathBuf, destination: PathBuf) -> Self {
        Self {
            source,
            destination,
            status: BuildStatus::Skipped,
            duration: Duration::ZERO,
            error: None,
        }
    }

    /// Create a failed result from a compiler error.
    pub fn failed(source: PathBuf, destination: PathBuf, error: CompileError, duration: Duration) -> Self {
        Self {
            source,
            destination,
            status: BuildStatus::Failed(error.to_string()),
            duration,
            error: Some(error),
        }
    }

    /// Check if this result is successful.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Result of a complete build run.
#[derive(Debug, Default)]
pub struct BuildResult {
    /// Results for each source
    pub results: Vec<CompileResult>,
    /// Total build duration
    pub total_duration: Duration,
}

impl BuildResult {
    /// Create a new empty build result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source result.
    pub fn add_result(&mut self, result: CompileResult) {
        self.results.push(result);
    }

    /// Set the total duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    /// Get the number of compiled sources.
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| matches!(r.status, BuildStatus::Success)).count()
    }

    /// Get the number of skipped sources.
    pub fn skipped_count(&self) -> usize {
        self.results.iter().filter(|r| matches!(r.status, BuildStatus::Skipped)).count()
    }

    /// Get the number of failed sources.
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_failure()).count()
    }

    /// Check if the overall build succeeded (no failures).
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Destinations written by successful compilations.
    pub fn all_outputs(&self) -> Vec<&PathBuf> {
        self.results
            .iter()
            .filter(|r| matches!(r.status, BuildStatus::Success))
            .map(|r| &r.destination)
            .collect()
    }

    /// Get failed source results.
    pub fn failures(&self) -> Vec<&CompileResult> {
        self.results.iter().filter(|r| r.status.is_failure()).collect()
    }

    /// Compiler errors of every failed source.
    pub fn errors(&self) -> Vec<&CompileError> {
        self.results.iter().filter_map(|r| r.error.as_ref()).collect()
    }

    /// Format a summary of the build result.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        let success = self.success_count();
        let skipped = self.skipped_count();
        let failed = self.failed_count();
        let total = self.results.len();

        if failed > 0 {
            lines.push(format!(
                "Build failed: {} compiled, {} skipped, {} failed ({} total)",
                success, skipped, failed, total
            ));
            for result in self.failures() {
                lines.push(format!("  - {}: {}", result.source.display(), result.status));
            }
        } else {
            lines.push(format!(
                "Build succeeded: {} compiled, {} skipped ({} total) in {:?}",
                success, skipped, total, self.total_duration
            ));
        }

        lines.join("\n")
    }
}
