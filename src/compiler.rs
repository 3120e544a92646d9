//! Stylesheet compilation backends
//!
//! Turning Sass into CSS is delegated to a [`Compiler`]. The default backend,
//! [`SassCommand`], runs the Dart Sass command line and captures its output.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use crate::config::{CompilerConfig, OutputStyle};

/// Options passed to every compilation.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// CSS output style
    pub style: OutputStyle,
    /// Embed a source map in the output
    pub source_map: bool,
    /// Extra import search directories
    pub library_paths: Vec<PathBuf>,
}

/// A compilation failure with file location information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    /// Path to the file containing the error
    pub file: PathBuf,
    /// Line number (1-indexed, None if unknown)
    pub line: Option<usize>,
    /// Column number (1-indexed, None if unknown)
    pub column: Option<usize>,
    /// Error message
    pub message: String,
}

impl CompileError {
    /// Create a new compile error with file and message
    pub fn new(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self { file: file.into(), line: None, column: None, message: message.into() }
    }

    /// Create a compile error with full location information
    pub fn with_location(
        file: impl Into<PathBuf>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self { file: file.into(), line: Some(line), column: Some(column), message: message.into() }
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error in {}", self.file.display())?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
            if let Some(col) = self.column {
                write!(f, ":{}", col)?;
            }
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for CompileError {}

/// Something that turns one stylesheet into CSS text.
///
/// Implementations must be shareable across threads; independent sources may
/// be compiled in parallel.
pub trait Compiler: Send + Sync {
    /// Compile `source` and return the CSS.
    fn compile(&self, source: &Path, options: &CompileOptions) -> Result<String, CompileError>;
}

/// Compiler backed by the `sass` executable.
#[derive(Debug, Clone)]
pub struct SassCommand {
    program: String,
    args: Vec<String>,
}

impl Default for SassCommand {
    fn default() -> Self {
        Self { program: "sass".to_string(), args: Vec::new() }
    }
}

impl SassCommand {
    /// Create a backend running `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    /// Create a backend from the `[compiler]` settings section.
    pub fn from_config(config: &CompilerConfig) -> Self {
        Self { program: config.program.clone(), args: config.args.clone() }
    }

    /// Add arguments placed before the generated ones.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Executable this backend runs.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argument list for compiling `source` to standard output.
    pub fn command_args(&self, source: &Path, options: &CompileOptions) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(format!("--style={}", options.style.sass_style()));
        for lib in &options.library_paths {
            args.push(format!("--load-path={}", lib.display()));
        }
        if options.source_map {
            args.push("--embed-source-map".to_string());
        } else {
            args.push("--no-source-map".to_string());
        }
        args.push(source.display().to_string());
        args
    }
}

impl Compiler for SassCommand {
    fn compile(&self, source: &Path, options: &CompileOptions) -> Result<String, CompileError> {
        let output = Command::new(&self.program)
            .args(self.command_args(source, options))
            .output()
            .map_err(|e| {
                CompileError::new(source, format!("failed to run '{}': {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(parse_sass_error(source, &stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn regex_sass_trailer() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "  scss/_partial.scss 3:10  @import"
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s+(\S+\.(?:scss|sass|css))\s+(\d+):(\d+)\s")
            .expect("valid regex literal")
    })
}

/// Turn Dart Sass error output into a [`CompileError`].
///
/// The message is the first line (without the `Error:` prefix); the location
/// comes from the first stack trailer line, which names the innermost file.
pub fn parse_sass_error(source: &Path, stderr: &str) -> CompileError {
    let message = stderr
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.strip_prefix("Error:").unwrap_or(line).trim().to_string())
        .unwrap_or_else(|| "compiler exited with an error".to_string());

    let location = regex_sass_trailer().captures(stderr).and_then(|caps| {
        let line = caps[2].parse().ok()?;
        let column = caps[3].parse().ok()?;
        Some((PathBuf::from(&caps[1]), line, column))
    });

    match location {
        Some((file, line, column)) => CompileError::with_location(file, line, column, message),
        None => CompileError::new(source, message),
    }
}
