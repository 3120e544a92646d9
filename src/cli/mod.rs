//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod build;
mod inspect;

use clap::{Args, Parser, Subcommand};
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::build::BuildContext;
use crate::config::{
    default_config, find_config, load_config, merge_cli_overrides, project_root, CliOverrides,
    ConfigError, OutputStyle,
};
use crate::logging::init_logging;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// stylegraph - Incremental Sass/SCSS compilation driven by the import graph
#[derive(Parser)]
#[command(name = "stylegraph")]
#[command(about = "stylegraph - Compile Sass/SCSS projects and rebuild only what an edit affects")]
#[command(version)]
pub struct Cli {
    /// Settings file (default: nearest stylegraph.toml or stylegraph.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings that can be overridden from the command line.
#[derive(Args, Debug, Default, Clone)]
pub struct OverrideArgs {
    /// Override source directory
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Override target directory
    #[arg(long)]
    pub target: Option<PathBuf>,

    /// Override output style
    #[arg(long, value_enum)]
    pub style: Option<OutputStyle>,

    /// Embed source maps in the output
    #[arg(long, conflicts_with = "no_source_map")]
    pub source_map: bool,

    /// Do not emit source maps
    #[arg(long)]
    pub no_source_map: bool,

    /// Additional library path (repeatable, searched after configured ones)
    #[arg(short = 'I', long = "library-path")]
    pub library_paths: Vec<PathBuf>,
}

impl OverrideArgs {
    fn to_overrides(&self) -> CliOverrides {
        let source_map = match (self.source_map, self.no_source_map) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        CliOverrides {
            source: self.source.clone(),
            target: self.target.clone(),
            style: self.style,
            source_map,
            library_paths: self.library_paths.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile every main source into the target directory
    Compile {
        #[command(flatten)]
        overrides: OverrideArgs,

        /// Show what would be compiled without compiling
        #[arg(long)]
        dry_run: bool,

        /// Stop at the first failing source
        #[arg(long)]
        fail_fast: bool,

        /// Number of parallel compile jobs (default: available cores)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Watch sources and library paths, recompiling what each change affects
    Watch {
        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Show the import graph of stylesheets
    Inspect {
        /// Files to show (default: every main source)
        files: Vec<PathBuf>,

        /// Show direct imports only
        #[arg(long)]
        direct: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// List main sources with their output paths
    Sources {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Initialize a new stylegraph project
    Init {
        /// Project directory (default: current directory)
        path: Option<PathBuf>,

        /// Project name (default: directory name)
        #[arg(long)]
        name: Option<String>,
    },
}

/// Load settings, apply overrides and check the configured directories.
///
/// Relative settings paths resolve against the settings file's directory,
/// or the working directory when no settings file is found.
pub(crate) fn load_context(
    config: Option<&Path>,
    overrides: &CliOverrides,
    verbose: bool,
) -> Result<BuildContext, ConfigError> {
    let config_path = match config {
        Some(path) => Some(path.to_path_buf()),
        None => find_config(),
    };

    let (mut settings, root) = match config_path {
        Some(path) => {
            if verbose {
                println!("Using settings: {}", path.display());
            }
            let settings = load_config(Some(&path))?;
            let root = match project_root(&path).filter(|p| !p.as_os_str().is_empty()) {
                Some(root) => root.to_path_buf(),
                None => env::current_dir()?,
            };
            (settings, root)
        }
        None => {
            if verbose {
                println!("No stylegraph.toml found, using defaults");
            }
            (default_config(), env::current_dir()?)
        }
    };

    merge_cli_overrides(&mut settings, overrides);
    let errors = settings.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    let context = BuildContext::new(settings, root).with_verbose(verbose);
    context.verify_paths()?;
    Ok(context)
}

/// Report a settings failure and pick its exit code.
pub(crate) fn config_failure(error: &ConfigError) -> ExitCode {
    eprintln!("Error: {}", error);
    match error {
        ConfigError::Io(_) => ExitCode::from(EXIT_ERROR),
        _ => ExitCode::from(EXIT_INVALID_ARGS),
    }
}

/// Run the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.config.as_deref();
    let verbose = cli.verbose > 0;

    match cli.command {
        Commands::Compile { overrides, dry_run, fail_fast, jobs } => {
            build::run_compile(config, &overrides.to_overrides(), dry_run, fail_fast, jobs, verbose)
        }
        Commands::Watch { overrides } => build::run_watch(config, &overrides.to_overrides(), verbose),
        Commands::Inspect { files, direct, json, overrides } => {
            inspect::run_inspect(config, &overrides.to_overrides(), &files, direct, json)
        }
        Commands::Sources { json, overrides } => {
            inspect::run_sources(config, &overrides.to_overrides(), json)
        }
        Commands::Init { path, name } => build::run_init(path.as_deref(), name.as_deref()),
    }
}
