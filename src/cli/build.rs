//! Build command implementations (compile, watch, init)

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::{config_failure, load_context, EXIT_ERROR, EXIT_SUCCESS};
use crate::build::BuildPipeline;
use crate::compiler::SassCommand;
use crate::config::CliOverrides;

/// Run the compile command
pub fn run_compile(
    config: Option<&Path>,
    overrides: &CliOverrides,
    dry_run: bool,
    fail_fast: bool,
    jobs: Option<usize>,
    verbose: bool,
) -> ExitCode {
    let context = match load_context(config, overrides, verbose) {
        Ok(context) => context,
        Err(e) => return config_failure(&e),
    };

    let compiler = SassCommand::from_config(&context.settings().compiler);
    let mut pipeline =
        BuildPipeline::new(context).with_dry_run(dry_run).with_fail_fast(fail_fast);
    if let Some(jobs) = jobs {
        pipeline = pipeline.with_jobs(jobs);
    }

    if dry_run {
        println!("Dry run - would compile:");
        println!("  Source: {}", pipeline.context().source_dir().display());
        println!("  Target: {}", pipeline.context().target_dir().display());
    }

    match pipeline.build(&compiler) {
        Ok(result) => {
            if dry_run {
                for compiled in &result.results {
                    println!(
                        "    - {} -> {}",
                        compiled.source.display(),
                        compiled.destination.display()
                    );
                }
            }
            if result.is_success() {
                println!("{}", result.summary());
                ExitCode::from(EXIT_SUCCESS)
            } else {
                for error in result.errors() {
                    eprintln!("{}", error);
                }
                eprintln!("{}", result.summary());
                ExitCode::from(EXIT_ERROR)
            }
        }
        Err(e) => {
            eprintln!("Build error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Run the watch command
pub fn run_watch(config: Option<&Path>, overrides: &CliOverrides, verbose: bool) -> ExitCode {
    use crate::watch::{watch_and_rebuild, WatchHandler, WatchOptions};

    let context = match load_context(config, overrides, verbose) {
        Ok(context) => context,
        Err(e) => return config_failure(&e),
    };

    let options = WatchOptions { config: context.settings().watch.clone(), verbose };
    let compiler = SassCommand::from_config(&context.settings().compiler);
    let handler = match WatchHandler::new(context, compiler) {
        Ok(handler) => handler,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    println!("Starting watch mode...");
    println!("Press Ctrl+C to stop");
    println!();

    match watch_and_rebuild(options, handler) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Watch error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Run the init command
pub fn run_init(path: Option<&Path>, name: Option<&str>) -> ExitCode {
    use crate::init::{init_project, InitError};

    let project_path = match path {
        Some(p) => p.to_path_buf(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };

    let project_name = name
        .map(|n| n.to_string())
        .or_else(|| project_path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "my-site".to_string());

    match init_project(&project_path, &project_name) {
        Ok(written) => {
            println!(
                "Created stylegraph project '{}' at {}",
                project_name,
                project_path.display()
            );
            println!();
            for file in &written {
                let shown = file.strip_prefix(&project_path).unwrap_or(file);
                println!("  {}", shown.display());
            }
            println!();
            println!("Next steps:");
            println!("  cd {}", project_path.display());
            println!("  stylegraph compile");
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(InitError::AlreadyInitialized(existing)) => {
            eprintln!("Error: {} already exists", existing.display());
            eprintln!("Use a different directory or edit the existing settings");
            ExitCode::from(EXIT_ERROR)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
