//! Graph query commands (inspect, sources)

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::{config_failure, load_context, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::build::BuildContext;
use crate::config::CliOverrides;
use crate::finder::{compilable_sources, mirror_sources};
use crate::inspector::Inspector;
use crate::resolver::normalize_path;

/// Import relations of one file.
#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    imports: Vec<String>,
    imported_by: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// One main source and where it compiles to.
#[derive(Debug, Serialize)]
struct SourceEntry {
    source: String,
    destination: String,
}

/// Show a path relative to the project root when it lies inside it.
fn display_path(context: &BuildContext, path: &Path) -> String {
    path.strip_prefix(context.project_root()).unwrap_or(path).display().to_string()
}

fn report_for(context: &BuildContext, inspector: &Inspector, file: &Path, direct: bool) -> FileReport {
    let shown = |paths: &[PathBuf]| -> Vec<String> {
        paths.iter().map(|p| display_path(context, p)).collect()
    };

    if direct {
        return FileReport {
            file: display_path(context, file),
            imports: shown(inspector.direct_children(file)),
            imported_by: shown(inspector.direct_parents(file)),
            error: None,
        };
    }

    match (inspector.children(file), inspector.parents(file)) {
        (Ok(children), Ok(parents)) => FileReport {
            file: display_path(context, file),
            imports: shown(children),
            imported_by: shown(parents),
            error: None,
        },
        (Err(e), _) | (_, Err(e)) => FileReport {
            file: display_path(context, file),
            imports: Vec::new(),
            imported_by: Vec::new(),
            error: Some(e.to_string()),
        },
    }
}

/// Run the inspect command
pub fn run_inspect(
    config: Option<&Path>,
    overrides: &CliOverrides,
    files: &[PathBuf],
    direct: bool,
    json: bool,
) -> ExitCode {
    let context = match load_context(config, overrides, false) {
        Ok(context) => context,
        Err(e) => return config_failure(&e),
    };

    let options = match context.finder_options() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };
    let sources = match compilable_sources(&context.source_dir(), &options) {
        Ok(sources) => sources,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    // Requested files are indexed too so a partial nothing imports still shows its imports.
    let requested: Vec<PathBuf> = files.iter().map(|f| normalize_path(f)).collect();

    let mut inspector = Inspector::new();
    let library_paths = context.library_paths();
    if let Err(e) = inspector
        .inspect(&sources, &library_paths)
        .and_then(|()| inspector.inspect(&requested, &library_paths))
    {
        eprintln!("Error: {}", e);
        return ExitCode::from(EXIT_ERROR);
    }

    let shown = if requested.is_empty() { &sources } else { &requested };
    let reports: Vec<FileReport> =
        shown.iter().map(|file| report_for(&context, &inspector, file, direct)).collect();
    let failed = reports.iter().any(|r| r.error.is_some());

    if json {
        match serde_json::to_string_pretty(&reports) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    } else {
        for report in &reports {
            println!("{}", report.file);
            if let Some(error) = &report.error {
                println!("  error: {}", error);
                continue;
            }
            println!("  imports ({}):", report.imports.len());
            for import in &report.imports {
                println!("    {}", import);
            }
            println!("  imported by ({}):", report.imported_by.len());
            for parent in &report.imported_by {
                println!("    {}", parent);
            }
        }
    }

    if failed {
        ExitCode::from(EXIT_ERROR)
    } else {
        ExitCode::from(EXIT_SUCCESS)
    }
}

/// Run the sources command
pub fn run_sources(config: Option<&Path>, overrides: &CliOverrides, json: bool) -> ExitCode {
    let context = match load_context(config, overrides, false) {
        Ok(context) => context,
        Err(e) => return config_failure(&e),
    };

    let pairs = match context
        .finder_options()
        .map_err(|e| e.to_string())
        .and_then(|options| {
            mirror_sources(&context.source_dir(), Some(&context.target_dir()), &options)
                .map_err(|e| e.to_string())
        }) {
        Ok(pairs) => pairs,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let entries: Vec<SourceEntry> = pairs
        .iter()
        .map(|(source, destination)| SourceEntry {
            source: display_path(&context, source),
            destination: display_path(&context, destination),
        })
        .collect();

    if json {
        match serde_json::to_string_pretty(&entries) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    } else {
        for entry in &entries {
            println!("{} -> {}", entry.source, entry.destination);
        }
        println!("{} sources", entries.len());
    }

    ExitCode::from(EXIT_SUCCESS)
}
