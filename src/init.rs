//! Project initialization for stylegraph
//!
//! Scaffolds a settings file, a source tree with a main stylesheet and a
//! partial, and an empty target directory.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::CONFIG_FILE_NAMES;

/// Error during project initialization
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InitError {
    /// A settings file is already present
    #[error("Project already initialized: {} exists", .0.display())]
    AlreadyInitialized(PathBuf),
    /// Failed to create directory
    #[error("Failed to create directory '{}': {1}", .0.display())]
    CreateDir(PathBuf, std::io::Error),
    /// Failed to write file
    #[error("Failed to write file '{}': {1}", .0.display())]
    WriteFile(PathBuf, std::io::Error),
}

/// Initialize a new stylegraph project.
///
/// Creates `stylegraph.toml`, `scss/main.scss`, `scss/_variables.scss` and an
/// empty `css/` directory under `path`. Existing stylesheets are left alone;
/// an existing settings file aborts before anything is written.
///
/// # Returns
/// The files written, in creation order.
///
/// # Example
/// ```ignore
/// init_project(Path::new("site"), "site")?;
/// ```
pub fn init_project(path: &Path, name: &str) -> Result<Vec<PathBuf>, InitError> {
    for existing in CONFIG_FILE_NAMES.iter().map(|n| path.join(n)) {
        if existing.exists() {
            return Err(InitError::AlreadyInitialized(existing));
        }
    }

    create_dir(path)?;
    create_dir(&path.join("scss"))?;
    create_dir(&path.join("css"))?;

    let mut written = Vec::new();
    write_file(&path.join("stylegraph.toml"), &generate_config(name), &mut written)?;
    write_new(&path.join("scss/main.scss"), &generate_main_stylesheet(name), &mut written)?;
    write_new(&path.join("scss/_variables.scss"), generate_variables(), &mut written)?;
    write_new(&path.join("css/.gitkeep"), "", &mut written)?;

    Ok(written)
}

/// Create a directory and all parent directories.
fn create_dir(path: &Path) -> Result<(), InitError> {
    fs::create_dir_all(path).map_err(|e| InitError::CreateDir(path.to_path_buf(), e))
}

/// Write content to a file.
fn write_file(path: &Path, content: &str, written: &mut Vec<PathBuf>) -> Result<(), InitError> {
    fs::write(path, content).map_err(|e| InitError::WriteFile(path.to_path_buf(), e))?;
    written.push(path.to_path_buf());
    Ok(())
}

/// Write content unless the file already exists.
fn write_new(path: &Path, content: &str, written: &mut Vec<PathBuf>) -> Result<(), InitError> {
    if path.exists() {
        return Ok(());
    }
    write_file(path, content, written)
}

fn generate_config(name: &str) -> String {
    format!(
        r#"# stylegraph settings for {name}

[project]
source = "scss"
target = "css"
library_paths = []
excludes = []

[output]
style = "expanded"
source_map = false

[compiler]
program = "sass"

[watch]
debounce_ms = 200
clear_screen = false
"#
    )
}

fn generate_main_stylesheet(name: &str) -> String {
    format!(
        r#"// {name}
@import "variables";

body {{
  color: $text-color;
  font-family: $font-stack;
}}
"#
    )
}

fn generate_variables() -> &'static str {
    r#"$text-color: #222;
$font-stack: system-ui, sans-serif;
"#
}
