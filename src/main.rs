//! stylegraph - Command-line driver for incremental Sass/SCSS compilation

use std::process::ExitCode;

use stylegraph::cli;

fn main() -> ExitCode {
    cli::run()
}
