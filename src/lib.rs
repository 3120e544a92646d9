//! stylegraph - Incremental compilation for Sass/SCSS projects
//!
//! This library provides functionality to:
//! - Extract `@import` targets from `.scss` and `.sass` sources
//! - Resolve targets to files, searching library paths after the importer's directory
//! - Find the main sources of a project and their `.css` destinations
//! - Keep a dependency graph so a changed partial maps to the main files that import it
//! - Drive an external compiler over the affected sources, once or in watch mode

pub mod build;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod error;
pub mod finder;
pub mod init;
pub mod inspector;
pub mod logging;
pub mod parser;
pub mod resolver;
pub mod watch;

pub use error::ImportError;
pub use inspector::Inspector;
