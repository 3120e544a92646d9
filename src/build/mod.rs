//! Build pipeline module for stylegraph
//!
//! Compiles the main sources of a project into mirrored `.css` files.
//!
//! # Overview
//!
//! The build pipeline consists of:
//! - **Context**: Settings with every path resolved against the project root
//! - **Planning**: Pair each main source with its destination
//! - **Execution**: Run the compiler for each pair and write its output
//!
//! # Example
//!
//! ```ignore
//! use stylegraph::build::{BuildContext, BuildPipeline};
//! use stylegraph::compiler::SassCommand;
//! use stylegraph::config::load_config;
//!
//! let settings = load_config(None)?;
//! let context = BuildContext::new(settings, project_root);
//! let pipeline = BuildPipeline::new(context);
//!
//! let result = pipeline.build(&SassCommand::default())?;
//! println!("{}", result.summary());
//! ```

pub mod context;
pub mod pipeline;
pub mod result;

pub use context::*;
pub use pipeline::*;
pub use result::*;
