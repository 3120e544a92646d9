//! Configuration module for stylegraph projects
//!
//! Provides types and parsing for `stylegraph.toml` (or `stylegraph.json`)
//! project settings.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
