//! Diagnostic logging setup.
//!
//! Logs go to stderr so command output on stdout stays clean. `RUST_LOG`
//! overrides the level chosen from the `-v` count.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Map a `-v` repeat count to a level filter.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the global subscriber.
///
/// Calling it again is harmless; only the first subscriber is kept.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_for(verbosity).into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
