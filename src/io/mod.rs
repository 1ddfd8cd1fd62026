/// Command-line arguments and the end-to-end batch runner
pub mod cli;
/// Constants and runtime defaults
pub mod configuration;
/// Error types
pub mod error;
/// Source loading and atomic file output
pub mod export;
/// Tracing subscriber setup
pub mod logging;
/// Live progress display
pub mod progress;
