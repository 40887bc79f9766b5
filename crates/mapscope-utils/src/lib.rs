//! # mapscope Utilities
//!
//! Shared utilities and logging for mapscope.
//!
//! This crate provides common functionality used across the mapscope
//! workspace, including logging infrastructure built on `tracing` with a
//! file-only mode for embedding inside host debugger UIs.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{
    LogFormat, LogLevel, default_log_file, init_logging, init_logging_to_file,
    init_logging_with_level,
};
pub use tracing::{debug, error, info, trace, warn};
