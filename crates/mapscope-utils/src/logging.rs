//! # Logging Utilities
//!
//! Logging infrastructure for mapscope using `tracing`.
//!
//! This module provides structured logging with support for:
//! - Multiple output formats (JSON for production, pretty for development)
//! - Environment variable configuration
//! - Log level filtering
//! - Console and file output, including a file-only mode for use when stdout
//!   belongs to a host debugger UI
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mapscope_utils::init_logging;
//!
//! // Initialize with default settings (reads from RUST_LOG env var)
//! init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("inspector attached");
//! tracing::debug!("view refreshed");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Log level filter (e.g. `RUST_LOG=debug`,
//!   `RUST_LOG=mapscope_core=trace`)
//! - `MAPSCOPE_LOG_FORMAT`: Output format (`json` or `pretty`, default:
//!   `pretty`)
//! - `MAPSCOPE_LOG_FILE`: Optional path to a log file (if not set, logs only
//!   to console)

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use chrono::Utc;
use tracing::Level;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format (default for development)
    Pretty,
    /// JSON format (default for production)
    Json,
}

impl FromStr for LogFormat
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {s}. Use 'pretty' or 'json'")),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level (default)
    Info,
    /// Debug level
    Debug,
    /// Trace level (most verbose; includes per-step traversal events)
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!(
                "Unknown log level: {s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            )),
        }
    }
}

/// Initialize logging with default settings
///
/// Reads configuration from environment variables:
/// - `RUST_LOG`: Log level filter
/// - `MAPSCOPE_LOG_FORMAT`: Output format (`json` or `pretty`)
/// - `MAPSCOPE_LOG_FILE`: Optional path to a log file
///
/// ## Errors
///
/// Returns an error if logging is already initialized or file logging fails.
pub fn init_logging() -> Result<(), LoggingError>
{
    let format = env::var("MAPSCOPE_LOG_FORMAT")
        .ok()
        .and_then(|s| LogFormat::from_str(&s).ok())
        .unwrap_or(LogFormat::Pretty);

    let default_level = env::var("RUST_LOG")
        .unwrap_or_else(|_| "info".to_string())
        .parse::<LogLevel>()
        .map(Into::into)
        .unwrap_or(Level::INFO);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    let log_file = env::var("MAPSCOPE_LOG_FILE").ok().map(PathBuf::from);

    let console_layer = console_layer(format, env_filter.clone());
    match log_file {
        Some(path) => {
            let file_layer = file_layer(&path, format, env_filter, Rolling::Daily)?;
            Registry::default().with(console_layer).with(file_layer).init();
        }
        None => {
            Registry::default().with(console_layer).init();
        }
    }
    Ok(())
}

/// Initialize logging with explicit level and format
///
/// ## Example
///
/// ```rust,no_run
/// use mapscope_utils::{LogFormat, LogLevel, init_logging_with_level};
///
/// init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)
///     .expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if logging is already initialized.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<(), LoggingError>
{
    let env_filter = EnvFilter::new(Level::from(level).to_string());
    Registry::default().with(console_layer(format, env_filter)).init();
    Ok(())
}

/// Initialize file-only logging (no stdout/stderr output)
///
/// Intended for embedding in a host debugger whose console or UI owns the
/// terminal: log lines on stdout would corrupt the display.
///
/// ## Arguments
///
/// * `log_file` - Destination path; the parent directory must exist
/// * `format` - Output format for the file
/// * `level` - Optional explicit level. If `None`, uses `RUST_LOG` or
///   defaults to `INFO`.
///
/// ## Errors
///
/// Returns an error if logging is already initialized or the file cannot be
/// created.
pub fn init_logging_to_file(
    log_file: &Path,
    format: LogFormat,
    level: Option<LogLevel>,
) -> Result<(), LoggingError>
{
    // Priority: explicit level, then RUST_LOG (which supports module-specific
    // filters like "mapscope_core=trace"), then INFO.
    let env_filter = if let Some(level) = level {
        EnvFilter::new(Level::from(level).to_string())
    } else if let Ok(rust_log) = env::var("RUST_LOG") {
        EnvFilter::try_new(&rust_log).unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()))
    } else {
        EnvFilter::new(Level::INFO.to_string())
    };

    let file_layer = file_layer(log_file, format, env_filter, Rolling::Never)?;
    Registry::default().with(file_layer).init();
    Ok(())
}

/// Default log file location for embedded use
///
/// `~/.mapscope/YYYY-MM-DD-mapscope.log`, falling back to
/// `/tmp/YYYY-MM-DD-mapscope.log` when the home directory is not accessible.
/// The directory is created if it does not exist.
///
/// ## Errors
///
/// Returns an error if the log directory cannot be created.
pub fn default_log_file() -> Result<PathBuf, LoggingError>
{
    let today = Utc::now().format("%Y-%m-%d");
    if let Ok(home) = env::var("HOME") {
        let dir = PathBuf::from(home).join(".mapscope");
        std::fs::create_dir_all(&dir).map_err(LoggingError::FileError)?;
        Ok(dir.join(format!("{today}-mapscope.log")))
    } else {
        Ok(PathBuf::from("/tmp").join(format!("{today}-mapscope.log")))
    }
}

/// File rotation policy for the appender
#[derive(Clone, Copy)]
enum Rolling
{
    Daily,
    Never,
}

/// Build the console layer for the chosen format
fn console_layer<S>(format: LogFormat, env_filter: EnvFilter) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(true)
            .with_writer(io::stdout)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(io::stdout)
            .with_filter(env_filter)
            .boxed(),
    }
}

/// Build a non-blocking file layer for the chosen format
fn file_layer<S>(
    log_file: &Path,
    format: LogFormat,
    env_filter: EnvFilter,
    rolling: Rolling,
) -> Result<Box<dyn Layer<S> + Send + Sync>, LoggingError>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    let directory = log_file.parent().unwrap_or_else(|| Path::new("."));
    let file_name = log_file.file_name().unwrap_or_default();
    let file_appender = match rolling {
        Rolling::Daily => tracing_appender::rolling::daily(directory, file_name),
        Rolling::Never => tracing_appender::rolling::never(directory, file_name),
    };
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The guard flushes the writer on drop; logging lives for the whole
    // process, so leak it.
    std::mem::forget(guard);

    let layer = match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(non_blocking)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false) // No ANSI in files
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_ansi(false)
            .with_filter(env_filter)
            .boxed(),
    };
    Ok(layer)
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
