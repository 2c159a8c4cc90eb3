//! Logging initialization for feedsync.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::Result;

/// Parse a log level string, falling back to INFO.
fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize logging to stdout and the configured log file.
///
/// The log file is appended to, so the refetch history of previous
/// process lifetimes survives a restart.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let level = parse_level(&config.level);
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if let Some(parent) = Path::new(&config.file).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.file)?;
    let writer = std::io::stdout.and(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .with(filter)
        .init();

    Ok(())
}

/// Initialize console-only logging.
pub fn init_console_only(level: &str) {
    let level = parse_level(level);
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_ansi(true)
                .with_target(true),
        )
        .with(filter)
        .init();
}
