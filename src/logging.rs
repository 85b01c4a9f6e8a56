use std::fs;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Keeps the file writer alive; logs are flushed when it is dropped.
pub struct LogGuard {
    _file: WorkerGuard,
}

/// Initializes the logging system with both console and file output.
///
/// Call once at startup and hold the returned guard for the life of the process.
pub fn init_logging(config: &LoggingConfig) -> LogGuard {
    // Ensure logs directory exists
    let _ = fs::create_dir_all(&config.dir);

    // Create a non-blocking file appender for daily log rotation
    let file_appender = tracing_appender::rolling::daily(&config.dir, "kredit_dashboard.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    // JSON file log keeps debug detail
    let file_layer = fmt::layer()
        .json()
        .with_writer(non_blocking_writer)
        .with_filter(LevelFilter::DEBUG);

    // Console stays at info unless RUST_LOG says otherwise
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("kredit_dashboard=info,warn"));
    let console_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .init();

    LogGuard { _file: guard }
}
