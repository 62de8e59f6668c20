//! Logging initialization for colorcast.
//!
//! It supports three modes:
//! - Cli mode: logs to STDERR, leaving STDOUT to command output.
//! - Host mode: logs to STDERR and to a rolling file under the configuration
//!   directory, for editors and other long-lived hosts embedding the engine.
//! - Silent mode: installs nothing, leaving the subscriber to the embedder.
//!
//! Host logs are rolled over when they reach 5 MB. Rotated logs are
//! compressed. The maximum number of rotated logs is 20.

use anyhow::Result;
use file_rotate::{ContentLimit, FileRotate, compression::Compression, suffix::AppendCount};
use rule_config::config_directory::ConfigDirectory;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt::writer::MakeWriterExt};

const LOG_FILE_NAME: &str = "colorcast.log";
const MAX_LOG_BYTES: usize = 5 * 1024 * 1024;
const MAX_ROTATED_LOGS: usize = 20;

pub enum LogMode {
    Cli,
    Host,
    Silent,
}

/// Guard that keeps background logging workers alive.
pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

pub fn init(mode: LogMode, verbose: bool) -> Result<Option<LoggingGuards>> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    match mode {
        LogMode::Cli => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
        LogMode::Host => {
            let config_dir = ConfigDirectory::new_system_default()?;
            let writer = rolling_file_writer(config_dir.ensure_logs_directory()?);

            let (file_non_blocking, file_guard) = tracing_appender::non_blocking(writer);
            // A host may never drain our stderr; cap the buffer and drop overflow
            let (stderr_non_blocking, stderr_guard) = NonBlockingBuilder::default()
                .lossy(true)
                .buffered_lines_limit(10_000)
                .finish(std::io::stderr());

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(
                    file_non_blocking
                        .with_max_level(tracing::Level::INFO)
                        .and(stderr_non_blocking),
                )
                .with_ansi(false)
                .init();

            Ok(Some(LoggingGuards {
                _guards: vec![file_guard, stderr_guard],
            }))
        }
        LogMode::Silent => Ok(None),
    }
}

fn rolling_file_writer(log_dir: &Path) -> FileRotate<AppendCount> {
    FileRotate::new(
        log_dir.join(LOG_FILE_NAME),
        AppendCount::new(MAX_ROTATED_LOGS),
        ContentLimit::Bytes(MAX_LOG_BYTES),
        Compression::OnRotate(1),
        None,
    )
}
