use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const LOG_DIR_NAME: &str = "logs";
const LOG_FILE_NAME: &str = "songbook-manager.log";

/// Send `tracing` output to a file under `data_dir/logs`. The terminal is
/// owned by the TUI, so nothing is written to stdout.
///
/// The returned guard flushes pending lines when dropped and must live until
/// the program exits.
pub fn init_logging(data_dir: &Path) -> Result<WorkerGuard> {
    let log_dir = data_dir.join(LOG_DIR_NAME);
    fs::create_dir_all(&log_dir).context("failed to create log directory")?;

    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .try_init()
        .context("failed to install log subscriber")?;

    Ok(guard)
}
