use std::path::PathBuf;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Overrides the configured level, e.g. `SPEAKR_LOG=speakr=debug`.
pub const LOG_ENV: &str = "SPEAKR_LOG";

/// Directory holding `speakr.log`. Falls back to the working directory.
pub fn log_dir() -> PathBuf {
    match dirs::data_local_dir() {
        Some(data_dir) => data_dir.join("speakr"),
        None => PathBuf::from("."),
    }
}

/// Installs a file-backed subscriber; the terminal belongs to the TUI.
/// The returned guard flushes pending lines on drop and must outlive the app.
pub fn init(level: &str) -> Result<WorkerGuard> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir)?;
    let appender = tracing_appender::rolling::never(&dir, "speakr.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .try_init()?;
    Ok(guard)
}
