//! Log setup: daily rolling file in the data directory, optionally mirrored
//! to stderr.

use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "stockroom=info";
const LOG_FILE_PREFIX: &str = "stockroom.log";

/// `$XDG_DATA_HOME/stockroom/logs`, or a temp directory without a data dir.
pub fn log_dir() -> PathBuf {
  dirs::data_dir()
    .unwrap_or_else(std::env::temp_dir)
    .join("stockroom")
    .join("logs")
}

/// Install the global subscriber. Keep the guard alive until exit so
/// buffered lines are flushed.
pub fn init(verbose: bool) -> Result<WorkerGuard> {
  let dir = log_dir();
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let directives = filter_directives(|name| std::env::var(name).ok());
  let filter = EnvFilter::try_new(&directives)
    .map_err(|e| eyre!("Invalid log filter {:?}: {}", directives, e))?;

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .with(verbose.then(|| fmt::layer().with_writer(std::io::stderr).with_target(false)))
    .try_init()
    .map_err(|e| eyre!("Failed to init logging: {}", e))?;

  tracing::debug!(dir = %dir.display(), filter = %directives, "logging initialized");
  Ok(guard)
}

/// `STOCKROOM_LOG`, then `RUST_LOG`, then the default.
fn filter_directives(var: impl Fn(&str) -> Option<String>) -> String {
  ["STOCKROOM_LOG", "RUST_LOG"]
    .into_iter()
    .find_map(|name| var(name).filter(|v| !v.trim().is_empty()))
    .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}
