//! Tracing subscriber setup.

use color_eyre::{eyre::eyre, Result};
use std::io;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Install the global subscriber.
///
/// Logs go to stderr, or to `rescache.log` under `config.dir` when set. The
/// returned guard flushes the file writer on drop and must be kept alive.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>> {
  let level: LevelFilter = config
    .level
    .parse()
    .map_err(|e| eyre!("Invalid log level '{}': {}", config.level, e))?;

  let env_filter = EnvFilter::builder()
    .with_default_directive(level.into())
    .from_env_lossy();

  if let Some(dir) = &config.dir {
    let file_appender = rolling::never(dir, "rescache.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
      .with(env_filter)
      .with(
        tracing_subscriber::fmt::layer()
          .with_writer(writer)
          .with_ansi(false)
          .with_target(true),
      )
      .try_init()
      .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

    Ok(Some(guard))
  } else {
    tracing_subscriber::registry()
      .with(env_filter)
      .with(
        tracing_subscriber::fmt::layer()
          .with_writer(io::stderr)
          .with_target(false),
      )
      .try_init()
      .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

    Ok(None)
  }
}
