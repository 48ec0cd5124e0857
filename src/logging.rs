//! Tracing setup.
//!
//! A terminal UI owns stdout, so logs go to a file through a non-blocking
//! writer. Keep the returned guard alive for the life of the app; dropping
//! it flushes whatever is still queued.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

pub const LOG_FILE: &str = "spark-stencil.log";

pub struct LoggingGuard {
    _guard: WorkerGuard,
    log_file: PathBuf,
}

impl LoggingGuard {
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}

/// Install the global subscriber.
///
/// Fails if the log directory cannot be created or a global subscriber is
/// already set.
pub fn init(config: &Config) -> io::Result<LoggingGuard> {
    fs::create_dir_all(&config.log_dir)?;

    let appender = tracing_appender::rolling::never(&config.log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_new(&config.log_filter)
        .unwrap_or_else(|_| EnvFilter::new(Config::default().log_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_names(true),
        )
        .try_init()
        .map_err(io::Error::other)?;

    let log_file = config.log_dir.join(LOG_FILE);
    tracing::info!(log_file = %log_file.display(), filter = %config.log_filter, "tracing initialized");

    Ok(LoggingGuard {
        _guard: guard,
        log_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_to_log_dir_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            log_dir: dir.path().join("logs"),
            log_filter: "spark_stencil=debug".to_string(),
            ..Config::default()
        };

        let guard = init(&config).unwrap();
        assert_eq!(guard.log_file(), config.log_dir.join(LOG_FILE));
        assert!(config.log_dir.is_dir());

        // The global subscriber is already set
        assert!(init(&config).is_err());
        drop(guard);
    }
}
