//! Logging initialization
//!
//! Logs never go to stdout: for STDIO-hosted MCP servers that is the protocol
//! channel. File output needs the returned [`LoggingGuard`] to be held for the
//! life of the process, otherwise buffered lines are lost on exit.
//!
//! ```rust,no_run
//! use stepmcp_server::LoggingConfig;
//!
//! // Stderr-only (no guard needed)
//! LoggingConfig::stderr_minimal().init()?;
//!
//! // File logging (guard must be held)
//! let _guard = LoggingConfig::stdio_file("/var/log/stepmcp").init()?;
//! # Ok::<(), std::io::Error>(())
//! ```

use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogOutput, LogRotation, LoggingConfig};

/// Guard that flushes file logs on drop
#[derive(Debug)]
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
    _stderr_guard: Option<WorkerGuard>,
}

impl LoggingConfig {
    /// Initialize the global tracing subscriber from this configuration.
    ///
    /// Returns `Some(LoggingGuard)` for file-based logging (must be held),
    /// or `None` for stderr-only logging.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File logging is configured but no directory is set or it can't be created
    /// - A global subscriber is already installed
    pub fn init(&self) -> io::Result<Option<LoggingGuard>> {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.output {
            LogOutput::None => Ok(None),
            LogOutput::Stderr => {
                init_stderr(self, filter)?;
                Ok(None)
            }
            LogOutput::FileOnly => {
                let dir = self.require_directory()?;
                init_file_only(self, dir, filter).map(Some)
            }
            LogOutput::Both => {
                let dir = self.require_directory()?;
                init_stderr_and_file(self, dir, filter).map(Some)
            }
        }
    }

    fn require_directory(&self) -> io::Result<&Path> {
        self.directory.as_deref().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "File logging requires a directory (set logging.directory)",
            )
        })
    }
}

fn init_stderr(config: &LoggingConfig, filter: EnvFilter) -> io::Result<()> {
    let subscriber = tracing_subscriber::registry().with(filter);

    if config.structured {
        subscriber
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init()
            .map_err(|e| io::Error::other(e.to_string()))
    } else {
        subscriber
            .with(fmt::layer().with_writer(io::stderr))
            .try_init()
            .map_err(|e| io::Error::other(e.to_string()))
    }
}

fn file_appender(config: &LoggingConfig, dir: &Path) -> io::Result<RollingFileAppender> {
    std::fs::create_dir_all(dir)?;
    let prefix = &config.file_prefix;
    Ok(match config.rotation {
        LogRotation::Minute => tracing_appender::rolling::minutely(dir, prefix),
        LogRotation::Hourly => tracing_appender::rolling::hourly(dir, prefix),
        LogRotation::Daily => tracing_appender::rolling::daily(dir, prefix),
        LogRotation::Never => tracing_appender::rolling::never(dir, prefix),
    })
}

fn init_file_only(
    config: &LoggingConfig,
    dir: &Path,
    filter: EnvFilter,
) -> io::Result<LoggingGuard> {
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender(config, dir)?);
    let subscriber = tracing_subscriber::registry().with(filter);

    if config.structured {
        subscriber
            .with(fmt::layer().json().with_ansi(false).with_writer(non_blocking))
            .try_init()
            .map_err(|e| io::Error::other(e.to_string()))?;
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .try_init()
            .map_err(|e| io::Error::other(e.to_string()))?;
    }

    Ok(LoggingGuard {
        _file_guard: guard,
        _stderr_guard: None,
    })
}

fn init_stderr_and_file(
    config: &LoggingConfig,
    dir: &Path,
    filter: EnvFilter,
) -> io::Result<LoggingGuard> {
    let (file_non_blocking, file_guard) =
        tracing_appender::non_blocking(file_appender(config, dir)?);
    let (stderr_non_blocking, stderr_guard) = tracing_appender::non_blocking(io::stderr());
    let combined = file_non_blocking.and(stderr_non_blocking);

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.structured {
        subscriber
            .with(fmt::layer().json().with_ansi(false).with_writer(combined))
            .try_init()
            .map_err(|e| io::Error::other(e.to_string()))?;
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(combined))
            .try_init()
            .map_err(|e| io::Error::other(e.to_string()))?;
    }

    Ok(LoggingGuard {
        _file_guard: file_guard,
        _stderr_guard: Some(stderr_guard),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_presets() {
        let config = LoggingConfig::stderr_minimal();
        assert_eq!(config.level, "error");
        assert_eq!(config.output, LogOutput::Stderr);
        assert!(config.directory.is_none());

        let config = LoggingConfig::stdio_file("/var/log/test");
        assert_eq!(config.level, "info");
        assert_eq!(config.output, LogOutput::FileOnly);
        assert!(config.directory.is_some());

        let config = LoggingConfig::stderr_debug();
        assert_eq!(config.level, "debug");

        let config = LoggingConfig::production("/var/log/prod");
        assert_eq!(config.output, LogOutput::Both);
        assert_eq!(config.rotation, LogRotation::Hourly);
        assert!(config.structured);
    }

    #[test]
    fn test_file_only_requires_directory() {
        let config = LoggingConfig {
            output: LogOutput::FileOnly,
            directory: None,
            ..LoggingConfig::default()
        };

        let err = config.init().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_disabled_logging_needs_no_guard() {
        let config = LoggingConfig {
            output: LogOutput::None,
            ..LoggingConfig::default()
        };
        assert!(config.init().unwrap().is_none());
    }
}
