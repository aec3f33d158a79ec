//! Server configuration management

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default number of tasks allowed to run at the same time.
pub const DEFAULT_MAX_CONCURRENT_TASKS: usize = 16;

/// Default admission limit (queued plus running tasks).
pub const DEFAULT_MAX_PENDING_TASKS: usize = 256;

/// Default notification channel capacity per request.
pub const DEFAULT_NOTIFICATION_BUFFER: usize = 64;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server name
    pub name: String,
    /// Server version
    pub version: String,
    /// Task runner pool sizing
    pub runner: RunnerConfig,
    /// Settings for the `longRunning` tool
    pub long_running: LongRunningConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Capacity of each request's notification channel
    pub notification_buffer: usize,
}

/// Task runner pool sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Tasks executing work at the same time
    pub max_concurrent_tasks: usize,
    /// Tasks admitted (waiting for a slot or running); further submissions are rejected
    pub max_pending_tasks: usize,
}

/// What the `longRunning` tool does when the client sent no progress token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsupportedProgress {
    /// Skip the work and answer with the "unsupported" message
    #[default]
    Skip,
    /// Run the work anyway, without reporting progress
    RunSilently,
}

/// Settings for the `longRunning` tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LongRunningConfig {
    /// Number of sub-steps
    pub steps: u64,
    /// Pause before each sub-step, in milliseconds
    pub step_delay_ms: u64,
    /// Behaviour for clients without progress support
    pub unsupported: UnsupportedProgress,
}

impl LongRunningConfig {
    /// Pause before each sub-step.
    #[must_use]
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

/// Where log output goes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogOutput {
    /// Standard error only
    #[default]
    Stderr,
    /// Rolling file only
    FileOnly,
    /// Standard error and rolling file
    Both,
    /// Logging disabled
    None,
}

/// Log file rotation period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogRotation {
    /// Every minute
    Minute,
    /// Every hour
    Hourly,
    /// Every day
    Daily,
    /// Single file
    #[default]
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive (overridden by `RUST_LOG`)
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub structured: bool,
    /// Output target
    pub output: LogOutput,
    /// Directory for log files (required for `FileOnly` and `Both`)
    pub directory: Option<PathBuf>,
    /// Log file name prefix
    pub file_prefix: String,
    /// Rotation period
    pub rotation: LogRotation,
}

impl LoggingConfig {
    /// Errors only, to stderr. Keeps stdout free for protocol traffic.
    #[must_use]
    pub fn stderr_minimal() -> Self {
        Self {
            level: "error".to_string(),
            ..Self::default()
        }
    }

    /// Debug output to stderr.
    #[must_use]
    pub fn stderr_debug() -> Self {
        Self {
            level: "debug".to_string(),
            ..Self::default()
        }
    }

    /// File-only logging into `directory`.
    #[must_use]
    pub fn stdio_file(directory: impl Into<PathBuf>) -> Self {
        Self {
            output: LogOutput::FileOnly,
            directory: Some(directory.into()),
            ..Self::default()
        }
    }

    /// Structured logs to stderr and an hourly rolling file.
    #[must_use]
    pub fn production(directory: impl Into<PathBuf>) -> Self {
        Self {
            structured: true,
            output: LogOutput::Both,
            directory: Some(directory.into()),
            rotation: LogRotation::Hourly,
            ..Self::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: crate::SERVER_NAME.to_string(),
            version: crate::SERVER_VERSION.to_string(),
            runner: RunnerConfig::default(),
            long_running: LongRunningConfig::default(),
            logging: LoggingConfig::default(),
            notification_buffer: DEFAULT_NOTIFICATION_BUFFER,
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: DEFAULT_MAX_CONCURRENT_TASKS,
            max_pending_tasks: DEFAULT_MAX_PENDING_TASKS,
        }
    }
}

impl Default for LongRunningConfig {
    fn default() -> Self {
        Self {
            steps: 10,
            step_delay_ms: 500,
            unsupported: UnsupportedProgress::Skip,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            structured: false,
            output: LogOutput::Stderr,
            directory: None,
            file_prefix: "stepmcp".to_string(),
            rotation: LogRotation::Never,
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Unsupported file format
    #[error("Unsupported configuration file format. Use .toml, .yaml, .yml, or .json")]
    UnsupportedFormat,

    /// Configuration parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] config::ConfigError),

    /// Values that parse but cannot be used
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ServerConfig {
    /// Load configuration from a file (TOML, YAML, or JSON)
    ///
    /// Environment variables with the `STEPMCP_` prefix override file settings,
    /// using `__` for nesting (e.g. `STEPMCP_RUNNER__MAX_CONCURRENT_TASKS=4`).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file doesn't exist or can't be inspected
    /// - The file format is unsupported
    /// - The file contains invalid configuration
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        Self::from_file_with_prefix(path, "STEPMCP")
    }

    /// Load configuration from a file with a custom environment prefix
    ///
    /// # Errors
    ///
    /// Same as [`from_file`](Self::from_file).
    pub fn from_file_with_prefix(
        path: impl AsRef<std::path::Path>,
        env_prefix: &str,
    ) -> Result<Self, ConfigError> {
        use config::{Config, File, FileFormat};

        let path = path.as_ref();

        match std::fs::metadata(path) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(ConfigError::IoError(e)),
        }

        let format = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => FileFormat::Toml,
            Some("yaml" | "yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => return Err(ConfigError::UnsupportedFormat),
        };

        let config = Config::builder()
            .add_source(File::new(
                path.to_str().ok_or(ConfigError::UnsupportedFormat)?,
                format,
            ))
            .add_source(
                config::Environment::with_prefix(env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: Self = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Check values the type system can't.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for zero-sized pools or buffers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runner.max_concurrent_tasks == 0 {
            return Err(ConfigError::Invalid(
                "runner.max_concurrent_tasks must be at least 1".to_string(),
            ));
        }
        if self.runner.max_pending_tasks < self.runner.max_concurrent_tasks {
            return Err(ConfigError::Invalid(
                "runner.max_pending_tasks must be >= runner.max_concurrent_tasks".to_string(),
            ));
        }
        if self.notification_buffer == 0 {
            return Err(ConfigError::Invalid(
                "notification_buffer must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a configuration builder
    ///
    /// # Example
    ///
    /// ```rust
    /// use stepmcp_server::ServerConfig;
    ///
    /// let config = ServerConfig::builder()
    ///     .name("my-server")
    ///     .max_concurrent_tasks(4)
    ///     .build();
    /// assert_eq!(config.runner.max_concurrent_tasks, 4);
    /// ```
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::new()
    }
}

/// Configuration builder
#[derive(Debug)]
pub struct ConfigurationBuilder {
    config: ServerConfig,
}

impl ConfigurationBuilder {
    /// Create a new configuration builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Set server name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set server version
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.config.version = version.into();
        self
    }

    /// Set the number of tasks that may run at once
    #[must_use]
    pub const fn max_concurrent_tasks(mut self, max: usize) -> Self {
        self.config.runner.max_concurrent_tasks = max;
        if self.config.runner.max_pending_tasks < max {
            self.config.runner.max_pending_tasks = max;
        }
        self
    }

    /// Set the admission limit for queued plus running tasks
    #[must_use]
    pub const fn max_pending_tasks(mut self, max: usize) -> Self {
        self.config.runner.max_pending_tasks = max;
        self
    }

    /// Set the `longRunning` step count and delay
    #[must_use]
    pub fn long_running(mut self, steps: u64, step_delay: Duration) -> Self {
        self.config.long_running.steps = steps;
        self.config.long_running.step_delay_ms =
            u64::try_from(step_delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Choose how `longRunning` treats clients without progress support
    #[must_use]
    pub const fn unsupported_progress(mut self, policy: UnsupportedProgress) -> Self {
        self.config.long_running.unsupported = policy;
        self
    }

    /// Set the per-request notification buffer
    #[must_use]
    pub const fn notification_buffer(mut self, capacity: usize) -> Self {
        self.config.notification_buffer = capacity;
        self
    }

    /// Set log level
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Replace the logging configuration
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> ServerConfig {
        self.config
    }
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}
