//! Logging setup.
//!
//! Events go to stderr and, when a file is configured, to a non-blocking
//! file writer as well. `RUST_LOG` overrides the configured level.
//!
//! ```ignore
//! let guard = init_logging(&config.logging)?;
//! tracing::info!(level = 3, "Selected tiles");
//! drop(guard); // flushes the file writer
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub use tracing_appender::non_blocking::WorkerGuard;

/// Default filter directive.
pub const DEFAULT_LEVEL: &str = "info";

/// Logging settings from the `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `globetile::surface=trace`
    pub level: String,
    /// Optional log file, written in addition to stderr
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL.to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Checks that `level` is a valid filter directive, ignoring `RUST_LOG`.
    pub fn validate(&self) -> Result<(), LoggingError> {
        self.configured_filter().map(|_| ())
    }

    /// Builds the filter, preferring `RUST_LOG` when it is set.
    pub fn filter(&self) -> Result<EnvFilter, LoggingError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        self.configured_filter()
    }

    fn configured_filter(&self) -> Result<EnvFilter, LoggingError> {
        EnvFilter::try_new(&self.level).map_err(|_| LoggingError::InvalidLevel(self.level.clone()))
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level '{0}'")]
    InvalidLevel(String),

    #[error("cannot open log file {path}: {message}")]
    File { path: PathBuf, message: String },

    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Installs the global subscriber.
///
/// # Returns
///
/// The file writer's guard when a log file is configured. Keep it alive for
/// the life of the program; dropping it flushes pending lines.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = config.filter()?;
    let timer = LocalTime::new(Rfc3339);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(timer.clone());

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let appender = open_appender(path)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(timer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!(level = %config.level, file = ?config.file, "Logging initialized");
    Ok(guard)
}

fn open_appender(path: &Path) -> Result<RollingFileAppender, LoggingError> {
    let file_error = |message: String| LoggingError::File {
        path: path.to_path_buf(),
        message,
    };
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| file_error("not a file path".to_string()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| file_error(e.to_string()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
        .map_err(|e| file_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.file.is_none());
    }

    #[test]
    fn test_builders() {
        let config = LoggingConfig::default()
            .with_level("debug")
            .with_file("/tmp/x.log");
        assert_eq!(config.level, "debug");
        assert_eq!(config.file, Some(PathBuf::from("/tmp/x.log")));
    }

    #[test]
    fn test_validate_level() {
        assert!(LoggingConfig::default()
            .with_level("globetile::surface=trace,warn")
            .validate()
            .is_ok());
        assert!(matches!(
            LoggingConfig::default().with_level("globetile=loud").validate(),
            Err(LoggingError::InvalidLevel(level)) if level == "globetile=loud"
        ));
    }

    #[test]
    fn test_file_path_without_name_rejected() {
        assert!(matches!(
            open_appender(&PathBuf::from("/")),
            Err(LoggingError::File { .. })
        ));
    }

    #[test]
    fn test_appender_creates_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logs").join("globetile.log");
        open_appender(&path).unwrap();
        assert!(dir.path().join("logs").is_dir());
    }
}
