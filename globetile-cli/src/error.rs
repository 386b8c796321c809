//! CLI error type.

use std::fmt;
use std::path::PathBuf;

use globetile::config::ConfigError;
use globetile::logging::LoggingError;
use globetile::provider::ProviderError;

/// Errors reported by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be read, written or interpreted
    Config(String),
    /// Logging could not be started
    Logging(LoggingError),
    /// A tile source could not be opened
    Source(String),
    /// Output could not be written
    Output { path: PathBuf, message: String },
    /// Invalid command-line input
    Usage(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(e) => write!(f, "Logging error: {}", e),
            CliError::Source(msg) => write!(f, "Tile source error: {}", msg),
            CliError::Output { path, message } => {
                write!(f, "Cannot write {}: {}", path.display(), message)
            }
            CliError::Usage(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<ProviderError> for CliError {
    fn from(e: ProviderError) -> Self {
        CliError::Source(e.to_string())
    }
}
