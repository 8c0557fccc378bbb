use std::path::PathBuf;
use thiserror::Error;

/// Main error type for chanlog
#[derive(Debug, Error)]
pub enum ChanlogError {
    // Sink errors
    #[error("Log directory is not usable: {}: {source}", .path.display())]
    DirectoryResolution {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open log file {}: {source}", .path.display())]
    SinkOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write log file {}: {source}", .path.display())]
    SinkWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Log rotation failed: {0}")]
    Rotation(String),

    #[error("Invalid channel name: {0:?}")]
    InvalidChannel(String),

    #[error("Sink for channel {0} is already open; configure before the first write")]
    SinkAlreadyOpen(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for chanlog operations
pub type Result<T> = std::result::Result<T, ChanlogError>;
