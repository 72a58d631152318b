//! Error types for vulture.

use std::path::PathBuf;

/// Top-level error type for the relay.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("PID file error: {0}")]
    PidFile(#[from] PidFileError),

    #[error("Signal handler error: {0}")]
    Signal(#[from] std::io::Error),

    #[error("Poller task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors talking to the chat service.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Request to {method} failed: {reason}")]
    RequestFailed { method: String, reason: String },

    #[error("HTTP error from {method}: {status}")]
    Http { method: String, status: u16 },

    #[error("Slack API error from {method}: {error}")]
    Api { method: String, error: String },

    #[error("Invalid response from {method}: {reason}")]
    InvalidResponse { method: String, reason: String },
}

/// Single-instance PID file errors.
#[derive(Debug, thiserror::Error)]
pub enum PidFileError {
    #[error("Already running with pid {pid} ({path})")]
    AlreadyRunning { pid: i32, path: PathBuf },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for the relay.
pub type Result<T> = std::result::Result<T, Error>;
