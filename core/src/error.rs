//! Error types for the proxy-toggle-core crate

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Incomplete configuration: missing {}", .0.join(", "))]
    IncompleteConfiguration(Vec<&'static str>),

    #[error("Press ignored: next toggle allowed in {remaining_ms} ms")]
    Debounced { remaining_ms: u64 },

    #[error("Press ignored: a toggle is still running")]
    ToggleInProgress,

    #[error("Invalid visual state: {0}")]
    InvalidVisualState(u32),

    #[error("Key press carried no button state")]
    MissingVisualState,

    #[error("Command execution failed: {cmd} - {message}")]
    Command { cmd: String, message: String },

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Error::Backend(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// True when the proxy store itself failed: the process could not run,
    /// reported an error, or produced output we could not read.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::Command { .. }
                | Error::CommandNotFound(_)
                | Error::Backend(_)
                | Error::Parse(_)
        )
    }
}
