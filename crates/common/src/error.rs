//! Error types for callprobe

use thiserror::Error;

use crate::types::CallStatus;

/// Result type alias using callprobe Error
pub type Result<T> = std::result::Result<T, Error>;

/// callprobe error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Request to {endpoint} timed out after {timeout_ms}ms")]
    RequestTimeout { endpoint: String, timeout_ms: u64 },

    #[error("HTTP error: {status} {status_text}")]
    HttpError { status: u16, status_text: String },

    #[error("Call creation failed: {0}")]
    CallCreationError(String),

    #[error("Sending digits to call {handle} failed with status {status}")]
    DigitInputError { handle: String, status: u16 },

    #[error("Dropping call {handle} failed with status {status}")]
    CallDropError { handle: String, status: u16 },

    #[error("Invalid response format: {0}")]
    InvalidResponseFormat(String),

    #[error("Polling call {handle} failed on all {attempts} attempts: {last_error}")]
    PollExhausted {
        handle: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Call still {last_status} after {max_attempts} status checks")]
    PollTimeout {
        last_status: CallStatus,
        max_attempts: u32,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error came from the poller giving up, as opposed to a
    /// failed request or rejected input.
    pub fn is_poll_failure(&self) -> bool {
        matches!(self, Error::PollExhausted { .. } | Error::PollTimeout { .. })
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}
