//! # Core Error Types
//!
//! Centralized error definitions for the voucher-core crate.
//! All errors implement `std::error::Error` and `std::fmt::Display`.

use thiserror::Error;

/// Unified error type for voucher-core operations.
///
/// This enum wraps all specific error types and provides a unified
/// error interface for the application layer.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Config(ConfigError),

    #[error(transparent)]
    Network(NetworkError),

    #[error(transparent)]
    Parse(ParseError),

    #[error("Unknown error: {message}")]
    Unknown { message: String },
}

impl From<ConfigError> for CoreError {
    fn from(e: ConfigError) -> Self {
        CoreError::Config(e)
    }
}

impl From<NetworkError> for CoreError {
    fn from(e: NetworkError) -> Self {
        CoreError::Network(e)
    }
}

impl From<ParseError> for CoreError {
    fn from(e: ParseError) -> Self {
        CoreError::Parse(e)
    }
}

/// Configuration-related errors. Fatal: a run never starts with a
/// broken configuration.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Missing required configuration field: '{field}'")]
    MissingField { field: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid endpoint URL: '{url}'")]
    InvalidUrl { url: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("I/O error reading {path}: {msg}")]
    IoError { path: String, msg: String },
}

/// Transport-level errors. Retryable up to the attempt budget, then
/// absorbed as a counted job failure.
#[derive(Error, Debug, Clone)]
pub enum NetworkError {
    #[error("Request timeout after {timeout_ms}ms to {endpoint}")]
    Timeout { timeout_ms: u64, endpoint: String },

    #[error("Connection failed to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    #[error("HTTP error {status_code} from {endpoint}")]
    HttpError { status_code: u16, endpoint: String },

    #[error("Invalid proxy descriptor: '{descriptor}'")]
    InvalidProxy { descriptor: String },

    #[error("Body decode failed from {endpoint}: {reason}")]
    DecodeFailed { endpoint: String, reason: String },
}

/// An expected field was absent from a structurally valid response.
/// Counted as a miss; never fatal to the run.
#[derive(Error, Debug, Clone)]
pub enum ParseError {
    #[error("Expected field '{field}' absent from {endpoint} response")]
    FieldAbsent { field: String, endpoint: String },

    #[error("Malformed payload from {endpoint}: {reason}")]
    MalformedPayload { endpoint: String, reason: String },
}
