//! Error types for Elysia
//!
//! This module defines the error types used throughout the application,
//! using `thiserror` for ergonomic error handling.
//!
//! The weather refresh path and the chat history transfer path each have
//! their own typed failure enum ([`WeatherError`], [`TransferError`]) so
//! callers can match on the failure class. Everything else flows through
//! [`ElysiaError`] and the `anyhow`-based [`Result`] alias.

use thiserror::Error;

/// Main error type for Elysia operations
///
/// This enum encompasses the errors that can occur while loading
/// configuration, opening the local stores, and running the CLI commands.
#[derive(Error, Debug)]
pub enum ElysiaError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chat message store errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Preference store errors (key-value operations)
    #[error("Preference store error: {0}")]
    Preferences(String),

    /// Weather refresh failures
    #[error(transparent)]
    Weather(#[from] WeatherError),

    /// Chat history import/export failures
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Classified failure of a weather refresh
///
/// Every step of a refresh (permission, location, fetch, persist) resolves
/// to one of these variants; nothing escapes as a panic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WeatherError {
    /// Location permission has not been granted
    #[error("Location permission was not granted")]
    PermissionDenied,

    /// No location fix was produced (timeout, absence signal, provider failure)
    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    /// The weather service returned a non-2xx status or the transport failed
    #[error("{}", network_message(.status, .body))]
    NetworkError {
        /// HTTP status, absent for transport-level failures
        status: Option<u16>,
        /// Error body or transport failure description
        body: String,
    },

    /// The weather service reported success without a body
    #[error("Weather service returned an empty response")]
    EmptyResponse,

    /// The refreshed snapshot could not be persisted
    #[error("Failed to persist weather snapshot: {0}")]
    Storage(String),
}

fn network_message(status: &Option<u16>, body: &str) -> String {
    match status {
        Some(code) => format!("Weather request failed: HTTP {} - {}", code, body),
        None => format!("Weather request failed: {}", body),
    }
}

/// Classified failure of a chat history import or export
///
/// An export of an empty history is not a failure; see
/// [`crate::transfer::ExportOutcome::EmptyHistory`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// The document could not be parsed as a chat history
    #[error("Malformed chat history document: {0}")]
    MalformedDocument(String),

    /// The import source was blank
    #[error("Chat history file is empty")]
    EmptyFile,

    /// The byte source or destination could not be opened, read or written
    #[error("Chat history file I/O failed: {0}")]
    IoFailure(String),

    /// The requested file format is not supported
    #[error("Unsupported chat history format: {0}")]
    UnsupportedFormat(String),

    /// The message store rejected the operation
    #[error("Chat history storage failed: {0}")]
    Storage(String),
}

/// Result type alias for Elysia operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
