// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Error types for ajaxguard
//!
//! Library code returns [`Error`] through the [`Result`] alias. Transport
//! failures that a host primitive hands back to its caller are modelled
//! separately as [`crate::host::FetchError`], because they must reach the
//! caller untouched rather than being wrapped.

use thiserror::Error;

/// Result type alias for ajaxguard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ajaxguard
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Host object used in the wrong lifecycle state (e.g. `send` before `open`)
    #[error("InvalidStateError: {operation}: {reason}")]
    InvalidState { operation: String, reason: String },

    /// Network primitive error surfaced through the host
    #[error("Network error: {0}")]
    Network(String),

    /// Reporting sink failed to accept a record
    #[error("Sink '{sink}' failed: {reason}")]
    Sink { sink: String, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid state error
    pub fn invalid_state(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidState {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Error::Network(msg.into())
    }

    /// Create a sink error
    pub fn sink(sink: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Sink {
            sink: sink.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}
