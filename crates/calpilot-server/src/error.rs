//! Server error types.

use std::io;
use thiserror::Error;

/// Result type for server startup and configuration.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur before a request is dispatched.
///
/// Operation failures never surface here; they are formatted into response
/// envelopes instead.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (stdin, credential file).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Tracing initialization failed.
    #[error("Tracing error: {0}")]
    Tracing(#[from] calpilot_core::tracing::TracingError),

    /// The credential store could not be opened.
    #[error("Credential store error: {0}")]
    Store(#[from] calpilot_providers::ProviderError),
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
