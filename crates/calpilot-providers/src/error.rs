//! Error types for provider operations.
//!
//! This module defines the error taxonomy for credential-store, token, and
//! remote calendar failures, and its mapping onto the response status
//! surface: 400, 401, 403, 404, 409 and 500.

use std::fmt;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// No credential record, or calendar access not granted (403).
    AuthorizationFailed,
    /// Token refresh attempted and rejected, or credentials invalid (401).
    AuthenticationFailed,
    /// Referenced event or resource does not exist remotely (404).
    NotFound,
    /// The remote call was rejected as malformed (400).
    BadRequest,
    /// A time overlap was detected (409).
    Conflict,
    /// Network error - connection failed, timeout, DNS resolution.
    NetworkError,
    /// Rate limit exceeded at the provider.
    RateLimited,
    /// Provider returned a 5xx status.
    ServerError,
    /// Response from the provider could not be parsed.
    InvalidResponse,
    /// Missing or invalid local configuration.
    ConfigurationError,
    /// Unexpected internal state.
    InternalError,
}

impl ProviderErrorCode {
    /// Returns a machine-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationFailed => "authorization_failed",
            Self::AuthenticationFailed => "authentication_failed",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::Conflict => "conflict",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }

    /// Maps this code onto the response status surface.
    ///
    /// Everything outside the caller-addressable taxonomy (network, rate
    /// limiting, provider outages, parse failures, bugs) collapses to 500.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::AuthorizationFailed => 403,
            Self::AuthenticationFailed => 401,
            Self::NotFound => 404,
            Self::BadRequest => 400,
            Self::Conflict => 409,
            Self::NetworkError
            | Self::RateLimited
            | Self::ServerError
            | Self::InvalidResponse
            | Self::ConfigurationError
            | Self::InternalError => 500,
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error from the credential store, token lifecycle, or remote calendar.
#[derive(Debug, Error)]
pub struct ProviderError {
    /// The error code categorizing this error.
    code: ProviderErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates an authorization error (no grant on file).
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthorizationFailed, message)
    }

    /// Creates an authentication error (refresh rejected, token invalid).
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::BadRequest, message)
    }

    /// Creates a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Conflict, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the response status this error maps to.
    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ProviderErrorCode::AuthorizationFailed.http_status(), 403);
        assert_eq!(ProviderErrorCode::AuthenticationFailed.http_status(), 401);
        assert_eq!(ProviderErrorCode::NotFound.http_status(), 404);
        assert_eq!(ProviderErrorCode::BadRequest.http_status(), 400);
        assert_eq!(ProviderErrorCode::Conflict.http_status(), 409);
        assert_eq!(ProviderErrorCode::NetworkError.http_status(), 500);
        assert_eq!(ProviderErrorCode::RateLimited.http_status(), 500);
        assert_eq!(ProviderErrorCode::InternalError.http_status(), 500);
    }

    #[test]
    fn error_creation() {
        let err = ProviderError::authentication("token refresh rejected");
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert_eq!(err.message(), "token refresh rejected");
        assert_eq!(err.http_status(), 401);
    }

    #[test]
    fn error_display() {
        let err = ProviderError::conflict("overlapping event");
        let display = format!("{}", err);
        assert!(display.contains("conflict"));
        assert!(display.contains("overlapping event"));
    }

    #[test]
    fn error_with_source() {
        use std::error::Error;
        let io_err = std::io::Error::other("disk full");
        let err = ProviderError::configuration("failed to persist credentials").with_source(io_err);
        assert!(err.source().is_some());
    }
}
