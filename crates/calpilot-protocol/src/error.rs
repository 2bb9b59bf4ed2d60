//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while decoding a request at the boundary.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The request JSON did not parse or did not match any operation.
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use crate::Request;

    #[test]
    fn parse_failure_maps_to_invalid_request() {
        let err = Request::from_json("not json").unwrap_err();
        assert!(err.to_string().contains("Invalid request"));

        let err = Request::from_json(r#"{"op": "summon_meeting"}"#).unwrap_err();
        assert!(err.to_string().contains("Invalid request"));
    }
}
