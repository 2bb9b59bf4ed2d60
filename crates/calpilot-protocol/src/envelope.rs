//! The uniform response envelope.
//!
//! Every operation outcome is normalized into the same shape, success or
//! failure, so callers never branch on operation-specific error formats:
//!
//! ```json
//! {"statusCode": 200, "body": {"success": true, "status_code": 200, "data": {...}}}
//! {"statusCode": 409, "body": {"success": false, "status_code": 409, "error": "..."}}
//! ```
//!
//! The numeric status is mirrored inside the body for callers that cannot
//! read the transport-level status. Error strings are human-readable and
//! carry no tokens or internal identifiers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inner body of a response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseBody {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Status code, mirrored from the envelope.
    pub status_code: u16,
    /// Operation result on success; identifier echoes on some failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Human-readable error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A complete operation response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Transport-level status code.
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// Response body.
    pub body: ResponseBody,
}

impl Envelope {
    /// Creates a success envelope with the given status and data payload.
    ///
    /// A payload that fails to serialize is a bug in the caller; it is
    /// reported as a 500 envelope rather than panicking the invocation.
    pub fn ok<T: Serialize>(status_code: u16, data: T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self {
                status_code,
                body: ResponseBody {
                    success: true,
                    status_code,
                    data: Some(value),
                    error: None,
                },
            },
            Err(_) => Self::error(500, "Internal error while formatting the response"),
        }
    }

    /// Creates a 201 success envelope.
    pub fn created<T: Serialize>(data: T) -> Self {
        Self::ok(201, data)
    }

    /// Creates an error envelope with the given status and message.
    pub fn error(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            body: ResponseBody {
                success: false,
                status_code,
                data: None,
                error: Some(message.into()),
            },
        }
    }

    /// Creates an error envelope that also echoes identifiers in `data`
    /// (e.g. the `event_id` of a delete that found nothing).
    pub fn error_with<T: Serialize>(status_code: u16, message: impl Into<String>, data: T) -> Self {
        let mut envelope = Self::error(status_code, message);
        envelope.body.data = serde_json::to_value(data).ok();
        envelope
    }

    /// Returns `true` if this envelope reports success.
    pub fn is_success(&self) -> bool {
        self.body.success
    }

    /// Returns the status code.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Returns the data payload, if any.
    pub fn data(&self) -> Option<&Value> {
        self.body.data.as_ref()
    }

    /// Returns the error message, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.body.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_shape() {
        let envelope = Envelope::ok(200, json!({"count": 3}));
        assert!(envelope.is_success());
        assert_eq!(envelope.status_code(), 200);

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["body"]["success"], true);
        assert_eq!(json["body"]["status_code"], 200);
        assert_eq!(json["body"]["data"]["count"], 3);
        assert!(json["body"].get("error").is_none());
    }

    #[test]
    fn created_shape() {
        let envelope = Envelope::created(json!({"id": "e1"}));
        assert_eq!(envelope.status_code(), 201);
        assert!(envelope.is_success());
    }

    #[test]
    fn error_shape() {
        let envelope = Envelope::error(409, "Time overlap detected");
        assert!(!envelope.is_success());
        assert_eq!(envelope.status_code(), 409);
        assert_eq!(envelope.error_message(), Some("Time overlap detected"));

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["body"]["success"], false);
        assert!(json["body"].get("data").is_none());
    }

    #[test]
    fn error_with_echoed_data() {
        let envelope = Envelope::error_with(404, "Event not found", json!({"event_id": "e1"}));
        assert_eq!(envelope.status_code(), 404);
        assert_eq!(envelope.data().unwrap()["event_id"], "e1");
        assert_eq!(envelope.error_message(), Some("Event not found"));
    }

    #[test]
    fn roundtrip() {
        let envelope = Envelope::ok(200, json!({"timezone": "UTC"}));
        let text = serde_json::to_string(&envelope).unwrap();
        let parsed: Envelope = serde_json::from_str(&text).unwrap();
        assert_eq!(envelope, parsed);
    }
}
