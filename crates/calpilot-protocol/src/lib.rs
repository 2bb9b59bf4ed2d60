//! Request/response surface for calpilot operations.
//!
//! Every operation is invoked with a single structured request object and
//! returns a single structured response object:
//!
//! - [`Request`] is a tagged record per operation with a closed set of
//!   fields, validated at the boundary before any remote call.
//! - [`Envelope`] is the uniform success/error response shape:
//!   `{"statusCode": N, "body": {"success": bool, "status_code": N,
//!   "data": ... | "error": "..."}}`.
//!
//! # Example
//!
//! ```rust
//! use calpilot_protocol::{Envelope, Request};
//!
//! let request: Request =
//!     serde_json::from_str(r#"{"op": "get_timezone", "email": "a@x.com"}"#).unwrap();
//! assert!(request.validate().is_ok());
//!
//! let envelope = Envelope::error(400, "Missing required fields: email");
//! assert!(!envelope.is_success());
//! ```

mod envelope;
mod error;
mod types;

pub use envelope::{Envelope, ResponseBody};
pub use error::{ProtocolError, ProtocolResult};
pub use types::{
    AvailabilityData, DeleteData, EventData, EventListData, InstanceListData, Request, RsvpData,
    TimezoneData, UpdateData, UpdateScope,
};
