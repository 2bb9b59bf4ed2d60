//! Request and response payload types for calpilot operations.

use serde::{Deserialize, Serialize};

use calpilot_core::event::EventView;
use calpilot_core::time::{TimeWindow, parse_datetime};

use crate::error::ProtocolResult;

/// A request for one calendar operation.
///
/// Requests arrive as JSON tagged by `op`. Required string fields default to
/// empty when absent so [`Request::validate`] can report every missing field
/// in one pass instead of failing on the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// List events on the primary calendar for the next two weeks.
    ListEvents {
        #[serde(default)]
        email: String,
    },

    /// List instances of a recurring event for the next two weeks.
    ListInstances {
        #[serde(default)]
        email: String,
        #[serde(default)]
        event_id: String,
    },

    /// Create an event, rejecting any time overlap with existing events.
    CreateEvent {
        #[serde(default)]
        email: String,
        #[serde(default)]
        event_name: String,
        #[serde(default)]
        start_datetime: String,
        #[serde(default)]
        end_datetime: String,
        #[serde(default)]
        guest_emails: Vec<String>,
        #[serde(default)]
        description: Option<String>,
    },

    /// Patch an event (or a single recurring instance) with the supplied
    /// fields only.
    UpdateEvent {
        #[serde(default)]
        email: String,
        #[serde(default)]
        event_id: String,
        #[serde(default)]
        event_name: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        start_datetime: Option<String>,
        #[serde(default)]
        end_datetime: Option<String>,
        #[serde(default)]
        guest_emails: Option<Vec<String>>,
        #[serde(default)]
        recurrence: Option<Vec<String>>,
    },

    /// Delete an event; the provider notifies attendees.
    DeleteEvent {
        #[serde(default)]
        email: String,
        #[serde(default)]
        event_id: String,
    },

    /// Set the acting user's RSVP on an event.
    Rsvp {
        #[serde(default)]
        email: String,
        #[serde(default)]
        event_id: String,
        #[serde(default)]
        rsvp_status: String,
        #[serde(default)]
        note: Option<String>,
    },

    /// Query free/busy intervals over a window.
    GetAvailability {
        #[serde(default)]
        email: String,
        #[serde(default)]
        start_time: Option<String>,
        #[serde(default)]
        end_time: Option<String>,
    },

    /// Read the primary calendar's declared timezone.
    GetTimezone {
        #[serde(default)]
        email: String,
    },
}

impl Request {
    /// Decodes a request from its JSON wire form.
    pub fn from_json(raw: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Returns the operation name, as used in the wire tag and in logs.
    pub fn op_name(&self) -> &'static str {
        match self {
            Self::ListEvents { .. } => "list_events",
            Self::ListInstances { .. } => "list_instances",
            Self::CreateEvent { .. } => "create_event",
            Self::UpdateEvent { .. } => "update_event",
            Self::DeleteEvent { .. } => "delete_event",
            Self::Rsvp { .. } => "rsvp",
            Self::GetAvailability { .. } => "get_availability",
            Self::GetTimezone { .. } => "get_timezone",
        }
    }

    /// Validates input shape before any store or remote call.
    ///
    /// Required fields must be present and non-empty; datetimes must parse
    /// as ISO-8601. On failure the error message enumerates the offending
    /// fields so an automated caller can fix its request in one round trip.
    pub fn validate(&self) -> Result<(), String> {
        let mut missing: Vec<&'static str> = Vec::new();
        let mut malformed: Vec<&'static str> = Vec::new();

        let mut require = |name: &'static str, value: &str| {
            if value.is_empty() {
                missing.push(name);
            }
        };

        match self {
            Self::ListEvents { email } | Self::GetTimezone { email } => {
                require("email", email);
            }
            Self::ListInstances { email, event_id } | Self::DeleteEvent { email, event_id } => {
                require("email", email);
                require("event_id", event_id);
            }
            Self::CreateEvent {
                email,
                event_name,
                start_datetime,
                end_datetime,
                ..
            } => {
                require("email", email);
                require("event_name", event_name);
                require("start_datetime", start_datetime);
                require("end_datetime", end_datetime);
                check_datetime("start_datetime", start_datetime, &mut malformed);
                check_datetime("end_datetime", end_datetime, &mut malformed);
            }
            Self::UpdateEvent {
                email,
                event_id,
                start_datetime,
                end_datetime,
                ..
            } => {
                require("email", email);
                require("event_id", event_id);
                check_optional_datetime("start_datetime", start_datetime, &mut malformed);
                check_optional_datetime("end_datetime", end_datetime, &mut malformed);
            }
            Self::Rsvp {
                email,
                event_id,
                rsvp_status,
                ..
            } => {
                require("email", email);
                require("event_id", event_id);
                require("rsvp_status", rsvp_status);
            }
            Self::GetAvailability {
                email,
                start_time,
                end_time,
            } => {
                require("email", email);
                check_optional_datetime("start_time", start_time, &mut malformed);
                check_optional_datetime("end_time", end_time, &mut malformed);
            }
        }

        if !missing.is_empty() {
            return Err(format!("Missing required fields: {}", missing.join(", ")));
        }
        if !malformed.is_empty() {
            return Err(format!(
                "Malformed ISO-8601 datetime in fields: {}",
                malformed.join(", ")
            ));
        }
        Ok(())
    }
}

fn check_datetime(name: &'static str, value: &str, malformed: &mut Vec<&'static str>) {
    if !value.is_empty() && parse_datetime(value).is_none() {
        malformed.push(name);
    }
}

fn check_optional_datetime(
    name: &'static str,
    value: &Option<String>,
    malformed: &mut Vec<&'static str>,
) {
    if let Some(value) = value {
        check_datetime(name, value, malformed);
    }
}

/// Payload for a successful `list_events` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventListData {
    pub events: Vec<EventView>,
    pub count: usize,
    pub timezone: String,
    pub time_range: TimeWindow,
}

/// Payload for a successful `list_instances` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceListData {
    pub instances: Vec<EventView>,
    pub count: usize,
    pub parent_event_id: String,
    pub time_range: TimeWindow,
}

/// Payload for a successful `create_event` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub event: EventView,
    pub message: String,
}

/// Whether an update targeted a whole series or a single instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateScope {
    Series,
    Instance,
}

/// Payload for a successful `update_event` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateData {
    pub event: EventView,
    pub scope: UpdateScope,
    pub message: String,
}

/// Payload for a successful `delete_event` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteData {
    pub message: String,
    pub event_id: String,
}

/// Payload for a successful `rsvp` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsvpData {
    pub message: String,
    pub event_id: String,
    pub rsvp_status: String,
}

/// Payload for a successful `get_availability` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityData {
    pub time_range: TimeWindow,
    pub busy_slots: Vec<TimeWindow>,
    pub busy_count: usize,
}

/// Payload for a successful `get_timezone` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimezoneData {
    pub timezone: String,
    pub calendar_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_summary: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serde_get_timezone() {
        let json = r#"{"op": "get_timezone", "email": "a@x.com"}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        assert_eq!(
            request,
            Request::GetTimezone {
                email: "a@x.com".to_string()
            }
        );
        assert_eq!(request.op_name(), "get_timezone");
    }

    #[test]
    fn request_serde_create_event() {
        let json = r#"{
            "op": "create_event",
            "email": "a@x.com",
            "event_name": "Sync",
            "start_datetime": "2025-10-20T10:00:00Z",
            "end_datetime": "2025-10-20T11:00:00Z",
            "guest_emails": ["b@x.com"]
        }"#;
        let request: Request = serde_json::from_str(json).unwrap();
        assert!(request.validate().is_ok());
        match request {
            Request::CreateEvent {
                guest_emails,
                description,
                ..
            } => {
                assert_eq!(guest_emails, vec!["b@x.com".to_string()]);
                assert!(description.is_none());
            }
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[test]
    fn missing_fields_are_enumerated() {
        let json = r#"{"op": "create_event", "email": "a@x.com"}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        let err = request.validate().unwrap_err();
        assert!(err.contains("Missing required fields"));
        assert!(err.contains("event_name"));
        assert!(err.contains("start_datetime"));
        assert!(err.contains("end_datetime"));
        assert!(!err.contains("email,"));
    }

    #[test]
    fn missing_email_is_reported() {
        let json = r#"{"op": "list_events"}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        let err = request.validate().unwrap_err();
        assert_eq!(err, "Missing required fields: email");
    }

    #[test]
    fn malformed_datetime_is_rejected() {
        let json = r#"{
            "op": "create_event",
            "email": "a@x.com",
            "event_name": "Sync",
            "start_datetime": "next tuesday",
            "end_datetime": "2025-10-20T11:00:00Z"
        }"#;
        let request: Request = serde_json::from_str(json).unwrap();
        let err = request.validate().unwrap_err();
        assert!(err.contains("Malformed ISO-8601"));
        assert!(err.contains("start_datetime"));
        assert!(!err.contains("end_datetime"));
    }

    #[test]
    fn update_optional_datetimes_are_checked() {
        let json = r#"{
            "op": "update_event",
            "email": "a@x.com",
            "event_id": "e1",
            "start_datetime": "garbage"
        }"#;
        let request: Request = serde_json::from_str(json).unwrap();
        assert!(request.validate().is_err());

        let json = r#"{"op": "update_event", "email": "a@x.com", "event_id": "e1"}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn rsvp_requires_status_presence_only() {
        // The enum check happens at the operation layer; the boundary only
        // requires the field to be present.
        let json = r#"{"op": "rsvp", "email": "a@x.com", "event_id": "e1"}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        let err = request.validate().unwrap_err();
        assert!(err.contains("rsvp_status"));
    }

    #[test]
    fn unknown_op_fails_to_parse() {
        let json = r#"{"op": "summon_meeting", "email": "a@x.com"}"#;
        assert!(serde_json::from_str::<Request>(json).is_err());
    }
}
