//! Calendar event model.
//!
//! This module provides the event types shared across the workspace:
//! - [`CalendarEvent`]: the in-memory event representation (never persisted)
//! - [`EventView`]: a wire-ready projection with times in a target timezone
//! - [`EventId`]: composite id handling for recurring-event instances
//! - [`RsvpStatus`] / [`ResponseStatus`]: attendee response handling

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::time::EventTime;

/// The response status for an event attendee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseStatus {
    /// The attendee has accepted the invitation.
    Accepted,
    /// The attendee has declined the invitation.
    Declined,
    /// The attendee has tentatively accepted.
    Tentative,
    /// The attendee has not responded.
    #[default]
    NeedsAction,
}

/// An RSVP choice the acting user can make on an event.
///
/// This is the closed set of statuses accepted at the request boundary;
/// anything else is rejected before any remote call is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsvpStatus {
    Accepted,
    Tentative,
    Declined,
}

impl RsvpStatus {
    /// All accepted status names, for error messages.
    pub const VALID_NAMES: [&'static str; 3] = ["accepted", "tentative", "declined"];

    /// Returns the lowercase wire name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Tentative => "tentative",
            Self::Declined => "declined",
        }
    }

    /// Converts to the attendee response status it sets.
    pub fn as_response_status(&self) -> ResponseStatus {
        match self {
            Self::Accepted => ResponseStatus::Accepted,
            Self::Tentative => ResponseStatus::Tentative,
            Self::Declined => ResponseStatus::Declined,
        }
    }
}

impl FromStr for RsvpStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "accepted" => Ok(Self::Accepted),
            "tentative" => Ok(Self::Tentative),
            "declined" => Ok(Self::Declined),
            _ => Err(()),
        }
    }
}

impl fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An attendee on a calendar event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    /// The attendee's email address.
    pub email: String,

    /// Display name, if the provider supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// The attendee's current response status.
    #[serde(default)]
    pub response_status: ResponseStatus,

    /// Free-form response note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Whether this attendee organizes the event.
    #[serde(default)]
    pub organizer: bool,

    /// Whether this attendee is the calendar owner.
    #[serde(default)]
    pub is_self: bool,
}

impl Attendee {
    /// Creates an attendee with just an email address and no response yet.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Default::default()
        }
    }
}

/// An event fetched from the remote calendar.
///
/// Produced and consumed only by remote calendar calls; never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Provider event identifier.
    pub id: String,

    /// Event title.
    pub summary: String,

    /// Event description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Event start.
    pub start: EventTime,

    /// Event end.
    pub end: EventTime,

    /// Provider status string (e.g. "confirmed").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Attendees, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,

    /// Recurrence rules for a recurring series.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recurrence: Vec<String>,

    /// Parent series id when this event is a recurring instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_event_id: Option<String>,

    /// Event location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Link to the event in the provider's UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,

    /// Creation timestamp, if the provider reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// Last update timestamp, if the provider reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

impl CalendarEvent {
    /// Creates a minimal event with the given id, title and times.
    pub fn new(
        id: impl Into<String>,
        summary: impl Into<String>,
        start: EventTime,
        end: EventTime,
    ) -> Self {
        Self {
            id: id.into(),
            summary: summary.into(),
            description: None,
            start,
            end,
            status: None,
            attendees: Vec::new(),
            recurrence: Vec::new(),
            recurring_event_id: None,
            location: None,
            html_link: None,
            created: None,
            updated: None,
        }
    }

    /// Returns the event title, or "Untitled" if the summary is empty.
    pub fn title(&self) -> &str {
        if self.summary.is_empty() {
            "Untitled"
        } else {
            &self.summary
        }
    }

    /// Checks whether this event overlaps the half-open range
    /// `[start, end)`.
    ///
    /// Two ranges overlap iff each starts before the other ends. Ranges that
    /// merely touch at a boundary do not overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start.to_utc_datetime() < end && start < self.end.to_utc_datetime()
    }
}

/// A start/end stamp rendered for the wire, mirroring the provider's shape:
/// timed events carry `dateTime` with the target timezone, all-day events
/// carry a bare `date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalStamp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl LocalStamp {
    /// Renders an event time in the given timezone.
    pub fn localized(time: &EventTime, tz: &Tz) -> Self {
        match time {
            EventTime::DateTime(dt) => Self {
                date_time: Some(dt.with_timezone(tz).to_rfc3339()),
                date: None,
                time_zone: Some(tz.name().to_string()),
            },
            EventTime::AllDay(date) => Self {
                date_time: None,
                date: Some(*date),
                time_zone: None,
            },
        }
    }
}

/// A wire-ready projection of a [`CalendarEvent`] with start/end rendered in
/// the calendar's timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventView {
    pub id: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: LocalStamp,
    pub end: LocalStamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recurrence: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
}

impl EventView {
    /// Projects an event into the given timezone.
    pub fn localized(event: &CalendarEvent, tz: &Tz) -> Self {
        Self {
            id: event.id.clone(),
            summary: event.title().to_string(),
            description: event.description.clone(),
            start: LocalStamp::localized(&event.start, tz),
            end: LocalStamp::localized(&event.end, tz),
            status: event.status.clone(),
            attendees: event.attendees.clone(),
            recurrence: event.recurrence.clone(),
            recurring_event_id: event.recurring_event_id.clone(),
            location: event.location.clone(),
            html_link: event.html_link.clone(),
        }
    }
}

/// A parsed event identifier.
///
/// Recurring-event instances are addressed by a composite id of the form
/// `{parentId}_{YYYYMMDDTHHMMSSZ}`; a bare id addresses a single event or a
/// whole recurring series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventId {
    /// The series (or plain event) identifier.
    pub parent: String,
    /// The occurrence timestamp when the id addresses a single instance.
    pub instance: Option<NaiveDateTime>,
}

impl EventId {
    /// Parses an event id, splitting off an instance suffix when present.
    ///
    /// An id only counts as an instance id when the text after the final
    /// underscore parses as a `YYYYMMDDTHHMMSSZ` timestamp; otherwise the
    /// whole string is the parent id.
    pub fn parse(id: &str) -> Self {
        if let Some((parent, suffix)) = id.rsplit_once('_')
            && !parent.is_empty()
            && let Ok(instance) = NaiveDateTime::parse_from_str(suffix, "%Y%m%dT%H%M%SZ")
        {
            return Self {
                parent: parent.to_string(),
                instance: Some(instance),
            };
        }
        Self {
            parent: id.to_string(),
            instance: None,
        }
    }

    /// Returns `true` if this id addresses a single recurring instance.
    pub fn is_instance(&self) -> bool {
        self.instance.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn timed_event(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> CalendarEvent {
        CalendarEvent::new(id, "Test", EventTime::from_utc(start), EventTime::from_utc(end))
    }

    #[test]
    fn rsvp_status_parsing() {
        assert_eq!("accepted".parse::<RsvpStatus>(), Ok(RsvpStatus::Accepted));
        assert_eq!("TENTATIVE".parse::<RsvpStatus>(), Ok(RsvpStatus::Tentative));
        assert_eq!("declined".parse::<RsvpStatus>(), Ok(RsvpStatus::Declined));
        assert!("maybe".parse::<RsvpStatus>().is_err());
        assert!("".parse::<RsvpStatus>().is_err());
    }

    #[test]
    fn rsvp_status_maps_to_response_status() {
        assert_eq!(
            RsvpStatus::Accepted.as_response_status(),
            ResponseStatus::Accepted
        );
        assert_eq!(
            RsvpStatus::Declined.as_response_status(),
            ResponseStatus::Declined
        );
    }

    #[test]
    fn title_falls_back_for_empty_summary() {
        let event = timed_event("e1", utc(2025, 10, 20, 10, 0, 0), utc(2025, 10, 20, 11, 0, 0));
        assert_eq!(event.title(), "Test");

        let mut untitled = event;
        untitled.summary = String::new();
        assert_eq!(untitled.title(), "Untitled");
    }

    #[test]
    fn overlap_is_half_open() {
        let event = timed_event("e1", utc(2025, 10, 20, 10, 30, 0), utc(2025, 10, 20, 11, 30, 0));

        // Overlapping candidate window
        assert!(event.overlaps(utc(2025, 10, 20, 10, 0, 0), utc(2025, 10, 20, 11, 0, 0)));

        // Candidate ends exactly when the event starts
        assert!(!event.overlaps(utc(2025, 10, 20, 9, 30, 0), utc(2025, 10, 20, 10, 30, 0)));

        // Candidate starts exactly when the event ends
        assert!(!event.overlaps(utc(2025, 10, 20, 11, 30, 0), utc(2025, 10, 20, 12, 30, 0)));
    }

    #[test]
    fn event_view_localizes_times() {
        let event = timed_event("e1", utc(2025, 10, 20, 14, 0, 0), utc(2025, 10, 20, 15, 0, 0));
        let tz: Tz = "America/New_York".parse().unwrap();
        let view = EventView::localized(&event, &tz);

        assert_eq!(
            view.start.date_time.as_deref(),
            Some("2025-10-20T10:00:00-04:00")
        );
        assert_eq!(view.start.time_zone.as_deref(), Some("America/New_York"));
        assert!(view.start.date.is_none());
    }

    #[test]
    fn event_view_keeps_all_day_dates() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 20).unwrap();
        let event = CalendarEvent::new(
            "e1",
            "Offsite",
            EventTime::from_date(date),
            EventTime::from_date(date.succ_opt().unwrap()),
        );
        let tz: Tz = "Europe/Paris".parse().unwrap();
        let view = EventView::localized(&event, &tz);

        assert_eq!(view.start.date, Some(date));
        assert!(view.start.date_time.is_none());
    }

    #[test]
    fn event_id_plain() {
        let id = EventId::parse("abc123def");
        assert_eq!(id.parent, "abc123def");
        assert!(!id.is_instance());
    }

    #[test]
    fn event_id_instance_suffix() {
        let id = EventId::parse("abc123_20251020T100000Z");
        assert_eq!(id.parent, "abc123");
        assert!(id.is_instance());
        assert_eq!(
            id.instance.unwrap(),
            NaiveDate::from_ymd_opt(2025, 10, 20)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn event_id_underscore_without_timestamp() {
        // Underscores in ids are legal; only a valid timestamp suffix makes
        // an instance id.
        let id = EventId::parse("team_sync_weekly");
        assert_eq!(id.parent, "team_sync_weekly");
        assert!(!id.is_instance());
    }

    #[test]
    fn attendee_serde_shape() {
        let attendee = Attendee {
            email: "a@x.com".to_string(),
            display_name: None,
            response_status: ResponseStatus::Accepted,
            comment: Some("see you there".to_string()),
            organizer: false,
            is_self: true,
        };
        let json = serde_json::to_string(&attendee).unwrap();
        assert!(json.contains("\"accepted\""));
        assert!(json.contains("see you there"));

        let parsed: Attendee = serde_json::from_str(&json).unwrap();
        assert_eq!(attendee, parsed);
    }
}
