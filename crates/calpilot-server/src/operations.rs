//! The calendar event operations.
//!
//! Every operation shares the same pipeline: validate input shape, resolve
//! an authenticated calendar client (which may synchronously refresh the
//! stored token), perform one remote call sequence, and format the outcome
//! into the uniform response envelope. Operations hold no state between
//! invocations.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use serde_json::json;
use tracing::{error, info, warn};

use calpilot_core::event::{Attendee, CalendarEvent, EventId, EventView, RsvpStatus};
use calpilot_core::time::{TimeWindow, parse_datetime};
use calpilot_protocol::{
    AvailabilityData, DeleteData, Envelope, EventData, EventListData, InstanceListData, RsvpData,
    TimezoneData, UpdateData, UpdateScope,
};
use calpilot_providers::{
    CalendarApi, EventDraft, EventPatch, GoogleCalendarClient, ProviderError, ProviderErrorCode,
    TokenManager, UserCredential,
};

/// Builds a calendar API client around a freshly validated access token.
pub trait CalendarApiFactory: Send + Sync {
    /// Wraps the token into a client for one invocation.
    fn for_token(&self, access_token: &str) -> Arc<dyn CalendarApi>;
}

/// Factory producing [`GoogleCalendarClient`] instances.
#[derive(Debug)]
pub struct GoogleApiFactory {
    timeout: Duration,
    base_url: Option<String>,
}

impl GoogleApiFactory {
    /// Creates a factory with the given HTTP timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            base_url: None,
        }
    }

    /// Overrides the API base URL for every built client.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

impl CalendarApiFactory for GoogleApiFactory {
    fn for_token(&self, access_token: &str) -> Arc<dyn CalendarApi> {
        let mut client = GoogleCalendarClient::new(access_token, self.timeout);
        if let Some(ref base_url) = self.base_url {
            client = client.with_base_url(base_url.as_str());
        }
        Arc::new(client)
    }
}

/// Stateless calendar operations over an authenticated client.
pub struct EventOperations {
    auth: TokenManager,
    factory: Arc<dyn CalendarApiFactory>,
    lookahead_days: i64,
}

impl EventOperations {
    /// Creates the operation set with the default two-week lookahead.
    pub fn new(auth: TokenManager, factory: Arc<dyn CalendarApiFactory>) -> Self {
        Self {
            auth,
            factory,
            lookahead_days: calpilot_core::time::DEFAULT_LOOKAHEAD_DAYS,
        }
    }

    /// Overrides the event-query lookahead.
    pub fn with_lookahead_days(mut self, days: i64) -> Self {
        self.lookahead_days = days;
        self
    }

    /// Resolves an authenticated calendar client for the user.
    ///
    /// Delegates authorization to the token lifecycle; its failures pass
    /// through unchanged.
    async fn calendar_service(
        &self,
        email: &str,
    ) -> Result<(Arc<dyn CalendarApi>, UserCredential), ProviderError> {
        let (access_token, credential) = self.auth.get_access_token(email).await?;
        Ok((self.factory.for_token(&access_token), credential))
    }

    /// Lists events on the primary calendar for the lookahead window,
    /// rendered in the calendar's timezone.
    pub async fn list_events(&self, email: &str) -> Envelope {
        let (api, _) = match self.calendar_service(email).await {
            Ok(service) => service,
            Err(e) => return failure(e),
        };

        let timezone = match api.calendar_info().await {
            Ok(meta) => meta.time_zone.unwrap_or_else(|| "UTC".to_string()),
            Err(e) => {
                warn!(error = %e, "could not fetch calendar timezone, defaulting to UTC");
                "UTC".to_string()
            }
        };
        let tz = parse_timezone(&timezone);

        let window = TimeWindow::lookahead(Utc::now(), self.lookahead_days);
        let events = match api.list_events(window, true).await {
            Ok(events) => events,
            Err(e) => return failure(e),
        };

        let views: Vec<EventView> = events
            .iter()
            .map(|event| EventView::localized(event, &tz))
            .collect();

        info!(email, count = views.len(), "fetched events");
        Envelope::ok(
            200,
            EventListData {
                count: views.len(),
                events: views,
                timezone,
                time_range: window,
            },
        )
    }

    /// Lists instances of a recurring event for the lookahead window.
    pub async fn list_instances(&self, email: &str, event_id: &str) -> Envelope {
        let (api, _) = match self.calendar_service(email).await {
            Ok(service) => service,
            Err(e) => return failure(e),
        };

        let window = TimeWindow::lookahead(Utc::now(), self.lookahead_days);
        let instances = match api.list_instances(event_id, window).await {
            Ok(instances) => instances,
            Err(e) => return failure(e),
        };

        let views: Vec<EventView> = instances
            .iter()
            .map(|event| EventView::localized(event, &chrono_tz::UTC))
            .collect();

        info!(email, event_id, count = views.len(), "fetched instances");
        Envelope::ok(
            200,
            InstanceListData {
                count: views.len(),
                instances: views,
                parent_event_id: event_id.to_string(),
                time_range: window,
            },
        )
    }

    /// Creates an event after checking the candidate slot for overlap with
    /// existing events.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_event(
        &self,
        email: &str,
        event_name: &str,
        start_datetime: &str,
        end_datetime: &str,
        guest_emails: &[String],
        description: Option<&str>,
    ) -> Envelope {
        let Some(start) = parse_datetime(start_datetime) else {
            return Envelope::error(400, "Malformed ISO-8601 datetime in fields: start_datetime");
        };
        let Some(end) = parse_datetime(end_datetime) else {
            return Envelope::error(400, "Malformed ISO-8601 datetime in fields: end_datetime");
        };
        if end <= start {
            return Envelope::error(400, "end_datetime must be after start_datetime");
        }

        let (api, _) = match self.calendar_service(email).await {
            Ok(service) => service,
            Err(e) => return failure(e),
        };

        // Fetch everything that could intersect the candidate slot; the
        // overlap rule itself is half-open, so touching events survive.
        let window = TimeWindow::new(start, end);
        let existing = match api.list_events(window, true).await {
            Ok(events) => events,
            Err(e) => return failure(e),
        };

        if let Some(conflict) = existing.iter().find(|event| event.overlaps(start, end)) {
            warn!(email, conflict_id = %conflict.id, "time overlap detected");
            return Envelope::error(
                409,
                format!(
                    "Time overlap detected with existing event: '{}'. Please choose a different time slot.",
                    conflict.title()
                ),
            );
        }

        let draft = EventDraft {
            summary: event_name.to_string(),
            description: description.map(str::to_string),
            start,
            end,
            guest_emails: guest_emails.to_vec(),
        };

        let created = match api.insert_event(&draft).await {
            Ok(event) => event,
            Err(e) => return failure(e),
        };

        info!(email, event_id = %created.id, "created event");
        Envelope::created(EventData {
            event: EventView::localized(&created, &chrono_tz::UTC),
            message: "Event created successfully".to_string(),
        })
    }

    /// Patches an event with only the supplied fields.
    ///
    /// A composite id of the form `{parentId}_{YYYYMMDDTHHMMSSZ}` targets a
    /// single recurring instance; a bare id targets the whole series.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_event(
        &self,
        email: &str,
        event_id: &str,
        event_name: Option<&str>,
        description: Option<&str>,
        start_datetime: Option<&str>,
        end_datetime: Option<&str>,
        guest_emails: Option<&[String]>,
        recurrence: Option<&[String]>,
    ) -> Envelope {
        let start = match parse_optional_datetime(start_datetime) {
            Ok(start) => start,
            Err(envelope) => return envelope,
        };
        let end = match parse_optional_datetime(end_datetime) {
            Ok(end) => end,
            Err(envelope) => return envelope,
        };

        let patch = EventPatch {
            summary: event_name
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            description: description.map(str::to_string),
            start,
            end,
            attendees: guest_emails.map(|emails| {
                emails
                    .iter()
                    .map(|email| Attendee::new(email.as_str()))
                    .collect::<Vec<_>>()
            }),
            recurrence: recurrence.map(<[String]>::to_vec),
        };

        let (api, _) = match self.calendar_service(email).await {
            Ok(service) => service,
            Err(e) => return failure(e),
        };

        let id = EventId::parse(event_id);
        let scope = if id.is_instance() {
            UpdateScope::Instance
        } else {
            UpdateScope::Series
        };

        let updated = match api.patch_event(event_id, &patch).await {
            Ok(event) => event,
            Err(e) if e.code() == ProviderErrorCode::NotFound => {
                return Envelope::error_with(404, "Event not found", json!({"event_id": event_id}));
            }
            Err(e) => return failure(e),
        };

        info!(email, event_id, ?scope, "updated event");
        Envelope::ok(
            200,
            UpdateData {
                event: EventView::localized(&updated, &chrono_tz::UTC),
                scope,
                message: "Event updated successfully".to_string(),
            },
        )
    }

    /// Deletes an event; the provider notifies attendees.
    pub async fn delete_event(&self, email: &str, event_id: &str) -> Envelope {
        let (api, _) = match self.calendar_service(email).await {
            Ok(service) => service,
            Err(e) => return failure(e),
        };

        match api.delete_event(event_id).await {
            Ok(()) => {
                info!(email, event_id, "deleted event");
                Envelope::ok(
                    200,
                    DeleteData {
                        message: "Event deleted successfully".to_string(),
                        event_id: event_id.to_string(),
                    },
                )
            }
            Err(e) if e.code() == ProviderErrorCode::NotFound => Envelope::error_with(
                404,
                "Event not found or already deleted",
                json!({"event_id": event_id}),
            ),
            Err(e) => failure(e),
        }
    }

    /// Sets the acting user's RSVP on an event, adding them to the attendee
    /// list when absent.
    pub async fn rsvp(
        &self,
        email: &str,
        event_id: &str,
        rsvp_status: &str,
        note: Option<&str>,
    ) -> Envelope {
        let Ok(status) = rsvp_status.parse::<RsvpStatus>() else {
            return Envelope::error(
                400,
                format!(
                    "Invalid RSVP status. Must be one of: {}",
                    RsvpStatus::VALID_NAMES.join(", ")
                ),
            );
        };

        let (api, _) = match self.calendar_service(email).await {
            Ok(service) => service,
            Err(e) => return failure(e),
        };

        let event = match api.get_event(event_id).await {
            Ok(event) => event,
            Err(e) if e.code() == ProviderErrorCode::NotFound => {
                return Envelope::error_with(404, "Event not found", json!({"event_id": event_id}));
            }
            Err(e) => return failure(e),
        };

        let attendees = apply_rsvp(&event, email, status, note);
        let patch = EventPatch {
            attendees: Some(attendees),
            ..Default::default()
        };

        if let Err(e) = api.patch_event(event_id, &patch).await {
            return failure(e);
        }

        info!(email, event_id, status = %status, "rsvp recorded");
        Envelope::ok(
            200,
            RsvpData {
                message: format!("RSVP status set to {}", status),
                event_id: event_id.to_string(),
                rsvp_status: status.as_str().to_string(),
            },
        )
    }

    /// Queries busy intervals for a window, defaulting to
    /// `[now + 1h, now + 14d)`.
    pub async fn get_availability(
        &self,
        email: &str,
        start_time: Option<&str>,
        end_time: Option<&str>,
    ) -> Envelope {
        let window = match (non_empty(start_time), non_empty(end_time)) {
            (Some(start_str), Some(end_str)) => {
                let Some(start) = parse_datetime(start_str) else {
                    return Envelope::error(400, "Malformed ISO-8601 datetime in fields: start_time");
                };
                let Some(end) = parse_datetime(end_str) else {
                    return Envelope::error(400, "Malformed ISO-8601 datetime in fields: end_time");
                };
                if end <= start {
                    return Envelope::error(400, "end_time must be after start_time");
                }
                TimeWindow::new(start, end)
            }
            _ => TimeWindow::availability_default(Utc::now()),
        };

        let (api, _) = match self.calendar_service(email).await {
            Ok(service) => service,
            Err(e) => return failure(e),
        };

        let busy_slots = match api.free_busy(window).await {
            Ok(slots) => slots,
            Err(e) => return failure(e),
        };

        info!(email, busy_count = busy_slots.len(), "fetched availability");
        Envelope::ok(
            200,
            AvailabilityData {
                time_range: window,
                busy_count: busy_slots.len(),
                busy_slots,
            },
        )
    }

    /// Reads the primary calendar's declared timezone.
    pub async fn get_timezone(&self, email: &str) -> Envelope {
        let (api, _) = match self.calendar_service(email).await {
            Ok(service) => service,
            Err(e) => return failure(e),
        };

        let meta = match api.calendar_info().await {
            Ok(meta) => meta,
            Err(e) => return failure(e),
        };

        let timezone = meta.time_zone.unwrap_or_else(|| "UTC".to_string());
        info!(email, timezone = %timezone, "fetched timezone");
        Envelope::ok(
            200,
            TimezoneData {
                timezone,
                calendar_id: meta.id,
                calendar_summary: meta.summary,
            },
        )
    }
}

/// Formats a provider error into a response envelope.
///
/// Caller-addressable failures (4xx) carry their message through; anything
/// in the 500 class is logged with detail and surfaced as a generic,
/// non-sensitive message.
fn failure(err: ProviderError) -> Envelope {
    let status = err.http_status();
    if status >= 500 {
        error!(error = %err, "operation failed unexpectedly");
        Envelope::error(
            500,
            "An unexpected error occurred while talking to the calendar provider",
        )
    } else {
        Envelope::error(status, err.message())
    }
}

/// Parses a configured timezone name, defaulting to UTC on nonsense.
fn parse_timezone(name: &str) -> Tz {
    name.parse().unwrap_or_else(|_| {
        warn!(timezone = name, "unknown calendar timezone, defaulting to UTC");
        chrono_tz::UTC
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn parse_optional_datetime(value: Option<&str>) -> Result<Option<chrono::DateTime<Utc>>, Envelope> {
    match non_empty(value) {
        None => Ok(None),
        Some(text) => parse_datetime(text).map(Some).ok_or_else(|| {
            Envelope::error(400, "Malformed ISO-8601 datetime in optional fields")
        }),
    }
}

/// Returns the event's attendee list with the acting user's response set,
/// adding them when they are not yet on the list.
fn apply_rsvp(
    event: &CalendarEvent,
    email: &str,
    status: RsvpStatus,
    note: Option<&str>,
) -> Vec<Attendee> {
    let mut attendees = event.attendees.clone();

    if let Some(attendee) = attendees.iter_mut().find(|a| a.email == email) {
        attendee.response_status = status.as_response_status();
        if let Some(note) = note {
            attendee.comment = Some(note.to_string());
        }
    } else {
        let mut attendee = Attendee::new(email);
        attendee.response_status = status.as_response_status();
        attendee.comment = note.map(str::to_string);
        attendees.push(attendee);
    }

    attendees
}

#[cfg(test)]
mod tests {
    use super::*;
    use calpilot_core::event::ResponseStatus;
    use calpilot_core::time::EventTime;
    use chrono::TimeZone;

    fn sample_event(attendees: Vec<Attendee>) -> CalendarEvent {
        let start = Utc.with_ymd_and_hms(2025, 10, 20, 10, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 10, 20, 11, 0, 0).unwrap();
        let mut event = CalendarEvent::new(
            "e1",
            "Sync",
            EventTime::from_utc(start),
            EventTime::from_utc(end),
        );
        event.attendees = attendees;
        event
    }

    #[test]
    fn apply_rsvp_updates_existing_attendee() {
        let mut existing = Attendee::new("a@x.com");
        existing.response_status = ResponseStatus::NeedsAction;
        let event = sample_event(vec![existing, Attendee::new("b@x.com")]);

        let attendees = apply_rsvp(&event, "a@x.com", RsvpStatus::Declined, Some("conflict"));
        assert_eq!(attendees.len(), 2);
        assert_eq!(attendees[0].response_status, ResponseStatus::Declined);
        assert_eq!(attendees[0].comment.as_deref(), Some("conflict"));
        assert_eq!(attendees[1].response_status, ResponseStatus::NeedsAction);
    }

    #[test]
    fn apply_rsvp_adds_missing_attendee() {
        let event = sample_event(vec![Attendee::new("b@x.com")]);

        let attendees = apply_rsvp(&event, "a@x.com", RsvpStatus::Accepted, None);
        assert_eq!(attendees.len(), 2);
        assert_eq!(attendees[1].email, "a@x.com");
        assert_eq!(attendees[1].response_status, ResponseStatus::Accepted);
        assert!(attendees[1].comment.is_none());
    }

    #[test]
    fn parse_timezone_defaults_to_utc() {
        assert_eq!(parse_timezone("Europe/Paris"), chrono_tz::Europe::Paris);
        assert_eq!(parse_timezone("Atlantis/Lost"), chrono_tz::UTC);
    }

    #[test]
    fn failure_hides_internal_detail() {
        let envelope = failure(ProviderError::server("stack trace here"));
        assert_eq!(envelope.status_code(), 500);
        assert!(!envelope.error_message().unwrap().contains("stack trace"));

        let envelope = failure(ProviderError::authorization("no grant"));
        assert_eq!(envelope.status_code(), 403);
        assert_eq!(envelope.error_message(), Some("no grant"));
    }
}
