//! Google Calendar API client.
//!
//! This module provides the remote calendar surface: a dyn-safe
//! [`CalendarApi`] trait consumed by the event operations, and its HTTP
//! implementation [`GoogleCalendarClient`] against the Calendar API v3.
//!
//! The client is built per invocation around an already-valid access token
//! and discarded afterwards; it holds no cross-invocation state.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use calpilot_core::event::{Attendee, CalendarEvent, ResponseStatus};
use calpilot_core::time::{EventTime, TimeWindow};

use crate::BoxFuture;
use crate::error::{ProviderError, ProviderResult};

/// Base URL for Google Calendar API v3.
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// The default calendar container, referenced by constant identifier.
pub const PRIMARY_CALENDAR: &str = "primary";

/// A new event to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    /// Event title.
    pub summary: String,
    /// Optional description.
    pub description: Option<String>,
    /// Start instant (sent as UTC).
    pub start: DateTime<Utc>,
    /// End instant (sent as UTC).
    pub end: DateTime<Utc>,
    /// Guest email addresses to invite.
    pub guest_emails: Vec<String>,
}

/// A partial event update; only supplied fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub attendees: Option<Vec<Attendee>>,
    pub recurrence: Option<Vec<String>>,
}

/// Declared settings of a calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarMeta {
    /// The calendar identifier.
    pub id: String,
    /// The calendar summary (name).
    pub summary: Option<String>,
    /// The calendar's IANA timezone.
    pub time_zone: Option<String>,
}

/// The remote calendar surface used by event operations.
///
/// All mutating calls request attendee notifications from the provider;
/// notification delivery itself is the provider's side effect.
pub trait CalendarApi: Send + Sync {
    /// Lists events intersecting the window, ascending by start time.
    fn list_events(
        &self,
        window: TimeWindow,
        expand_recurring: bool,
    ) -> BoxFuture<'_, ProviderResult<Vec<CalendarEvent>>>;

    /// Lists instances of a recurring event within the window.
    fn list_instances<'a>(
        &'a self,
        event_id: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>>;

    /// Fetches a single event by id.
    fn get_event<'a>(&'a self, event_id: &'a str) -> BoxFuture<'a, ProviderResult<CalendarEvent>>;

    /// Inserts a new event.
    fn insert_event<'a>(
        &'a self,
        draft: &'a EventDraft,
    ) -> BoxFuture<'a, ProviderResult<CalendarEvent>>;

    /// Patches an event with only the supplied fields.
    fn patch_event<'a>(
        &'a self,
        event_id: &'a str,
        patch: &'a EventPatch,
    ) -> BoxFuture<'a, ProviderResult<CalendarEvent>>;

    /// Deletes an event.
    fn delete_event<'a>(&'a self, event_id: &'a str) -> BoxFuture<'a, ProviderResult<()>>;

    /// Queries opaque busy intervals for the window.
    fn free_busy(&self, window: TimeWindow) -> BoxFuture<'_, ProviderResult<Vec<TimeWindow>>>;

    /// Reads the calendar's declared settings.
    fn calendar_info(&self) -> BoxFuture<'_, ProviderResult<CalendarMeta>>;
}

/// HTTP client for the Google Calendar API.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
    base_url: String,
    calendar_id: String,
}

impl GoogleCalendarClient {
    /// Creates a new client around a valid access token.
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");

        Self {
            http_client,
            access_token: access_token.into(),
            base_url: CALENDAR_API_BASE.to_string(),
            calendar_id: PRIMARY_CALENDAR.to_string(),
        }
    }

    /// Overrides the API base URL (self-hosted gateways, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Targets a calendar other than the primary one.
    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = calendar_id.into();
        self
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(&self.calendar_id)
        )
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), urlencoding::encode(event_id))
    }

    /// Sends a request, maps transport failures, and classifies non-success
    /// statuses into the provider error taxonomy.
    async fn send(&self, request: reqwest::RequestBuilder) -> ProviderResult<String> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::network("request timeout")
                } else if e.is_connect() {
                    ProviderError::network(format!("connection failed: {}", e))
                } else {
                    ProviderError::network(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(classify_status(status, &body))
        }
    }

    async fn list_events_impl(
        &self,
        window: TimeWindow,
        expand_recurring: bool,
    ) -> ProviderResult<Vec<CalendarEvent>> {
        let mut all_events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http_client.get(self.events_url()).query(&[
                ("timeMin", window.start.to_rfc3339()),
                ("timeMax", window.end.to_rfc3339()),
                ("singleEvents", expand_recurring.to_string()),
            ]);

            // The API only accepts start-time ordering with expansion on
            if expand_recurring {
                request = request.query(&[("orderBy", "startTime")]);
            }

            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let body = self.send(request).await?;
            let page: ApiEventList = serde_json::from_str(&body).map_err(|e| {
                ProviderError::invalid_response(format!("failed to parse event list: {}", e))
            })?;

            collect_events(page.items, &mut all_events);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(
            count = all_events.len(),
            calendar = %self.calendar_id,
            "fetched events"
        );
        Ok(all_events)
    }

    async fn list_instances_impl(
        &self,
        event_id: &str,
        window: TimeWindow,
    ) -> ProviderResult<Vec<CalendarEvent>> {
        let url = format!("{}/instances", self.event_url(event_id));
        let mut all_instances = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http_client.get(&url).query(&[
                ("timeMin", window.start.to_rfc3339()),
                ("timeMax", window.end.to_rfc3339()),
            ]);

            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let body = self.send(request).await?;
            let page: ApiEventList = serde_json::from_str(&body).map_err(|e| {
                ProviderError::invalid_response(format!("failed to parse instance list: {}", e))
            })?;

            collect_events(page.items, &mut all_instances);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = all_instances.len(), event_id, "fetched instances");
        Ok(all_instances)
    }

    async fn get_event_impl(&self, event_id: &str) -> ProviderResult<CalendarEvent> {
        let request = self.http_client.get(self.event_url(event_id));
        let body = self.send(request).await?;
        let event: ApiEvent = serde_json::from_str(&body)
            .map_err(|e| ProviderError::invalid_response(format!("failed to parse event: {}", e)))?;
        convert_event(event)
    }

    async fn insert_event_impl(&self, draft: &EventDraft) -> ProviderResult<CalendarEvent> {
        let payload = ApiEventWrite::from_draft(draft);
        let request = self
            .http_client
            .post(self.events_url())
            .query(&[("sendUpdates", "all")])
            .json(&payload);

        let body = self.send(request).await?;
        let event: ApiEvent = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse created event: {}", e))
        })?;
        convert_event(event)
    }

    async fn patch_event_impl(
        &self,
        event_id: &str,
        patch: &EventPatch,
    ) -> ProviderResult<CalendarEvent> {
        let payload = ApiEventWrite::from_patch(patch);
        let request = self
            .http_client
            .patch(self.event_url(event_id))
            .query(&[("sendUpdates", "all")])
            .json(&payload);

        let body = self.send(request).await?;
        let event: ApiEvent = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse updated event: {}", e))
        })?;
        convert_event(event)
    }

    async fn delete_event_impl(&self, event_id: &str) -> ProviderResult<()> {
        let request = self
            .http_client
            .delete(self.event_url(event_id))
            .query(&[("sendUpdates", "all")]);
        self.send(request).await?;
        Ok(())
    }

    async fn free_busy_impl(&self, window: TimeWindow) -> ProviderResult<Vec<TimeWindow>> {
        let url = format!("{}/freeBusy", self.base_url);
        let query = ApiFreeBusyQuery {
            time_min: window.start.to_rfc3339(),
            time_max: window.end.to_rfc3339(),
            items: vec![ApiFreeBusyItem {
                id: self.calendar_id.clone(),
            }],
        };

        let request = self.http_client.post(&url).json(&query);
        let body = self.send(request).await?;
        let response: ApiFreeBusyResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse free/busy response: {}", e))
        })?;

        let busy = response
            .calendars
            .get(&self.calendar_id)
            .map(|c| c.busy.as_slice())
            .unwrap_or_default();

        let mut slots = Vec::with_capacity(busy.len());
        for interval in busy {
            let start = DateTime::parse_from_rfc3339(&interval.start).map_err(|e| {
                ProviderError::invalid_response(format!("bad busy interval start: {}", e))
            })?;
            let end = DateTime::parse_from_rfc3339(&interval.end).map_err(|e| {
                ProviderError::invalid_response(format!("bad busy interval end: {}", e))
            })?;
            slots.push(TimeWindow {
                start: start.with_timezone(&Utc),
                end: end.with_timezone(&Utc),
            });
        }
        Ok(slots)
    }

    async fn calendar_info_impl(&self) -> ProviderResult<CalendarMeta> {
        let url = format!(
            "{}/calendars/{}",
            self.base_url,
            urlencoding::encode(&self.calendar_id)
        );
        let request = self.http_client.get(&url);
        let body = self.send(request).await?;
        let calendar: ApiCalendar = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse calendar: {}", e))
        })?;

        Ok(CalendarMeta {
            id: calendar.id,
            summary: calendar.summary,
            time_zone: calendar.time_zone,
        })
    }
}

impl CalendarApi for GoogleCalendarClient {
    fn list_events(
        &self,
        window: TimeWindow,
        expand_recurring: bool,
    ) -> BoxFuture<'_, ProviderResult<Vec<CalendarEvent>>> {
        Box::pin(self.list_events_impl(window, expand_recurring))
    }

    fn list_instances<'a>(
        &'a self,
        event_id: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>> {
        Box::pin(self.list_instances_impl(event_id, window))
    }

    fn get_event<'a>(&'a self, event_id: &'a str) -> BoxFuture<'a, ProviderResult<CalendarEvent>> {
        Box::pin(self.get_event_impl(event_id))
    }

    fn insert_event<'a>(
        &'a self,
        draft: &'a EventDraft,
    ) -> BoxFuture<'a, ProviderResult<CalendarEvent>> {
        Box::pin(self.insert_event_impl(draft))
    }

    fn patch_event<'a>(
        &'a self,
        event_id: &'a str,
        patch: &'a EventPatch,
    ) -> BoxFuture<'a, ProviderResult<CalendarEvent>> {
        Box::pin(self.patch_event_impl(event_id, patch))
    }

    fn delete_event<'a>(&'a self, event_id: &'a str) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(self.delete_event_impl(event_id))
    }

    fn free_busy(&self, window: TimeWindow) -> BoxFuture<'_, ProviderResult<Vec<TimeWindow>>> {
        Box::pin(self.free_busy_impl(window))
    }

    fn calendar_info(&self) -> BoxFuture<'_, ProviderResult<CalendarMeta>> {
        Box::pin(self.calendar_info_impl())
    }
}

/// Classifies a non-success HTTP status into the error taxonomy.
fn classify_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
    use reqwest::StatusCode;

    match status {
        StatusCode::UNAUTHORIZED => ProviderError::authentication("access token expired or invalid"),
        StatusCode::FORBIDDEN => ProviderError::authorization("access denied to calendar"),
        // Gone covers already-deleted events
        StatusCode::NOT_FOUND | StatusCode::GONE => {
            ProviderError::not_found("calendar resource not found")
        }
        StatusCode::BAD_REQUEST => {
            ProviderError::bad_request(format!("calendar API rejected the request: {}", body))
        }
        StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited("rate limit exceeded"),
        s if s.is_server_error() => ProviderError::server(format!("API error ({}): {}", s, body)),
        s => ProviderError::server(format!("unexpected API status ({}): {}", s, body)),
    }
}

/// Converts a page of API events, skipping cancelled and unparseable items.
fn collect_events(items: Vec<ApiEvent>, out: &mut Vec<CalendarEvent>) {
    for item in items {
        if item.status.as_deref() == Some("cancelled") {
            continue;
        }
        match convert_event(item) {
            Ok(event) => out.push(event),
            Err(e) => warn!(error = %e, "skipping unparseable event"),
        }
    }
}

/// Converts an API event into the core event model.
fn convert_event(event: ApiEvent) -> ProviderResult<CalendarEvent> {
    let id = event
        .id
        .ok_or_else(|| ProviderError::invalid_response("event without id"))?;

    let start = convert_event_time(&event.start)
        .ok_or_else(|| ProviderError::invalid_response(format!("event {} has no start time", id)))?;
    let end = convert_event_time(&event.end)
        .ok_or_else(|| ProviderError::invalid_response(format!("event {} has no end time", id)))?;

    let attendees = event
        .attendees
        .unwrap_or_default()
        .into_iter()
        .filter_map(convert_attendee)
        .collect();

    Ok(CalendarEvent {
        id,
        summary: event.summary.unwrap_or_default(),
        description: event.description,
        start,
        end,
        status: event.status,
        attendees,
        recurrence: event.recurrence.unwrap_or_default(),
        recurring_event_id: event.recurring_event_id,
        location: event.location,
        html_link: event.html_link,
        created: parse_stamp(event.created.as_deref()),
        updated: parse_stamp(event.updated.as_deref()),
    })
}

fn convert_event_time(time: &ApiEventTime) -> Option<EventTime> {
    if let Some(ref dt) = time.date_time {
        let parsed = DateTime::parse_from_rfc3339(dt)
            .map_err(|e| warn!("failed to parse event time: {}", e))
            .ok()?;
        return Some(EventTime::DateTime(parsed.with_timezone(&Utc)));
    }
    if let Some(ref date) = time.date {
        let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| warn!("failed to parse event date: {}", e))
            .ok()?;
        return Some(EventTime::AllDay(parsed));
    }
    None
}

fn convert_attendee(attendee: ApiAttendee) -> Option<Attendee> {
    let email = attendee.email?;
    Some(Attendee {
        email,
        display_name: attendee.display_name,
        response_status: parse_response_status(attendee.response_status.as_deref()),
        comment: attendee.comment,
        organizer: attendee.organizer.unwrap_or(false),
        is_self: attendee.is_self.unwrap_or(false),
    })
}

fn parse_response_status(status: Option<&str>) -> ResponseStatus {
    match status {
        Some("accepted") => ResponseStatus::Accepted,
        Some("declined") => ResponseStatus::Declined,
        Some("tentative") => ResponseStatus::Tentative,
        _ => ResponseStatus::NeedsAction,
    }
}

fn response_status_str(status: ResponseStatus) -> &'static str {
    match status {
        ResponseStatus::Accepted => "accepted",
        ResponseStatus::Declined => "declined",
        ResponseStatus::Tentative => "tentative",
        ResponseStatus::NeedsAction => "needsAction",
    }
}

fn parse_stamp(stamp: Option<&str>) -> Option<DateTime<Utc>> {
    stamp
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn attendee_to_api(attendee: &Attendee) -> ApiAttendee {
    ApiAttendee {
        email: Some(attendee.email.clone()),
        display_name: attendee.display_name.clone(),
        is_self: None,
        organizer: None,
        response_status: Some(response_status_str(attendee.response_status).to_string()),
        comment: attendee.comment.clone(),
    }
}

fn utc_stamp(dt: DateTime<Utc>) -> ApiEventTimeWrite {
    ApiEventTimeWrite {
        date_time: dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        time_zone: "UTC".to_string(),
    }
}

/// Response from the events list and instances endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventList {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

/// A single event from the API.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: ApiEventTime,
    end: ApiEventTime,
    html_link: Option<String>,
    status: Option<String>,
    recurring_event_id: Option<String>,
    recurrence: Option<Vec<String>>,
    attendees: Option<Vec<ApiAttendee>>,
    created: Option<String>,
    updated: Option<String>,
}

/// Event time from the API.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}

/// Attendee shape shared between reads and writes.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAttendee {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    is_self: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    organizer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    response_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
}

/// Event write body; only supplied fields are serialized.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventWrite {
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<ApiEventTimeWrite>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<ApiEventTimeWrite>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attendees: Option<Vec<ApiAttendee>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recurrence: Option<Vec<String>>,
}

impl ApiEventWrite {
    fn from_draft(draft: &EventDraft) -> Self {
        let attendees = if draft.guest_emails.is_empty() {
            None
        } else {
            Some(
                draft
                    .guest_emails
                    .iter()
                    .map(|email| ApiAttendee {
                        email: Some(email.clone()),
                        display_name: None,
                        is_self: None,
                        organizer: None,
                        response_status: None,
                        comment: None,
                    })
                    .collect(),
            )
        };

        Self {
            summary: Some(draft.summary.clone()),
            description: draft.description.clone(),
            start: Some(utc_stamp(draft.start)),
            end: Some(utc_stamp(draft.end)),
            attendees,
            recurrence: None,
        }
    }

    fn from_patch(patch: &EventPatch) -> Self {
        Self {
            summary: patch.summary.clone(),
            description: patch.description.clone(),
            start: patch.start.map(utc_stamp),
            end: patch.end.map(utc_stamp),
            attendees: patch
                .attendees
                .as_ref()
                .map(|attendees| attendees.iter().map(attendee_to_api).collect()),
            recurrence: patch.recurrence.clone(),
        }
    }
}

/// Timed stamp for event writes; all writes use UTC.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTimeWrite {
    date_time: String,
    time_zone: String,
}

/// Free/busy query body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiFreeBusyQuery {
    time_min: String,
    time_max: String,
    items: Vec<ApiFreeBusyItem>,
}

#[derive(Debug, Serialize)]
struct ApiFreeBusyItem {
    id: String,
}

/// Free/busy response body.
#[derive(Debug, Deserialize)]
struct ApiFreeBusyResponse {
    #[serde(default)]
    calendars: HashMap<String, ApiFreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
struct ApiFreeBusyCalendar {
    #[serde(default)]
    busy: Vec<ApiBusyInterval>,
}

#[derive(Debug, Deserialize)]
struct ApiBusyInterval {
    start: String,
    end: String,
}

/// Calendar settings resource.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCalendar {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    time_zone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_event_list() {
        let json = r#"{
            "items": [
                {
                    "id": "event1",
                    "summary": "Planning Sync",
                    "start": {"dateTime": "2025-10-20T10:00:00Z"},
                    "end": {"dateTime": "2025-10-20T11:00:00Z"},
                    "status": "confirmed"
                }
            ]
        }"#;

        let page: ApiEventList = serde_json::from_str(json).unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.next_page_token.is_none());

        let mut events = Vec::new();
        collect_events(page.items, &mut events);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, "Planning Sync");
        assert_eq!(
            events[0].start.to_utc_datetime(),
            Utc.with_ymd_and_hms(2025, 10, 20, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn cancelled_events_are_skipped() {
        let json = r#"{
            "items": [
                {
                    "id": "event1",
                    "status": "cancelled",
                    "start": {"dateTime": "2025-10-20T10:00:00Z"},
                    "end": {"dateTime": "2025-10-20T11:00:00Z"}
                }
            ]
        }"#;

        let page: ApiEventList = serde_json::from_str(json).unwrap();
        let mut events = Vec::new();
        collect_events(page.items, &mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn parse_all_day_event() {
        let json = r#"{
            "id": "event1",
            "summary": "Offsite",
            "start": {"date": "2025-10-20"},
            "end": {"date": "2025-10-21"}
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();
        let converted = convert_event(event).unwrap();
        assert!(converted.start.is_all_day());
        assert_eq!(
            converted.start.date(),
            NaiveDate::from_ymd_opt(2025, 10, 20).unwrap()
        );
    }

    #[test]
    fn event_without_times_is_rejected() {
        let json = r#"{"id": "event1", "summary": "Broken"}"#;
        let event: ApiEvent = serde_json::from_str(json).unwrap();
        assert!(convert_event(event).is_err());
    }

    #[test]
    fn parse_attendees_with_comment() {
        let json = r#"{
            "id": "event1",
            "start": {"dateTime": "2025-10-20T10:00:00Z"},
            "end": {"dateTime": "2025-10-20T11:00:00Z"},
            "attendees": [
                {"email": "a@x.com", "responseStatus": "accepted", "comment": "joining late", "self": true},
                {"email": "b@x.com", "responseStatus": "needsAction"},
                {"displayName": "No Email Room"}
            ]
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();
        let converted = convert_event(event).unwrap();
        // Entries without an email are dropped
        assert_eq!(converted.attendees.len(), 2);
        assert_eq!(converted.attendees[0].response_status, ResponseStatus::Accepted);
        assert_eq!(converted.attendees[0].comment.as_deref(), Some("joining late"));
        assert!(converted.attendees[0].is_self);
        assert_eq!(
            converted.attendees[1].response_status,
            ResponseStatus::NeedsAction
        );
    }

    #[test]
    fn draft_write_body_shape() {
        let draft = EventDraft {
            summary: "Sync".to_string(),
            description: Some("agenda".to_string()),
            start: Utc.with_ymd_and_hms(2025, 10, 20, 10, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 10, 20, 11, 0, 0).unwrap(),
            guest_emails: vec!["b@x.com".to_string()],
        };

        let body = serde_json::to_value(ApiEventWrite::from_draft(&draft)).unwrap();
        assert_eq!(body["summary"], "Sync");
        assert_eq!(body["start"]["dateTime"], "2025-10-20T10:00:00Z");
        assert_eq!(body["start"]["timeZone"], "UTC");
        assert_eq!(body["attendees"][0]["email"], "b@x.com");
        assert!(body["attendees"][0].get("responseStatus").is_none());
        assert!(body.get("recurrence").is_none());
    }

    #[test]
    fn patch_write_body_only_has_supplied_fields() {
        let patch = EventPatch {
            summary: Some("Renamed".to_string()),
            ..Default::default()
        };

        let body = serde_json::to_value(ApiEventWrite::from_patch(&patch)).unwrap();
        assert_eq!(body["summary"], "Renamed");
        assert!(body.get("description").is_none());
        assert!(body.get("start").is_none());
        assert!(body.get("end").is_none());
        assert!(body.get("attendees").is_none());
    }

    #[test]
    fn patch_write_body_serializes_attendee_responses() {
        let patch = EventPatch {
            attendees: Some(vec![Attendee {
                email: "a@x.com".to_string(),
                display_name: None,
                response_status: ResponseStatus::Declined,
                comment: Some("conflict".to_string()),
                organizer: false,
                is_self: false,
            }]),
            ..Default::default()
        };

        let body = serde_json::to_value(ApiEventWrite::from_patch(&patch)).unwrap();
        assert_eq!(body["attendees"][0]["responseStatus"], "declined");
        assert_eq!(body["attendees"][0]["comment"], "conflict");
    }

    #[test]
    fn parse_free_busy_response() {
        let json = r#"{
            "calendars": {
                "primary": {
                    "busy": [
                        {"start": "2025-10-20T10:00:00Z", "end": "2025-10-20T11:00:00Z"}
                    ]
                }
            }
        }"#;

        let response: ApiFreeBusyResponse = serde_json::from_str(json).unwrap();
        let busy = &response.calendars["primary"].busy;
        assert_eq!(busy.len(), 1);
        assert_eq!(busy[0].start, "2025-10-20T10:00:00Z");
    }

    #[test]
    fn parse_calendar_settings() {
        let json = r#"{"id": "primary", "summary": "a@x.com", "timeZone": "Europe/Paris"}"#;
        let calendar: ApiCalendar = serde_json::from_str(json).unwrap();
        assert_eq!(calendar.time_zone.as_deref(), Some("Europe/Paris"));
    }

    #[test]
    fn status_classification() {
        use reqwest::StatusCode;

        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED, "").http_status(),
            401
        );
        assert_eq!(classify_status(StatusCode::FORBIDDEN, "").http_status(), 403);
        assert_eq!(classify_status(StatusCode::NOT_FOUND, "").http_status(), 404);
        assert_eq!(classify_status(StatusCode::GONE, "").http_status(), 404);
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST, "").http_status(),
            400
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "").http_status(),
            500
        );
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, "").http_status(),
            500
        );
    }

    #[test]
    fn event_urls_are_escaped() {
        let client =
            GoogleCalendarClient::new("token", Duration::from_secs(5)).with_calendar_id("primary");
        assert_eq!(
            client.event_url("abc 123"),
            "https://www.googleapis.com/calendar/v3/calendars/primary/events/abc%20123"
        );
    }
}
