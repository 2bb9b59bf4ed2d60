//! Core types: events, time windows, tracing

pub mod event;
pub mod time;
pub mod tracing;

pub use event::{
    Attendee, CalendarEvent, EventId, EventView, LocalStamp, ResponseStatus, RsvpStatus,
};
pub use time::{EventTime, TimeWindow, parse_datetime};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
