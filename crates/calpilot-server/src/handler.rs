//! Request dispatch.
//!
//! Routes incoming requests to the matching operation and guarantees that
//! every outcome, including boundary validation failures and unparseable
//! input, leaves as a well-formed response envelope.

use tracing::{debug, warn};

use calpilot_protocol::{Envelope, Request};

use crate::operations::EventOperations;

/// Dispatches requests to the event operations.
pub struct RequestHandler {
    ops: EventOperations,
}

impl RequestHandler {
    /// Creates a handler over the given operation set.
    pub fn new(ops: EventOperations) -> Self {
        Self { ops }
    }

    /// Handles one already-parsed request.
    ///
    /// Input-shape validation runs first; nothing touches the credential
    /// store or the network for an invalid request.
    pub async fn handle(&self, request: &Request) -> Envelope {
        let start = std::time::Instant::now();
        let op = request.op_name();

        let envelope = match request.validate() {
            Err(message) => Envelope::error(400, message),
            Ok(()) => self.dispatch(request).await,
        };

        debug!(
            op,
            status = envelope.status_code(),
            duration_ms = start.elapsed().as_millis() as u64,
            "request handled"
        );
        envelope
    }

    /// Parses and handles a raw JSON request.
    pub async fn handle_json(&self, raw: &str) -> Envelope {
        match Request::from_json(raw) {
            Ok(request) => self.handle(&request).await,
            Err(e) => {
                warn!(error = %e, "failed to parse request");
                Envelope::error(400, e.to_string())
            }
        }
    }

    async fn dispatch(&self, request: &Request) -> Envelope {
        match request {
            Request::ListEvents { email } => self.ops.list_events(email).await,
            Request::ListInstances { email, event_id } => {
                self.ops.list_instances(email, event_id).await
            }
            Request::CreateEvent {
                email,
                event_name,
                start_datetime,
                end_datetime,
                guest_emails,
                description,
            } => {
                self.ops
                    .create_event(
                        email,
                        event_name,
                        start_datetime,
                        end_datetime,
                        guest_emails,
                        description.as_deref(),
                    )
                    .await
            }
            Request::UpdateEvent {
                email,
                event_id,
                event_name,
                description,
                start_datetime,
                end_datetime,
                guest_emails,
                recurrence,
            } => {
                self.ops
                    .update_event(
                        email,
                        event_id,
                        event_name.as_deref(),
                        description.as_deref(),
                        start_datetime.as_deref(),
                        end_datetime.as_deref(),
                        guest_emails.as_deref(),
                        recurrence.as_deref(),
                    )
                    .await
            }
            Request::DeleteEvent { email, event_id } => {
                self.ops.delete_event(email, event_id).await
            }
            Request::Rsvp {
                email,
                event_id,
                rsvp_status,
                note,
            } => {
                self.ops
                    .rsvp(email, event_id, rsvp_status, note.as_deref())
                    .await
            }
            Request::GetAvailability {
                email,
                start_time,
                end_time,
            } => {
                self.ops
                    .get_availability(email, start_time.as_deref(), end_time.as_deref())
                    .await
            }
            Request::GetTimezone { email } => self.ops.get_timezone(email).await,
        }
    }
}
