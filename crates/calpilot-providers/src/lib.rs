//! Credential storage, OAuth token lifecycle, and the calendar API client.
//!
//! This crate provides the authenticated-access layer of calpilot:
//!
//! - [`CredentialStore`] - per-user credential records keyed by email
//! - [`TokenManager`] - returns a currently-valid access token, refreshing
//!   and persisting transparently when the stored one is at or near expiry
//! - [`CalendarApi`] - the remote calendar surface (list, mutate, free/busy,
//!   settings), implemented by [`GoogleCalendarClient`]
//! - [`ProviderError`] - the error taxonomy mapped onto response statuses
//!
//! # Architecture
//!
//! ```text
//!   operation entry point
//!            │
//!            ▼
//!     TokenManager ──── CredentialStore (get / partial update)
//!            │    └──── TokenRefresher (OAuth refresh grant)
//!            ▼
//!   GoogleCalendarClient ──── Calendar API v3
//! ```
//!
//! Every operation invocation resolves a token first (which may refresh and
//! persist synchronously), wraps it into a client, performs its remote
//! calls, and discards the client. Nothing is cached across invocations.

pub mod auth;
pub mod client;
pub mod error;
pub mod oauth;
pub mod store;

use std::future::Future;
use std::pin::Pin;

/// Boxed future type used by the dyn-safe provider traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub use auth::{DEFAULT_REFRESH_LEEWAY_SECS, TokenManager};
pub use client::{
    CalendarApi, CalendarMeta, EventDraft, EventPatch, GoogleCalendarClient, PRIMARY_CALENDAR,
};
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use oauth::{GOOGLE_TOKEN_URL, OAuthClient, OAuthCredentials, RefreshedToken, TokenRefresher};
pub use store::{CredentialStore, FileCredentialStore, TokenUpdate, UserCredential};
