//! Token lifecycle management.
//!
//! [`TokenManager::get_access_token`] is the single authentication entry
//! point for all calendar operations: given an email it returns a
//! currently-valid access token, transparently refreshing and persisting
//! when the stored token is at or near expiry.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::oauth::TokenRefresher;
use crate::store::{CredentialStore, TokenUpdate, UserCredential};

/// Leeway before expiry at which a token is treated as expired, in seconds.
///
/// The buffer covers the gap between this function returning and the token
/// being used in the next remote call.
pub const DEFAULT_REFRESH_LEEWAY_SECS: i64 = 30;

/// Fallback token lifetime when the provider omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Manages the access-token lifecycle for all users.
///
/// Refresh is synchronous and at-most-once per invocation. Concurrent
/// invocations for the same email may both refresh; last writer wins on the
/// persisted token. If the provider rotates the refresh token, a losing
/// writer can persist a stale one, surfacing as a 401 on the next refresh
/// until the user re-authorizes. This is a known, accepted limitation.
pub struct TokenManager {
    store: Arc<dyn CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    leeway: Duration,
}

impl TokenManager {
    /// Creates a token manager with the default 30-second refresh leeway.
    pub fn new(store: Arc<dyn CredentialStore>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            store,
            refresher,
            leeway: Duration::seconds(DEFAULT_REFRESH_LEEWAY_SECS),
        }
    }

    /// Overrides the refresh leeway.
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Returns a currently-valid access token and the credential record.
    ///
    /// # Errors
    ///
    /// - `AuthorizationFailed` (403) when no credential record exists, the
    ///   tokens are missing, or calendar access has not been granted.
    /// - `AuthenticationFailed` (401) when a refresh attempt is rejected by
    ///   the provider; an unverified token is never returned.
    pub async fn get_access_token(
        &self,
        email: &str,
    ) -> ProviderResult<(String, UserCredential)> {
        let mut credential = self.store.get(email).await?.ok_or_else(|| {
            ProviderError::authorization(
                "User is not authorized for calendar access. Please grant calendar permissions.",
            )
        })?;

        if !credential.has_calendar_tokens() {
            warn!(email, "credential record without calendar grant");
            return Err(ProviderError::authorization(
                "User is not authorized for calendar access. Please grant calendar permissions.",
            ));
        }

        let access_token = credential.access_token.clone().unwrap_or_default();
        let refresh_token = credential.refresh_token.clone().unwrap_or_default();

        let now = Utc::now();
        if let Some(expires_at) = credential.token_expires_at
            && expires_at - now > self.leeway
        {
            debug!(email, "stored access token is still valid");
            return Ok((access_token, credential));
        }

        debug!(email, "access token at or near expiry, refreshing");
        let refreshed = self.refresher.refresh(&refresh_token).await.map_err(|e| {
            warn!(email, error = %e, "token refresh failed");
            ProviderError::authentication("Failed to refresh access token. Please re-authorize.")
        })?;

        let expires_at =
            now + Duration::seconds(refreshed.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS));
        let update = TokenUpdate {
            access_token: refreshed.access_token.clone(),
            token_expires_at: expires_at,
            refresh_token: refreshed.refresh_token.clone(),
        };

        // The refreshed token is valid even if the write fails; the next
        // invocation simply refreshes again.
        if let Err(e) = self.store.update_tokens(email, update).await {
            warn!(email, error = %e, "failed to persist refreshed token");
        }

        credential.access_token = Some(refreshed.access_token.clone());
        credential.token_expires_at = Some(expires_at);
        if let Some(rotated) = refreshed.refresh_token {
            credential.refresh_token = Some(rotated);
        }

        info!(email, "access token refreshed");
        Ok((refreshed.access_token, credential))
    }
}
