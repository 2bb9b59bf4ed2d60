//! OAuth token refresh against the Google token endpoint.
//!
//! Only the refresh grant lives here. The interactive authorization flow
//! that mints the first refresh token is an external collaborator; this
//! module turns a stored refresh token into a fresh access token.

use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::BoxFuture;
use crate::error::{ProviderError, ProviderResult};

/// Google OAuth token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// OAuth 2.0 client credentials for the refresh grant.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID from the Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from the Google Cloud Console.
    pub client_secret: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Validates that the credentials are present.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// The outcome of a successful refresh call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    /// The freshly issued access token.
    pub access_token: String,
    /// Lifetime of the new token in seconds, when reported.
    pub expires_in: Option<i64>,
    /// A rotated refresh token, when the provider issued one.
    pub refresh_token: Option<String>,
}

/// Exchanges a refresh token for a fresh access token.
pub trait TokenRefresher: Send + Sync {
    /// Performs one refresh call against the token endpoint.
    fn refresh<'a>(&'a self, refresh_token: &'a str)
    -> BoxFuture<'a, ProviderResult<RefreshedToken>>;
}

/// OAuth client performing the refresh grant over HTTPS.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    token_url: String,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a new OAuth client with the given credentials.
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");

        Self {
            credentials,
            token_url: GOOGLE_TOKEN_URL.to_string(),
            http_client,
        }
    }

    /// Overrides the token endpoint (self-hosted gateways, tests).
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    async fn refresh_impl(&self, refresh_token: &str) -> ProviderResult<RefreshedToken> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                ProviderError::authentication(format!("token refresh request failed: {}", e))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::authentication(format!("failed to read refresh response: {}", e))
        })?;

        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "token refresh rejected ({}): {}",
                status, body
            )));
        }

        let token_response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::authentication(format!("invalid token response: {}", e))
        })?;

        info!("successfully refreshed access token");
        Ok(RefreshedToken {
            access_token: token_response.access_token,
            expires_in: token_response.expires_in,
            refresh_token: token_response.refresh_token,
        })
    }
}

impl TokenRefresher for OAuthClient {
    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, ProviderResult<RefreshedToken>> {
        Box::pin(self.refresh_impl(refresh_token))
    }
}

/// Response from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_validation() {
        assert!(OAuthCredentials::new("id", "secret").validate().is_ok());
        assert!(OAuthCredentials::new("", "secret").validate().is_err());
        assert!(OAuthCredentials::new("id", "").validate().is_err());
    }

    #[test]
    fn token_response_parsing() {
        let json = r#"{"access_token": "T2", "expires_in": 3600, "token_type": "Bearer"}"#;
        let parsed: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.access_token, "T2");
        assert_eq!(parsed.expires_in, Some(3600));
        assert!(parsed.refresh_token.is_none());
    }

    #[test]
    fn token_response_with_rotated_refresh_token() {
        let json = r#"{"access_token": "T2", "refresh_token": "R2"}"#;
        let parsed: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.refresh_token.as_deref(), Some("R2"));
        assert!(parsed.expires_in.is_none());
    }

    #[test]
    fn token_url_override() {
        let client = OAuthClient::new(
            OAuthCredentials::new("id", "secret"),
            Duration::from_secs(5),
        )
        .with_token_url("http://127.0.0.1:9999/token");
        assert_eq!(client.token_url, "http://127.0.0.1:9999/token");
    }
}
