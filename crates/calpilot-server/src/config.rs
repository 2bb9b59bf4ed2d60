//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use calpilot_core::time::DEFAULT_LOOKAHEAD_DAYS;
use calpilot_providers::DEFAULT_REFRESH_LEEWAY_SECS;

use crate::error::{ServerError, ServerResult};

/// Configuration for one server invocation.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the credential store file.
    pub credentials_path: PathBuf,

    /// OAuth client ID for token refresh.
    pub client_id: String,

    /// OAuth client secret for token refresh.
    pub client_secret: String,

    /// Override for the OAuth token endpoint.
    pub token_url: Option<String>,

    /// Override for the calendar API base URL.
    pub api_base_url: Option<String>,

    /// Event-query lookahead in days.
    pub lookahead_days: i64,

    /// Seconds before expiry at which tokens are refreshed.
    pub refresh_leeway_secs: i64,

    /// HTTP timeout for provider calls.
    pub http_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            client_id: String::new(),
            client_secret: String::new(),
            token_url: None,
            api_base_url: None,
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
            refresh_leeway_secs: DEFAULT_REFRESH_LEEWAY_SECS,
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from the environment.
    ///
    /// Reads `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET` and the optional
    /// `CALPILOT_*` overrides.
    pub fn from_env() -> ServerResult<Self> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("CALPILOT_CREDENTIALS_PATH") {
            config.credentials_path = PathBuf::from(path);
        }
        if let Ok(client_id) = std::env::var("GOOGLE_CLIENT_ID") {
            config.client_id = client_id;
        }
        if let Ok(client_secret) = std::env::var("GOOGLE_CLIENT_SECRET") {
            config.client_secret = client_secret;
        }
        if let Ok(url) = std::env::var("CALPILOT_TOKEN_URL") {
            config.token_url = Some(url);
        }
        if let Ok(url) = std::env::var("CALPILOT_API_BASE_URL") {
            config.api_base_url = Some(url);
        }
        if let Ok(days) = std::env::var("CALPILOT_LOOKAHEAD_DAYS") {
            config.lookahead_days = days.parse().map_err(|_| {
                ServerError::config(format!("CALPILOT_LOOKAHEAD_DAYS is not a number: {}", days))
            })?;
        }
        if let Ok(secs) = std::env::var("CALPILOT_REFRESH_LEEWAY_SECS") {
            config.refresh_leeway_secs = secs.parse().map_err(|_| {
                ServerError::config(format!(
                    "CALPILOT_REFRESH_LEEWAY_SECS is not a number: {}",
                    secs
                ))
            })?;
        }
        if let Ok(secs) = std::env::var("CALPILOT_HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                ServerError::config(format!("CALPILOT_HTTP_TIMEOUT_SECS is not a number: {}", secs))
            })?;
            config.http_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Builder: set the credential store path.
    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = path.into();
        self
    }

    /// Builder: set the OAuth client credentials.
    pub fn with_oauth_client(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = client_id.into();
        self.client_secret = client_secret.into();
        self
    }

    /// Builder: set the lookahead in days.
    pub fn with_lookahead_days(mut self, days: i64) -> Self {
        self.lookahead_days = days;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ServerResult<()> {
        if self.client_id.is_empty() {
            return Err(ServerError::config("GOOGLE_CLIENT_ID is required"));
        }
        if self.client_secret.is_empty() {
            return Err(ServerError::config("GOOGLE_CLIENT_SECRET is required"));
        }
        if self.lookahead_days <= 0 {
            return Err(ServerError::config("lookahead_days must be positive"));
        }
        Ok(())
    }
}

/// Returns the default credential store path.
///
/// Uses `~/.local/share/calpilot/credentials.json`, falling back to the
/// working directory when no home directory is known.
pub fn default_credentials_path() -> PathBuf {
    std::env::var("HOME")
        .map(|home| PathBuf::from(home).join(".local").join("share"))
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("calpilot")
        .join("credentials.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.lookahead_days, 14);
        assert_eq!(config.refresh_leeway_secs, 30);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert!(config.token_url.is_none());
    }

    #[test]
    fn validation_requires_oauth_client() {
        let config = ServerConfig::default();
        assert!(config.validate().is_err());

        let config = ServerConfig::default().with_oauth_client("id", "secret");
        assert!(config.validate().is_ok());

        let config = ServerConfig::default()
            .with_oauth_client("id", "secret")
            .with_lookahead_days(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_methods() {
        let config = ServerConfig::default()
            .with_credentials_path("/tmp/creds.json")
            .with_oauth_client("id", "secret")
            .with_lookahead_days(7);
        assert_eq!(config.credentials_path, PathBuf::from("/tmp/creds.json"));
        assert_eq!(config.lookahead_days, 7);
    }

    #[test]
    fn default_credentials_path_shape() {
        let path = default_credentials_path();
        assert!(path.to_string_lossy().contains("calpilot"));
        assert!(path.to_string_lossy().ends_with("credentials.json"));
    }
}
