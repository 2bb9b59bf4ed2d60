//! Credential records and the store abstraction.
//!
//! One [`UserCredential`] record exists per user email, created when the
//! user completes the OAuth grant (an external collaborator) and mutated
//! only by the token lifecycle on refresh. Records are never deleted here;
//! account removal is an external concern.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::BoxFuture;
use crate::error::{ProviderError, ProviderResult};

/// Stored OAuth state for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCredential {
    /// The user's email address (primary key).
    pub email: String,

    /// The current access token. Absent until the user grants access.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// The long-lived refresh token. Absent until the user grants access.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// When the access token expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_expires_at: Option<DateTime<Utc>>,

    /// Whether the user has completed the calendar-scope OAuth grant.
    #[serde(default)]
    pub calendar_access: bool,
}

impl UserCredential {
    /// Creates a credential record with both tokens and an expiry.
    pub fn new(
        email: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        token_expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            email: email.into(),
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
            token_expires_at: Some(token_expires_at),
            calendar_access: true,
        }
    }

    /// Returns `true` when the record carries both tokens and the grant.
    pub fn has_calendar_tokens(&self) -> bool {
        self.calendar_access && self.access_token.is_some() && self.refresh_token.is_some()
    }
}

/// Partial update applied to a credential record after a token refresh.
///
/// Only the token fields are touched; everything else in the record is left
/// as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenUpdate {
    /// The freshly issued access token.
    pub access_token: String,
    /// The new expiry for the access token.
    pub token_expires_at: DateTime<Utc>,
    /// A rotated refresh token, when the provider issued one.
    pub refresh_token: Option<String>,
}

/// Key-value access to credential records, keyed by user email.
pub trait CredentialStore: Send + Sync {
    /// Fetches the record for an email, or `None` when the user is unknown.
    fn get<'a>(&'a self, email: &'a str) -> BoxFuture<'a, ProviderResult<Option<UserCredential>>>;

    /// Applies a partial token update to an existing record.
    fn update_tokens<'a>(
        &'a self,
        email: &'a str,
        update: TokenUpdate,
    ) -> BoxFuture<'a, ProviderResult<()>>;
}

/// File-backed credential store.
///
/// Records are stored as one JSON object keyed by email. Writes go to a
/// temp file first and are renamed into place, with restrictive permissions
/// on Unix since the file holds token secrets.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    records: RwLock<HashMap<String, UserCredential>>,
}

impl FileCredentialStore {
    /// Opens a store at the given path, loading existing records.
    ///
    /// A missing file is an empty store, not an error.
    pub fn open(path: impl Into<PathBuf>) -> ProviderResult<Self> {
        let path = path.into();
        let records = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                ProviderError::configuration(format!("failed to read credential file: {}", e))
            })?;
            let records: HashMap<String, UserCredential> = serde_json::from_str(&content)
                .map_err(|e| {
                    ProviderError::configuration(format!("failed to parse credential file: {}", e))
                })?;
            info!(count = records.len(), "loaded credential records");
            records
        } else {
            debug!("no credential file at {:?}, starting empty", path);
            HashMap::new()
        };

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    /// Inserts or replaces a full record and persists the store.
    ///
    /// Used by the external grant flow when a user first authorizes.
    pub fn put(&self, credential: UserCredential) -> ProviderResult<()> {
        {
            let mut records = self.records.write().unwrap();
            records.insert(credential.email.clone(), credential);
        }
        self.save()
    }

    /// Returns the store path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> ProviderResult<()> {
        let content = {
            let records = self.records.read().unwrap();
            serde_json::to_string_pretty(&*records).map_err(|e| {
                ProviderError::internal(format!("failed to serialize credentials: {}", e))
            })?
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::configuration(format!(
                    "failed to create credential directory: {}",
                    e
                ))
            })?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &content).map_err(|e| {
            ProviderError::configuration(format!("failed to write credential file: {}", e))
        })?;
        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to rename credential file: {}", e))
        })?;

        // The file holds token secrets
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            let _ = fs::set_permissions(&self.path, perms);
        }

        debug!("saved credential records to {:?}", self.path);
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get<'a>(&'a self, email: &'a str) -> BoxFuture<'a, ProviderResult<Option<UserCredential>>> {
        Box::pin(async move {
            let records = self.records.read().unwrap();
            Ok(records.get(email).cloned())
        })
    }

    fn update_tokens<'a>(
        &'a self,
        email: &'a str,
        update: TokenUpdate,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            {
                let mut records = self.records.write().unwrap();
                let record = records.get_mut(email).ok_or_else(|| {
                    ProviderError::internal(format!("no credential record to update for {}", email))
                })?;
                record.access_token = Some(update.access_token);
                record.token_expires_at = Some(update.token_expires_at);
                if let Some(refresh_token) = update.refresh_token {
                    record.refresh_token = Some(refresh_token);
                }
            }
            self.save()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_credential(email: &str) -> UserCredential {
        UserCredential::new(email, "access-1", "refresh-1", Utc::now() + Duration::hours(1))
    }

    #[tokio::test]
    async fn open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::open(dir.path().join("creds.json")).unwrap();
        assert!(store.get("a@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_and_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        let store = FileCredentialStore::open(&path).unwrap();

        store.put(sample_credential("a@x.com")).unwrap();
        let record = store.get("a@x.com").await.unwrap().unwrap();
        assert_eq!(record.access_token.as_deref(), Some("access-1"));
        assert!(record.has_calendar_tokens());

        // A fresh store sees the persisted record
        let reopened = FileCredentialStore::open(&path).unwrap();
        let record = reopened.get("a@x.com").await.unwrap().unwrap();
        assert_eq!(record.refresh_token.as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn update_tokens_is_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        let store = FileCredentialStore::open(&path).unwrap();
        store.put(sample_credential("a@x.com")).unwrap();

        let new_expiry = Utc::now() + Duration::hours(2);
        store
            .update_tokens(
                "a@x.com",
                TokenUpdate {
                    access_token: "access-2".to_string(),
                    token_expires_at: new_expiry,
                    refresh_token: None,
                },
            )
            .await
            .unwrap();

        let record = store.get("a@x.com").await.unwrap().unwrap();
        assert_eq!(record.access_token.as_deref(), Some("access-2"));
        // Refresh token untouched when the provider did not rotate it
        assert_eq!(record.refresh_token.as_deref(), Some("refresh-1"));
        assert!(record.calendar_access);
    }

    #[tokio::test]
    async fn update_tokens_persists_rotated_refresh_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::open(dir.path().join("creds.json")).unwrap();
        store.put(sample_credential("a@x.com")).unwrap();

        store
            .update_tokens(
                "a@x.com",
                TokenUpdate {
                    access_token: "access-2".to_string(),
                    token_expires_at: Utc::now() + Duration::hours(1),
                    refresh_token: Some("refresh-2".to_string()),
                },
            )
            .await
            .unwrap();

        let record = store.get("a@x.com").await.unwrap().unwrap();
        assert_eq!(record.refresh_token.as_deref(), Some("refresh-2"));
    }

    #[tokio::test]
    async fn update_tokens_for_unknown_email_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::open(dir.path().join("creds.json")).unwrap();

        let result = store
            .update_tokens(
                "nobody@x.com",
                TokenUpdate {
                    access_token: "access".to_string(),
                    token_expires_at: Utc::now(),
                    refresh_token: None,
                },
            )
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn has_calendar_tokens_requires_grant_and_tokens() {
        let mut credential = sample_credential("a@x.com");
        assert!(credential.has_calendar_tokens());

        credential.calendar_access = false;
        assert!(!credential.has_calendar_tokens());

        let bare = UserCredential {
            email: "b@x.com".to_string(),
            access_token: None,
            refresh_token: None,
            token_expires_at: None,
            calendar_access: true,
        };
        assert!(!bare.has_calendar_tokens());
    }
}
