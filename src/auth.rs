use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::UserProfile;

pub const GOOGLE_AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKENINFO_ENDPOINT: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Account record in the relay's users file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAccount {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

impl StoredAccount {
    /// Public view without the password
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: Some(self.id.clone()),
            username: self.username.clone(),
            email: None,
            created_at: self.created_at,
            provider: None,
        }
    }
}

/// Outcome of a sign-up; only a fresh account carries its stored record
#[derive(Debug)]
pub enum Registration {
    Created(StoredAccount),
    Duplicate,
}

/// Flat JSON array of accounts, read and rewritten whole under a lock
#[derive(Debug, Clone)]
pub struct UserStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl UserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// A missing or unreadable file counts as no users
    async fn read_users(&self) -> Vec<StoredAccount> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Vec::new(),
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %self.path.display(), error = %e, "Users file is unreadable, treating as empty");
                Vec::new()
            }),
            Err(_) => Vec::new(),
        }
    }

    async fn save_users(&self, users: &[StoredAccount]) -> Result<()> {
        let raw = serde_json::to_string_pretty(users)?;
        tokio::fs::write(&self.path, raw)
            .await
            .with_context(|| format!("writing {}", self.path.display()))
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<Registration> {
        let _guard = self.lock.lock().await;
        let mut users = self.read_users().await;
        if users.iter().any(|u| u.username == username) {
            return Ok(Registration::Duplicate);
        }

        let account = StoredAccount {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            password: password.to_string(),
            created_at: Utc::now(),
        };
        users.push(account.clone());
        self.save_users(&users).await?;
        debug!(username = %username, user_count = users.len(), "Account stored");

        Ok(Registration::Created(account))
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> Option<StoredAccount> {
        let _guard = self.lock.lock().await;
        self.read_users()
            .await
            .into_iter()
            .find(|u| u.username == username && u.password == password)
    }
}

/// Identity extracted from a verified Google ID token
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleIdentity {
    pub subject: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl GoogleIdentity {
    pub fn into_profile(self, now: DateTime<Utc>) -> UserProfile {
        let username = self
            .name
            .clone()
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| self.subject.clone());
        UserProfile {
            id: Some(self.subject),
            username,
            email: self.email,
            created_at: now,
            provider: Some("google".to_string()),
        }
    }
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// `None` when the token is invalid or issued for another audience
    async fn verify(&self, token: &str) -> Option<GoogleIdentity>;
}

/// Verifies ID tokens against Google's tokeninfo endpoint
pub struct GoogleTokenInfo {
    client: Client,
    client_id: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl GoogleTokenInfo {
    pub fn new(client_id: String) -> Self {
        Self {
            client: Client::new(),
            client_id,
            endpoint: GOOGLE_TOKENINFO_ENDPOINT.to_string(),
        }
    }
}

#[async_trait]
impl TokenVerifier for GoogleTokenInfo {
    async fn verify(&self, token: &str) -> Option<GoogleIdentity> {
        let response = match self
            .client
            .get(&self.endpoint)
            .query(&[("id_token", token)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Token verification request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "Google rejected the ID token");
            return None;
        }

        let info: TokenInfo = match response.json().await {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "Unreadable tokeninfo response");
                return None;
            }
        };

        if info.aud != self.client_id {
            warn!(audience = %info.aud, "ID token issued for another client");
            return None;
        }

        Some(GoogleIdentity {
            subject: info.sub,
            name: info.name,
            email: info.email,
        })
    }
}

/// Consent-screen URL for the implicit flow
pub fn google_auth_url(client_id: &str, redirect_uri: &str) -> Result<String> {
    let url = Url::parse_with_params(
        GOOGLE_AUTH_ENDPOINT,
        &[
            ("client_id", client_id),
            ("response_type", "token"),
            ("redirect_uri", redirect_uri),
            ("scope", "profile email"),
        ],
    )?;
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (UserStore, PathBuf) {
        let path = std::env::temp_dir().join(format!("quiz-users-{}.json", Uuid::new_v4()));
        (UserStore::new(&path), path)
    }

    #[tokio::test]
    async fn test_register_and_authenticate() {
        let (store, path) = temp_store();

        let Registration::Created(account) = store.register("ivan", "secret").await.unwrap() else {
            panic!("first sign-up should create the account");
        };
        assert_eq!(account.username, "ivan");
        assert_eq!(account.profile().id.as_deref(), Some(account.id.as_str()));

        let outcome = store.register("ivan", "other").await.unwrap();
        assert!(matches!(outcome, Registration::Duplicate));

        assert!(store.authenticate("ivan", "secret").await.is_some());
        assert!(store.authenticate("ivan", "wrong").await.is_none());

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_empty() {
        let (store, path) = temp_store();
        tokio::fs::write(&path, "not json").await.unwrap();
        assert!(store.authenticate("ivan", "secret").await.is_none());
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[test]
    fn test_auth_url_is_encoded() {
        let url = google_auth_url("client-1", "http://localhost:3000").unwrap();
        assert!(url.starts_with(GOOGLE_AUTH_ENDPOINT));
        assert!(url.contains("client_id=client-1"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000"));
        assert!(url.contains("response_type=token"));
    }

    #[test]
    fn test_identity_prefers_name() {
        let identity = GoogleIdentity {
            subject: "123".to_string(),
            name: None,
            email: Some("a@b.bg".to_string()),
        };
        let profile = identity.into_profile(Utc::now());
        assert_eq!(profile.username, "a@b.bg");
        assert_eq!(profile.provider.as_deref(), Some("google"));
    }
}
