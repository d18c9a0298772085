use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::UserProfile;
use crate::storage::{user_key, KeyValueStore, CURRENT_USER_KEY};

pub const MIN_USERNAME_CHARS: usize = 3;
pub const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Моля, попълнете всички полета!")]
    MissingFields,

    #[error("Потребителското име трябва да е поне 3 символа!")]
    UsernameTooShort,

    #[error("Паролите не съвпадат!")]
    PasswordMismatch,

    #[error("Паролата трябва да е поне 6 символа!")]
    PasswordTooShort,

    #[error("Потребителското име вече е заето!")]
    UsernameTaken,

    #[error("Потребителят не съществува! Моля, регистрирайте се.")]
    UnknownUser,

    #[error("Грешна парола!")]
    WrongPassword,

    #[error("Грешка при достъп до локалните данни: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError::Storage(err.to_string())
    }
}

/// Record kept under `user:<username>`. The password is stored as entered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    username: String,
    password: String,
    created_at: DateTime<Utc>,
}

/// Sign-up and sign-in against the client-local key/value store
#[derive(Clone)]
pub struct LocalAccounts {
    store: Arc<dyn KeyValueStore>,
}

impl LocalAccounts {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn register(&self, username: &str, password: &str, confirm: &str) -> Result<UserProfile, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() || confirm.is_empty() {
            return Err(AuthError::MissingFields);
        }
        if username.chars().count() < MIN_USERNAME_CHARS {
            return Err(AuthError::UsernameTooShort);
        }
        if password != confirm {
            return Err(AuthError::PasswordMismatch);
        }
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AuthError::PasswordTooShort);
        }

        let key = user_key(username);
        if self.store.get(&key).await?.is_some() {
            warn!(username = %username, "Sign-up rejected, username taken");
            return Err(AuthError::UsernameTaken);
        }

        let stored = StoredUser {
            username: username.to_string(),
            password: password.to_string(),
            created_at: Utc::now(),
        };
        self.store.set(&key, to_json(&stored)?).await?;

        info!(username = %username, "Local account created");
        self.remember(UserProfile::local(username, stored.created_at)).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }

        let raw = self
            .store
            .get(&user_key(username))
            .await?
            .ok_or(AuthError::UnknownUser)?;
        let stored: StoredUser = serde_json::from_str(&raw).map_err(|e| {
            warn!(username = %username, error = %e, "Stored account is unreadable");
            AuthError::UnknownUser
        })?;

        if stored.password != password {
            warn!(username = %username, "Login rejected, wrong password");
            return Err(AuthError::WrongPassword);
        }

        info!(username = %username, "Local login succeeded");
        self.remember(UserProfile::local(&stored.username, stored.created_at)).await
    }

    /// Remembers an externally authenticated user, e.g. after Google sign-in
    pub async fn remember(&self, user: UserProfile) -> Result<UserProfile, AuthError> {
        self.store.set(CURRENT_USER_KEY, to_json(&user)?).await?;
        Ok(user)
    }

    pub async fn logout(&self) -> Result<(), AuthError> {
        self.store.delete(CURRENT_USER_KEY).await?;
        Ok(())
    }

    /// The user remembered from a previous run, if any
    pub async fn restore(&self) -> Result<Option<UserProfile>, AuthError> {
        let Some(raw) = self.store.get(CURRENT_USER_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable remembered user");
                self.store.delete(CURRENT_USER_KEY).await?;
                Ok(None)
            }
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, AuthError> {
    serde_json::to_string(value).map_err(|e| AuthError::Storage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn accounts() -> LocalAccounts {
        LocalAccounts::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_register_validation_order() {
        let accounts = accounts();
        assert_eq!(accounts.register("", "secret", "secret").await, Err(AuthError::MissingFields));
        assert_eq!(accounts.register("iv", "secret", "secret").await, Err(AuthError::UsernameTooShort));
        assert_eq!(accounts.register("ivan", "secret", "secreT").await, Err(AuthError::PasswordMismatch));
        assert_eq!(accounts.register("ivan", "abc", "abc").await, Err(AuthError::PasswordTooShort));
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let accounts = accounts();
        let user = accounts.register(" ivan ", "secret1", "secret1").await.unwrap();
        assert_eq!(user.username, "ivan");

        assert_eq!(
            accounts.register("ivan", "secret2", "secret2").await,
            Err(AuthError::UsernameTaken)
        );
        assert_eq!(accounts.login("ivan", "wrong!").await, Err(AuthError::WrongPassword));
        assert_eq!(accounts.login("maria", "secret1").await, Err(AuthError::UnknownUser));

        let logged_in = accounts.login("ivan", "secret1").await.unwrap();
        assert_eq!(logged_in.created_at, user.created_at);
    }

    #[tokio::test]
    async fn test_restore_and_logout() {
        let accounts = accounts();
        assert_eq!(accounts.restore().await.unwrap(), None);

        accounts.register("maria", "secret1", "secret1").await.unwrap();
        let restored = accounts.restore().await.unwrap().unwrap();
        assert_eq!(restored.username, "maria");

        accounts.logout().await.unwrap();
        assert_eq!(accounts.restore().await.unwrap(), None);
    }

    #[test]
    fn test_error_messages_are_bulgarian() {
        assert_eq!(AuthError::WrongPassword.to_string(), "Грешна парола!");
    }
}
