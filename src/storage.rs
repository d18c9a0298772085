use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

pub const CURRENT_USER_KEY: &str = "currentUser";
pub const CUSTOM_QUESTIONS_KEY: &str = "customQuestions";
/// Last unreadable `customQuestions` value, kept aside before the cache is rewritten
pub const CUSTOM_QUESTIONS_BACKUP_KEY: &str = "customQuestions.corrupt";
pub const USER_KEY_PREFIX: &str = "user:";

pub fn user_key(username: &str) -> String {
    format!("{}{}", USER_KEY_PREFIX, username)
}

/// Client-local key/value persistence
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> Result<()>;
    /// Returns whether the key existed
    async fn delete(&self, key: &str) -> Result<bool>;
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Volatile store, lost when the process exits
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.read().await;
        Ok(entries.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }
}

/// Store backed by a single JSON object on disk, rewritten on every change
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: Arc<RwLock<BTreeMap<String, String>>>,
}

impl FileStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("state file {} is not a JSON object of strings", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };

        debug!(path = %path.display(), entry_count = entries.len(), "Opened local state file");

        Ok(Self {
            path,
            entries: Arc::new(RwLock::new(entries)),
        })
    }

    async fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(&self.path, raw)
            .await
            .with_context(|| format!("writing {}", self.path.display()))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        self.flush(&entries).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.write().await;
        let existed = entries.remove(key).is_some();
        if existed {
            self.flush(&entries).await?;
        }
        Ok(existed)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.read().await;
        Ok(entries.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }
}
