use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog;
use crate::models::{QuizItem, Tier};
use crate::storage::{CUSTOM_QUESTIONS_BACKUP_KEY, CUSTOM_QUESTIONS_KEY, KeyValueStore};

/// In-memory catalog of quiz items and essay topics for the next run.
///
/// Items are never edited in place: the catalog only grows through
/// [`ContentStore::append`] or is swapped out by [`ContentStore::replace_all`].
pub struct ContentStore {
    items: Vec<QuizItem>,
    topics: Vec<String>,
    cache: Arc<dyn KeyValueStore>,
}

impl ContentStore {
    /// The built-in catalog without any cached additions
    pub fn load() -> Vec<QuizItem> {
        catalog::default_items()
    }

    /// Static catalog plus every custom item cached by earlier saves
    pub async fn open(cache: Arc<dyn KeyValueStore>) -> Result<Self> {
        let mut items = Self::load();
        let cached = read_cached_items(cache.as_ref()).await?;
        if !cached.is_empty() {
            info!(cached_count = cached.len(), "Loaded custom questions from local cache");
        }
        items.extend(cached);

        Ok(Self {
            items,
            topics: catalog::default_topics(),
            cache,
        })
    }

    pub fn items(&self) -> &[QuizItem] {
        &self.items
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Adds already-validated items and appends them to the local cache
    pub async fn append(&mut self, items: Vec<QuizItem>) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let mut cached: Vec<Value> = match self.cache.get(CUSTOM_QUESTIONS_KEY).await? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    self.cache.set(CUSTOM_QUESTIONS_BACKUP_KEY, raw).await?;
                    warn!(
                        error = %e,
                        backup_key = CUSTOM_QUESTIONS_BACKUP_KEY,
                        "Custom question cache is corrupt, moved it aside and starting a fresh one"
                    );
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        for item in &items {
            cached.push(serde_json::to_value(item)?);
        }
        self.cache
            .set(CUSTOM_QUESTIONS_KEY, serde_json::to_string(&cached)?)
            .await?;

        info!(
            appended = items.len(),
            cached_total = cached.len(),
            "Appended questions to the catalog and local cache"
        );
        self.items.extend(items);
        Ok(())
    }

    /// Swaps the whole catalog for the given items. The cache is left untouched.
    pub fn replace_all(&mut self, items: Vec<QuizItem>) {
        info!(
            previous = self.items.len(),
            replacement = items.len(),
            "Replacing question catalog"
        );
        self.items = items;
    }

    pub fn replace_topics(&mut self, topics: Vec<String>) {
        if topics.is_empty() {
            return;
        }
        self.topics = topics;
    }
}

async fn read_cached_items(cache: &dyn KeyValueStore) -> Result<Vec<QuizItem>> {
    let Some(raw) = cache.get(CUSTOM_QUESTIONS_KEY).await? else {
        return Ok(Vec::new());
    };

    let entries: Vec<Value> = match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable custom question cache");
            return Ok(Vec::new());
        }
    };

    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        match cached_item(&entry) {
            Some(item) => items.push(item),
            None => warn!(entry = %entry, "Skipping malformed cached question"),
        }
    }
    Ok(items)
}

fn cached_item(entry: &Value) -> Option<QuizItem> {
    let question = entry.get("question")?.as_str().filter(|q| !q.trim().is_empty())?;
    let options = entry
        .get("options")?
        .as_array()?
        .iter()
        .map(|o| o.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()?;
    let correct = entry.get("correct")?.as_u64()? as usize;
    if correct >= options.len() {
        return None;
    }
    let tier = entry
        .get("difficulty")
        .and_then(Value::as_str)
        .and_then(Tier::parse)
        .unwrap_or_default();
    let explanation = entry
        .get("explanation")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some(QuizItem {
        question: question.to_string(),
        options,
        correct,
        tier,
        explanation,
    })
}
