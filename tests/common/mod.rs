#![allow(dead_code)]

use async_trait::async_trait;
use literature_quiz::llm_providers::{GenerationOptions, LLMError, TextGenerator};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Replays canned replies in order and records what it was asked
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, LLMError>>>,
    prompts: Mutex<Vec<(String, GenerationOptions)>>,
    delay: Option<Duration>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<String, LLMError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Holds every reply back for `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(vec![Ok(text.into())])
    }

    pub fn prompts(&self) -> Vec<(String, GenerationOptions)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, LLMError> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), options.clone()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LLMError::Transport("no scripted reply left".to_string())))
    }

    fn provider_name(&self) -> &'static str {
        "Scripted"
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// A `{"questions": [...]}` payload with `n` well-formed items
pub fn test_payload(n: usize, thesis_topic: Option<&str>) -> String {
    let questions: Vec<_> = (1..=n)
        .map(|i| {
            json!({
                "question": format!("Въпрос {}", i),
                "options": ["А", "Б", "В", "Г"],
                "correct": i % 4,
                "difficulty": "silver",
                "explanation": format!("Обяснение {}", i),
            })
        })
        .collect();

    let mut payload = json!({ "testTitle": "Тест по литература", "questions": questions });
    if let Some(topic) = thesis_topic {
        payload["thesisTopic"] = json!(topic);
    }
    payload.to_string()
}
