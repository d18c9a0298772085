use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::json_parser::JsonResponseParser;
use crate::llm_providers::{GenerationOptions, LLMError, TextGenerator};
use crate::models::{QuizItem, Tier};

pub const DEFAULT_KEYWORDS: &str = "българска литература, Вазов, Ботев, Под игото";
pub const DEFAULT_TEST_TITLE: &str = "AI тест";
pub const MAX_ITEM_COUNT: usize = 50;
const GENERATION_TEMPERATURE: f32 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub count: usize,
    pub tier: Tier,
    #[serde(default)]
    pub keywords: String,
    #[serde(default = "default_include_essay")]
    pub include_essay: bool,
}

fn default_include_essay() -> bool {
    true
}

impl GenerationRequest {
    pub fn new(count: usize, tier: Tier) -> Self {
        Self {
            count,
            tier,
            keywords: String::new(),
            include_essay: true,
        }
    }

    pub fn with_keywords(mut self, keywords: &str) -> Self {
        self.keywords = keywords.to_string();
        self
    }

    pub fn with_essay(mut self, include_essay: bool) -> Self {
        self.include_essay = include_essay;
        self
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.count == 0 {
            return Err(GenerationError::InvalidRequest(
                "Броят въпроси трябва да е поне 1".to_string(),
            ));
        }
        if self.count > MAX_ITEM_COUNT {
            return Err(GenerationError::InvalidRequest(format!(
                "Броят въпроси не може да надвишава {}",
                MAX_ITEM_COUNT
            )));
        }
        Ok(())
    }

    pub fn effective_keywords(&self) -> &str {
        let trimmed = self.keywords.trim();
        if trimmed.is_empty() { DEFAULT_KEYWORDS } else { trimmed }
    }

    /// Roughly 200 tokens per item plus room for the envelope
    pub fn max_output_tokens(&self) -> u32 {
        let estimate = (self.count as u32).saturating_mul(200).saturating_add(500);
        estimate.max(2048)
    }

    pub fn options(&self) -> GenerationOptions {
        GenerationOptions {
            model: None,
            temperature: GENERATION_TEMPERATURE,
            max_output_tokens: self.max_output_tokens(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("proxy returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("proxy request failed: {0}")]
    Network(String),

    #[error("model response is not a parseable test payload")]
    ContentParse { raw: String },

    #[error("generated test is invalid: {defect}")]
    Validation { defect: String, raw: String },

    #[error("a generation request is already running")]
    AlreadyRunning,
}

impl From<LLMError> for GenerationError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::Status { status, body } => GenerationError::Upstream { status, body },
            LLMError::Transport(msg) | LLMError::Configuration(msg) => GenerationError::Network(msg),
        }
    }
}

impl GenerationError {
    /// Status line shown to the player
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::InvalidRequest(msg) => msg.clone(),
            GenerationError::Upstream { status, body } => format!("Proxy error: {} - {}", status, body),
            GenerationError::Network(msg) => format!("Грешка при заявка към проксито: {}", msg),
            GenerationError::ContentParse { .. } => {
                "Неуспешно парсване на JSON. Вижте съдържанието по-долу.".to_string()
            }
            GenerationError::Validation { defect, .. } => {
                format!("Полученият JSON не е валиден тест: {}", defect)
            }
            GenerationError::AlreadyRunning => "Генерирането вече е в ход. Моля изчакайте.".to_string(),
        }
    }

    /// Model text to show for debugging, when there is any
    pub fn raw_content(&self) -> Option<&str> {
        match self {
            GenerationError::ContentParse { raw } | GenerationError::Validation { raw, .. } => Some(raw),
            GenerationError::Upstream { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// How the received item count was reconciled with the requested one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reconciliation {
    Exact { count: usize },
    Truncated { received: usize, kept: usize },
    Short { requested: usize, received: usize },
}

impl Reconciliation {
    pub fn is_warning(&self) -> bool {
        matches!(self, Reconciliation::Short { .. })
    }

    pub fn status_message(&self) -> String {
        match self {
            Reconciliation::Exact { count } => format!(
                "Тестът е генериран успешно! Генерирани {} въпроса. Започвам играта...",
                count
            ),
            Reconciliation::Truncated { kept, .. } => format!(
                "Изрязани са излишните въпроси. Генерирани {} въпроса. Започвам играта...",
                kept
            ),
            Reconciliation::Short { requested, received } => format!(
                "Предупреждение: Генерирани са само {} въпроса вместо {}. Започвам играта...",
                received, requested
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedTest {
    pub title: String,
    pub items: Vec<QuizItem>,
    pub essay_topic: Option<String>,
    pub reconciliation: Reconciliation,
}

/// Turns a generation request into a validated batch of quiz items
#[derive(Clone)]
pub struct ContentGenerator {
    generator: Arc<dyn TextGenerator>,
    parser: JsonResponseParser,
}

impl ContentGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            parser: JsonResponseParser::for_test_payload(),
        }
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedTest, GenerationError> {
        request.validate()?;

        info!(
            provider = self.generator.provider_name(),
            model = self.generator.model_name(),
            count = request.count,
            tier = %request.tier,
            include_essay = request.include_essay,
            "Generating quiz test"
        );

        let started = Instant::now();
        let provider = self.generator.provider_name();
        crate::log_llm_operation!(start, "generate_test", provider = provider);

        let prompt = build_prompt(request);
        let response_text = match self.generator.generate(&prompt, &request.options()).await {
            Ok(text) => text,
            Err(e) => {
                crate::log_llm_operation!(error, "generate_test", provider = provider, error = e);
                return Err(e.into());
            }
        };

        debug!(
            response_length = response_text.len(),
            preview = %response_text.chars().take(200).collect::<String>(),
            "Raw LLM response for test generation"
        );

        if response_text.trim().is_empty() {
            warn!("Proxy returned an empty body");
            return Err(GenerationError::ContentParse { raw: response_text });
        }

        let test = self.parse_test(&response_text, request)?;
        crate::log_llm_operation!(
            success,
            "generate_test",
            provider = provider,
            duration_ms = started.elapsed().as_millis() as u64
        );
        Ok(test)
    }

    /// Parses, validates and reconciles a raw model response
    pub fn parse_test(&self, raw: &str, request: &GenerationRequest) -> Result<GeneratedTest, GenerationError> {
        let parsed = self.parser.parse(raw).map_err(|e| {
            error!(error = %e, "Failed to recover JSON from generated test");
            GenerationError::ContentParse { raw: raw.to_string() }
        })?;

        debug!(strategy = %parsed.strategy, "Extracted test payload");

        let invalid = |defect: String| {
            crate::log_validation!(failure, "generated_test", error = defect);
            GenerationError::Validation {
                defect,
                raw: raw.to_string(),
            }
        };

        let entries = parsed
            .value
            .get("questions")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("липсва поле questions".to_string()))?;

        if entries.is_empty() {
            return Err(invalid("масивът questions е празен".to_string()));
        }

        let mut items = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| validate_item(entry, request.tier).map_err(|d| invalid(format!("въпрос {}: {}", idx + 1, d))))
            .collect::<Result<Vec<_>, _>>()?;

        let received = items.len();
        let reconciliation = if received > request.count {
            warn!(
                requested = request.count,
                received = received,
                "Model over-generated, trimming to requested size"
            );
            items.truncate(request.count);
            Reconciliation::Truncated {
                received,
                kept: request.count,
            }
        } else if received < request.count {
            warn!(
                requested = request.count,
                received = received,
                "Model under-generated, accepting shorter test"
            );
            Reconciliation::Short {
                requested: request.count,
                received,
            }
        } else {
            Reconciliation::Exact { count: received }
        };

        let title = parsed
            .value
            .get("testTitle")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TEST_TITLE)
            .to_string();

        let essay_topic = if request.include_essay {
            parsed
                .value
                .get("thesisTopic")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        } else {
            None
        };

        info!(
            title = %title,
            item_count = items.len(),
            has_essay_topic = essay_topic.is_some(),
            "Successfully generated quiz test"
        );

        Ok(GeneratedTest {
            title,
            items,
            essay_topic,
            reconciliation,
        })
    }
}

fn validate_item(entry: &Value, requested_tier: Tier) -> Result<QuizItem, String> {
    let question = entry
        .get("question")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or("липсва текст на въпроса")?;

    let options = entry
        .get("options")
        .and_then(Value::as_array)
        .ok_or("липсва масив options")?
        .iter()
        .map(|o| o.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or("всички отговори трябва да са текст")?;

    if options.is_empty() {
        return Err("масивът options е празен".to_string());
    }

    let correct = entry
        .get("correct")
        .and_then(as_index)
        .ok_or("липсва числов индекс correct")?;

    if correct >= options.len() {
        return Err(format!(
            "индексът correct ({}) е извън отговорите ({})",
            correct,
            options.len()
        ));
    }

    let tier = entry
        .get("difficulty")
        .and_then(Value::as_str)
        .and_then(Tier::parse)
        .unwrap_or(requested_tier);

    let explanation = entry
        .get("explanation")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(QuizItem {
        question: question.to_string(),
        options,
        correct,
        tier,
        explanation,
    })
}

/// Non-negative integral JSON number; `2.0` counts, `"2"` does not
fn as_index(value: &Value) -> Option<usize> {
    if let Some(n) = value.as_u64() {
        return Some(n as usize);
    }
    value
        .as_f64()
        .filter(|f| *f >= 0.0 && f.fract() == 0.0)
        .map(|f| f as usize)
}

pub fn build_prompt(request: &GenerationRequest) -> String {
    let n = request.count;
    let include = if request.include_essay { "yes" } else { "no" };

    format!(
        r#"You are a Bulgarian literature expert. Generate a multiple-choice TEST for 10th grade Bulgarian literature (БЕЛ матура 10. клас).

!!!CRITICAL REQUIREMENT!!!
You MUST generate EXACTLY {n} questions - NO MORE, NO LESS.
Count carefully: 1, 2, 3... up to {n}.
DO NOT generate {over} or more questions.
DO NOT generate {under} or fewer questions.
The questions array MUST contain EXACTLY {n} items.

Respond ONLY with valid JSON in this exact format (no markdown, no code blocks, just pure JSON):
{{
  "testTitle": "Заглавие на теста",
  "questions": [
    {{
      "question": "Въпросът на български?",
      "options": ["отговор1","отговор2","отговор3","отговор4"],
      "correct": 0,
      "difficulty": "{tier}",
      "explanation": "Кратко обяснение на български"
    }}
  ],
  "thesisTopic": "Тема за есе (само ако е поискано)"
}}

REQUIREMENTS (MANDATORY):
1. EXACTLY {n} questions in the array (count: 1,2,3...{n})
2. Each question MUST have exactly 4 options in Bulgarian
3. Difficulty level: "{tier}" for ALL questions
4. All text MUST be in Bulgarian language
5. Include short explanation in Bulgarian for each answer
6. Include thesisTopic only if: {include}
7. Focus on: {keywords}
8. Topics: Bulgarian Revival literature, Vazov, Botev, Bulgarian poetry and prose

FINAL CHECK BEFORE RESPONDING:
- Count the questions in your JSON
- Verify you have EXACTLY {n} questions
- If you have more than {n}, remove the extra ones
- If you have less than {n}, add more questions

Return ONLY the JSON object, no other text."#,
        n = n,
        over = n + 1,
        under = n.saturating_sub(1),
        tier = request.tier,
        include = include,
        keywords = request.effective_keywords(),
    )
}
