use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::json_parser::JsonResponseParser;
use crate::llm_providers::{GenerationOptions, TextGenerator};
use crate::models::{GradeInput, GradeReport, GradeResult, GradeSource};

pub const MIN_GRADE: f64 = 2.0;
pub const MAX_GRADE: f64 = 6.0;
const GRADING_TEMPERATURE: f32 = 0.3;
const GRADING_MAX_TOKENS: u32 = 1000;

/// Grades a finished run, preferring the model and falling back to a local formula
#[derive(Clone)]
pub struct GradingEngine {
    generator: Arc<dyn TextGenerator>,
    parser: JsonResponseParser,
}

impl GradingEngine {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            parser: JsonResponseParser::for_grade(),
        }
    }

    /// Never fails: any problem on the model path yields the fallback grade
    pub async fn grade(&self, input: &GradeInput) -> GradeReport {
        info!(
            provider = self.generator.provider_name(),
            model = self.generator.model_name(),
            correct = input.correct,
            total = input.total,
            words = word_count(&input.essay),
            hints_used = input.hints_used,
            "Requesting AI grade"
        );

        match self.grade_with_model(input).await {
            Ok(result) => {
                info!(grade = %result.formatted_grade(), "Received AI grade");
                GradeReport {
                    result,
                    source: GradeSource::Ai,
                }
            }
            Err(reason) => {
                warn!(reason = %reason, "AI grading failed, using fallback formula");
                GradeReport {
                    result: fallback_grade(input),
                    source: GradeSource::Fallback,
                }
            }
        }
    }

    async fn grade_with_model(&self, input: &GradeInput) -> Result<GradeResult, String> {
        let options = GenerationOptions {
            model: None,
            temperature: GRADING_TEMPERATURE,
            max_output_tokens: GRADING_MAX_TOKENS,
        };
        let response_text = self
            .generator
            .generate(&build_prompt(input), &options)
            .await
            .map_err(|e| e.to_string())?;

        debug!(response_content = %response_text, "Raw LLM response for grading");

        let parsed = self.parser.parse(&response_text).map_err(|e| e.to_string())?;
        let mut result: GradeResult =
            serde_json::from_value(parsed.value).map_err(|e| format!("grade payload: {}", e))?;

        if !result.grade.is_finite() {
            return Err(format!("grade {} is not a finite number", result.grade));
        }
        result.grade = round2(result.grade.clamp(MIN_GRADE, MAX_GRADE));
        Ok(result)
    }
}

/// Whitespace-delimited words
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Rounded share of correct answers; an empty test counts as 0%
pub fn percentage(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * correct as f64 / total as f64).round() as u32
}

pub fn thesis_grade(words: usize) -> f64 {
    if (150..=250).contains(&words) {
        6.0
    } else if words >= 100 {
        5.0
    } else {
        3.0
    }
}

pub fn fallback_grade(input: &GradeInput) -> GradeResult {
    let p = percentage(input.correct, input.total);
    let words = word_count(&input.essay);

    let test_grade = 2.0 + 4.0 * p as f64 / 100.0;
    let raw = test_grade * 0.6 + thesis_grade(words) * 0.4 - 0.1 * input.hints_used as f64;

    GradeResult {
        grade: round2(raw.clamp(MIN_GRADE, MAX_GRADE)),
        test_feedback: format!("{}% верни отговори", p),
        thesis_feedback: if words > 0 {
            format!("{} думи", words)
        } else {
            "Не е написано".to_string()
        },
        comment: "Добро представяне!".to_string(),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn build_prompt(input: &GradeInput) -> String {
    let p = percentage(input.correct, input.total);
    let words = word_count(&input.essay);
    let essay = if input.essay.trim().is_empty() {
        "Не е написано есе"
    } else {
        input.essay.as_str()
    };

    format!(
        r#"Ти си учител по български език и литература. Оцени ученика по БЕЛ матура 10. клас.

Резултати:
- Тестова част: {correct}/{total} верни отговора ({p}%)
- Използвани подсказки: {hints}
- Думи в есето: {words}

Есе:
{essay}

Оцени по българската система (от 2.00 до 6.00). Върни САМО JSON в този формат:
{{
  "grade": "5.50",
  "testFeedback": "Кратък коментар за теста",
  "thesisFeedback": "Кратък коментар за есето",
  "comment": "Общ коментар"
}}

Критерии:
- Тест: 60% от оценката
- Есе: 40% от оценката
- Подсказките намаляват оценката с 0.10 за всяка
- Есето трябва да е 150-250 думи за максимална оценка

Върни САМО JSON, без друг текст."#,
        correct = input.correct,
        total = input.total,
        p = p,
        hints = input.hints_used,
        words = words,
        essay = essay,
    )
}
