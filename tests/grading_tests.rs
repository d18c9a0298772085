mod common;

use common::ScriptedGenerator;
use literature_quiz::grading::{fallback_grade, word_count, MAX_GRADE, MIN_GRADE};
use literature_quiz::llm_providers::LLMError;
use literature_quiz::{GradeInput, GradeSource, GradingEngine};
use std::sync::Arc;

fn input(correct: usize, total: usize, words: usize, hints_used: u32) -> GradeInput {
    GradeInput {
        correct,
        total,
        essay: vec!["дума"; words].join(" "),
        hints_used,
    }
}

fn engine(script: ScriptedGenerator) -> (GradingEngine, Arc<ScriptedGenerator>) {
    let script = Arc::new(script);
    (GradingEngine::new(script.clone()), script)
}

#[test]
fn test_fallback_stays_on_the_scale() {
    for total in [0, 1, 3, 10, 30] {
        for correct in 0..=total {
            for words in [0, 50, 99, 100, 149, 150, 250, 251, 400] {
                for hints in [0, 1, 5, 40] {
                    let grade = fallback_grade(&input(correct, total, words, hints)).grade;
                    assert!(
                        (MIN_GRADE..=MAX_GRADE).contains(&grade),
                        "grade {} out of range for {}/{} {} words {} hints",
                        grade,
                        correct,
                        total,
                        words,
                        hints
                    );
                    assert_eq!(grade, (grade * 100.0).round() / 100.0);
                }
            }
        }
    }
}

#[test]
fn test_word_count_ignores_extra_whitespace() {
    assert_eq!(word_count(""), 0);
    assert_eq!(word_count("   \n\t "), 0);
    assert_eq!(word_count("  Под   игото\nе роман "), 4);
}

#[tokio::test]
async fn test_ai_grade_is_used_when_valid() {
    let reply = r#"{"grade": 5.25, "testFeedback": "Много добре", "thesisFeedback": "Добра аргументация", "comment": "Браво!"}"#;
    let (engine, script) = engine(ScriptedGenerator::replying(reply));

    let report = engine.grade(&input(8, 10, 180, 1)).await;

    assert_eq!(report.source, GradeSource::Ai);
    assert_eq!(report.result.grade, 5.25);
    assert_eq!(report.result.test_feedback, "Много добре");
    assert_eq!(report.result.comment, "Браво!");

    let prompts = script.prompts();
    assert_eq!(prompts[0].1.temperature, 0.3);
    assert_eq!(prompts[0].1.max_output_tokens, 1000);
    assert!(prompts[0].0.contains("8/10"));
}

#[tokio::test]
async fn test_ai_grade_as_string_inside_prose_is_clamped() {
    let reply = "Ето оценката:\n{\"grade\": \"7\", \"testFeedback\": \"\", \"thesisFeedback\": \"\", \"comment\": \"\"}\nБлагодаря!";
    let (engine, _) = engine(ScriptedGenerator::replying(reply));

    let report = engine.grade(&input(10, 10, 200, 0)).await;

    assert_eq!(report.source, GradeSource::Ai);
    assert_eq!(report.result.grade, MAX_GRADE);
    assert_eq!(report.result.formatted_grade(), "6.00");
}

#[tokio::test]
async fn test_fallback_on_upstream_error() {
    let (engine, _) = engine(ScriptedGenerator::new(vec![Err(LLMError::Transport(
        "connection refused".to_string(),
    ))]));
    let stats = input(2, 3, 120, 3);

    let report = engine.grade(&stats).await;

    assert_eq!(report.source, GradeSource::Fallback);
    assert_eq!(report.result, fallback_grade(&stats));
    assert_eq!(report.result.grade, 4.51);
}

#[tokio::test]
async fn test_fallback_on_unusable_reply() {
    for reply in [
        "Не мога да оценя това есе.",
        r#"{"grade": "отличен"}"#,
        r#"{"testFeedback": "без оценка"}"#,
    ] {
        let (engine, _) = engine(ScriptedGenerator::replying(reply));
        let report = engine.grade(&input(5, 10, 0, 0)).await;
        assert_eq!(report.source, GradeSource::Fallback, "reply: {}", reply);
        assert_eq!(report.result.thesis_feedback, "Не е написано");
    }
}
