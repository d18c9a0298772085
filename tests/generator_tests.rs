mod common;

use common::{test_payload, ScriptedGenerator};
use literature_quiz::llm_providers::LLMError;
use literature_quiz::{ContentGenerator, GenerationError, GenerationRequest, Reconciliation, Tier};
use std::sync::Arc;

fn generator(script: ScriptedGenerator) -> (ContentGenerator, Arc<ScriptedGenerator>) {
    let script = Arc::new(script);
    (ContentGenerator::new(script.clone()), script)
}

#[tokio::test]
async fn test_over_generation_keeps_first_items_in_order() {
    let (generator, script) = generator(ScriptedGenerator::replying(test_payload(12, None)));
    let request = GenerationRequest::new(10, Tier::Silver);

    let test = generator.generate(&request).await.unwrap();

    assert_eq!(test.items.len(), 10);
    assert_eq!(test.items[0].question, "Въпрос 1");
    assert_eq!(test.items[9].question, "Въпрос 10");
    assert_eq!(
        test.reconciliation,
        Reconciliation::Truncated {
            received: 12,
            kept: 10
        }
    );
    assert!(!test.reconciliation.is_warning());
    assert_eq!(test.title, "Тест по литература");

    let prompts = script.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].0.contains("EXACTLY 10 questions"));
    assert_eq!(prompts[0].1.temperature, 0.2);
    assert_eq!(prompts[0].1.max_output_tokens, 2500);
}

#[tokio::test]
async fn test_under_generation_is_accepted_with_warning() {
    let (generator, _) = generator(ScriptedGenerator::replying(test_payload(7, None)));
    let request = GenerationRequest::new(10, Tier::Gold);

    let test = generator.generate(&request).await.unwrap();

    assert_eq!(test.items.len(), 7);
    assert!(test.reconciliation.is_warning());
    assert_eq!(
        test.reconciliation.status_message(),
        "Предупреждение: Генерирани са само 7 въпроса вместо 10. Започвам играта..."
    );
}

#[tokio::test]
async fn test_payload_wrapped_in_prose_and_fences() {
    let wrapped = format!(
        "Ето вашия тест:\n```json\n{}\n```\nУспех на матурата!",
        test_payload(3, Some("Образът на майката в творчеството на Вазов"))
    );
    let (generator, _) = generator(ScriptedGenerator::replying(wrapped));
    let request = GenerationRequest::new(3, Tier::Bronze);

    let test = generator.generate(&request).await.unwrap();

    assert_eq!(test.items.len(), 3);
    assert_eq!(test.reconciliation, Reconciliation::Exact { count: 3 });
    assert_eq!(
        test.essay_topic.as_deref(),
        Some("Образът на майката в творчеството на Вазов")
    );
}

#[tokio::test]
async fn test_thesis_topic_ignored_unless_requested() {
    let (generator, _) = generator(ScriptedGenerator::replying(test_payload(2, Some("Тема"))));

    let test = generator
        .generate(&GenerationRequest::new(2, Tier::Bronze).with_essay(false))
        .await
        .unwrap();

    assert!(test.essay_topic.is_none());
}

#[tokio::test]
async fn test_unparseable_reply_keeps_raw_text() {
    let reply = "Съжалявам, не мога да генерирам тест в момента.";
    let (generator, _) = generator(ScriptedGenerator::replying(reply));

    let err = generator
        .generate(&GenerationRequest::new(5, Tier::Bronze))
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::ContentParse { .. }));
    assert_eq!(err.raw_content(), Some(reply));
    assert_eq!(
        err.user_message(),
        "Неуспешно парсване на JSON. Вижте съдържанието по-долу."
    );
}

#[tokio::test]
async fn test_empty_reply_is_a_parse_failure() {
    let (generator, _) = generator(ScriptedGenerator::replying("   "));

    let err = generator
        .generate(&GenerationRequest::new(5, Tier::Bronze))
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::ContentParse { .. }));
}

#[tokio::test]
async fn test_out_of_range_correct_index_is_rejected() {
    let payload = r#"{"questions":[
        {"question":"Кой е авторът на „Тютюн“?","options":["Димитър Димов","Иван Вазов"],"correct":0},
        {"question":"Кой е авторът на „Чумава“?","options":["Пейо Яворов","Христо Ботев"],"correct":5}
    ]}"#;
    let (generator, _) = generator(ScriptedGenerator::replying(payload));

    let err = generator
        .generate(&GenerationRequest::new(2, Tier::Bronze))
        .await
        .unwrap_err();

    match &err {
        GenerationError::Validation { defect, raw } => {
            assert!(defect.starts_with("въпрос 2"));
            assert_eq!(raw, payload);
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_upstream_status_is_reported() {
    let (generator, _) = generator(ScriptedGenerator::new(vec![Err(LLMError::Status {
        status: 500,
        body: r#"{"error":"Server not configured with GEMINI_API_KEY"}"#.to_string(),
    })]));

    let err = generator
        .generate(&GenerationRequest::new(5, Tier::Bronze))
        .await
        .unwrap_err();

    assert_eq!(
        err.user_message(),
        r#"Proxy error: 500 - {"error":"Server not configured with GEMINI_API_KEY"}"#
    );
}

#[tokio::test]
async fn test_invalid_count_never_reaches_the_model() {
    let (generator, script) = generator(ScriptedGenerator::new(vec![]));

    for count in [0, 51] {
        let err = generator
            .generate(&GenerationRequest::new(count, Tier::Bronze))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidRequest(_)));
    }
    assert!(script.prompts().is_empty());
}

#[tokio::test]
async fn test_stray_brace_in_prose_before_payload() {
    let reply = format!("Ето теста (формат {{JSON): {} Край", test_payload(4, None));
    let (generator, _) = generator(ScriptedGenerator::replying(reply));

    let test = generator
        .generate(&GenerationRequest::new(4, Tier::Silver))
        .await
        .unwrap();

    assert_eq!(test.items.len(), 4);
    assert_eq!(test.reconciliation, Reconciliation::Exact { count: 4 });
}
