use chrono::Utc;
use literature_quiz::session::{shuffle, FeedbackKind, MIN_ESSAY_WORDS};
use literature_quiz::{
    Action, Effect, GradeReport, GradeResult, GradeSource, Phase, QuizItem, Session, Tier, TimerPhase, UserProfile,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn three_items() -> Vec<QuizItem> {
    vec![
        QuizItem::new(
            "Кой е авторът на „Под игото“?",
            ["Иван Вазов", "Христо Ботев", "Алеко Константинов", "Елин Пелин"],
            0,
            Tier::Bronze,
            "Романът е написан от Иван Вазов.",
        ),
        QuizItem::new(
            "Кой е авторът на „Бай Ганьо“?",
            ["Пейо Яворов", "Алеко Константинов", "Йордан Йовков", "Димчо Дебелянов"],
            1,
            Tier::Silver,
            "„Бай Ганьо“ е дело на Алеко Константинов.",
        ),
        QuizItem::new(
            "Кой е авторът на „Железният светилник“?",
            ["Елин Пелин", "Иван Вазов", "Димитър Талев", "Йордан Радичков"],
            2,
            Tier::Gold,
            "Романът е на Димитър Талев.",
        ),
    ]
}

fn logged_in() -> Session {
    let mut session = Session::with_seed(7);
    session.dispatch(Action::Login(UserProfile::local("ivan", Utc::now())));
    session
}

fn start(session: &mut Session, items: Vec<QuizItem>) -> Vec<Effect> {
    session.dispatch(Action::StartGame {
        items,
        topics: vec!["Родината в поезията на Ботев".to_string()],
    })
}

fn words(n: usize) -> String {
    vec!["дума"; n].join(" ")
}

/// Answers the current question right or wrong and moves on
fn answer(session: &mut Session, right: bool) {
    let current = session.current().unwrap().clone();
    let choice = if right {
        current.correct
    } else {
        (current.correct + 1) % current.options.len()
    };
    session.dispatch(Action::Select(choice));
    session.dispatch(Action::SubmitAnswer);
    session.dispatch(Action::NextQuestion);
}

#[test]
fn test_shuffle_returns_a_permutation() {
    let mut rng = StdRng::seed_from_u64(42);
    let items: Vec<u32> = (0..30).collect();

    let shuffled = shuffle(&items, &mut rng);

    let mut sorted = shuffled.clone();
    sorted.sort();
    assert_eq!(sorted, items);
    assert_eq!(shuffle::<u32, _>(&[], &mut rng), Vec::<u32>::new());
}

#[test]
fn test_option_shuffle_keeps_correct_answer_text() {
    let items = three_items();

    for seed in 0..20 {
        let mut session = Session::with_seed(seed);
        session.dispatch(Action::Login(UserProfile::local("ivan", Utc::now())));
        start(&mut session, items.clone());

        let current = session.current().unwrap();
        let source = items.iter().find(|i| i.question == current.question).unwrap();
        assert_eq!(Some(current.correct_option()), source.correct_option());

        let mut presented = current.options.clone();
        let mut original = source.options.clone();
        presented.sort();
        original.sort();
        assert_eq!(presented, original);
    }
}

#[test]
fn test_full_run_reaches_grading() {
    let mut session = logged_in();
    start(&mut session, three_items());
    assert_eq!(session.phase(), Phase::Quiz);
    assert_eq!(session.timer(), TimerPhase::Quiz);

    let mut expected_keys = [0u32; 3];
    for right in [true, false, true] {
        let tier = session.current().unwrap().tier;
        if right {
            match tier {
                Tier::Bronze => expected_keys[0] += 1,
                Tier::Silver => expected_keys[1] += 1,
                Tier::Gold => expected_keys[2] += 1,
            }
        }
        answer(&mut session, right);
    }

    assert_eq!(session.phase(), Phase::Essay);
    assert_eq!(session.timer(), TimerPhase::Essay);
    let answers = session.answers();
    assert_eq!(answers.len(), 3);
    assert_eq!(
        answers.iter().map(|a| a.question_index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert_eq!(
        answers.iter().map(|a| a.was_correct).collect::<Vec<_>>(),
        vec![true, false, true]
    );

    let snapshot = session.snapshot();
    assert_eq!(snapshot.score, 2);
    assert_eq!(
        [snapshot.keys.bronze, snapshot.keys.silver, snapshot.keys.gold],
        expected_keys
    );
    assert_eq!(
        snapshot.essay_topic.as_deref(),
        Some("Родината в поезията на Ботев")
    );

    session.dispatch(Action::UpdateEssay(words(MIN_ESSAY_WORDS)));
    let effects = session.dispatch(Action::SubmitEssay { auto: false });

    assert_eq!(session.phase(), Phase::Results);
    assert_eq!(session.timer(), TimerPhase::Idle);
    let request = effects.iter().find_map(|e| match e {
        Effect::RequestGrade { run_id, input } => Some((*run_id, input.clone())),
        _ => None,
    });
    let (run_id, input) = request.expect("grade request");
    assert_eq!(run_id, session.run_id());
    assert_eq!(input.correct, 2);
    assert_eq!(input.total, 3);
    assert_eq!(input.hints_used, 0);
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::GradingPending { summary } if summary.correct == 2 && summary.wrong == 1
    )));
}

#[test]
fn test_short_essay_is_blocked_and_timer_keeps_running() {
    let mut session = logged_in();
    start(&mut session, three_items());
    for _ in 0..3 {
        answer(&mut session, true);
    }

    session.dispatch(Action::UpdateEssay(words(MIN_ESSAY_WORDS - 1)));
    let effects = session.dispatch(Action::SubmitEssay { auto: false });

    assert_eq!(
        effects,
        vec![Effect::Feedback {
            kind: FeedbackKind::Warning,
            message: "⚠️ Есето трябва да е поне 100 думи!".to_string(),
        }]
    );
    assert_eq!(session.phase(), Phase::Essay);
    assert_eq!(session.timer(), TimerPhase::Essay);

    let tick = session.dispatch(Action::Tick(TimerPhase::Essay));
    assert!(tick.contains(&Effect::TimerUpdated {
        phase: TimerPhase::Essay,
        remaining: 299,
    }));
}

#[test]
fn test_essay_timeout_submits_short_essay() {
    let mut session = logged_in();
    start(&mut session, three_items());
    for _ in 0..3 {
        answer(&mut session, false);
    }
    session.dispatch(Action::UpdateEssay(words(5)));

    let mut last = Vec::new();
    for _ in 0..300 {
        last = session.dispatch(Action::Tick(TimerPhase::Essay));
    }

    assert_eq!(session.phase(), Phase::Results);
    assert!(last.iter().any(|e| matches!(
        e,
        Effect::RequestGrade { input, .. } if input.essay == words(5)
    )));
}

#[test]
fn test_hint_counts_and_eliminates_a_wrong_option() {
    let mut session = logged_in();
    start(&mut session, three_items());

    let effects = session.dispatch(Action::ShowHint);
    let current = session.current().unwrap().clone();
    let eliminated = effects.iter().find_map(|e| match e {
        Effect::OptionEliminated { index } => Some(*index),
        _ => None,
    });
    let eliminated = eliminated.expect("one option eliminated");
    assert_ne!(eliminated, current.correct);

    // Eliminated options cannot be chosen
    assert!(session.dispatch(Action::Select(eliminated)).is_empty());

    answer(&mut session, true);
    session.dispatch(Action::ShowHint);
    assert_eq!(session.snapshot().hints_used, 2);
}

#[test]
fn test_stale_grade_is_discarded_after_restart() {
    let mut session = logged_in();
    start(&mut session, three_items());
    session.dispatch(Action::Surrender);
    let first_run = session.run_id();
    start(&mut session, three_items());

    let report = GradeReport {
        result: GradeResult {
            grade: 5.0,
            test_feedback: String::new(),
            thesis_feedback: String::new(),
            comment: String::new(),
        },
        source: GradeSource::Fallback,
    };
    let effects = session.dispatch(Action::GradeReady {
        run_id: first_run,
        report,
    });

    assert!(effects.is_empty());
    assert_eq!(session.phase(), Phase::Quiz);
}
