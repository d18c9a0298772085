use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog;
use crate::grading::word_count;
use crate::models::{AnswerRecord, GradeInput, GradeReport, QuizItem, RewardKeys, Tier, UserProfile};

pub const QUIZ_DURATION_SECS: u32 = 1800;
pub const ESSAY_DURATION_SECS: u32 = 300;
pub const MIN_ESSAY_WORDS: usize = 100;

const QUIZ_WARNINGS: [(u32, &str); 2] = [
    (300, "⚠️ Остават само 5 минути!"),
    (60, "⚠️ Остава само 1 минута!"),
];
const ESSAY_WARNING: (u32, &str) = (60, "⚠️ Остава само 1 минута за есето!");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Auth,
    Lobby,
    Quiz,
    Essay,
    Results,
}

/// Which countdown, if any, is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Quiz,
    Essay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Info,
    Success,
    Warning,
    Error,
}

/// A quiz item as shown to the player, with its options already shuffled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentedQuestion {
    pub position: usize,
    pub total: usize,
    pub question: String,
    pub options: Vec<String>,
    pub correct: usize,
    pub tier: Tier,
    pub explanation: String,
}

impl PresentedQuestion {
    fn from_item<R: Rng + ?Sized>(item: &QuizItem, position: usize, total: usize, rng: &mut R) -> Self {
        let options = shuffle(&item.options, rng);
        let correct_text = item.correct_option().unwrap_or_default();
        let correct = options
            .iter()
            .position(|o| o == correct_text)
            .unwrap_or(0);

        Self {
            position,
            total,
            question: item.question.clone(),
            options,
            correct,
            tier: item.tier,
            explanation: item.explanation.clone(),
        }
    }

    pub fn correct_option(&self) -> &str {
        self.options.get(self.correct).map(String::as_str).unwrap_or_default()
    }
}

/// Counters reported alongside the grade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub correct: usize,
    pub wrong: usize,
    pub total: usize,
    pub keys: RewardKeys,
    pub hints_used: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Login(UserProfile),
    Logout,
    StartGame { items: Vec<QuizItem>, topics: Vec<String> },
    Select(usize),
    SubmitAnswer,
    NextQuestion,
    ShowHint,
    UpdateEssay(String),
    SubmitEssay { auto: bool },
    Tick(TimerPhase),
    Surrender,
    GradeReady { run_id: u64, report: GradeReport },
}

/// Everything a front end needs to render; the controller also emits the
/// generation and account notices through this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    ShowScreen { phase: Phase },
    StartTimer { phase: TimerPhase },
    StopTimers,
    Feedback { kind: FeedbackKind, message: String },
    UserChanged { user: Option<UserProfile> },
    QuestionLoaded { question: PresentedQuestion },
    OptionSelected { index: usize },
    AnswerRevealed { selected: usize, correct: usize, was_correct: bool },
    OptionEliminated { index: usize },
    KeysUpdated { keys: RewardKeys, score: usize },
    TimerUpdated { phase: TimerPhase, remaining: u32 },
    EssayTopicChosen { topic: String },
    WordCount { words: usize },
    GradingPending { summary: RunSummary },
    RequestGrade { run_id: u64, input: GradeInput },
    GradeShown { report: GradeReport },
    GenerationStatus { message: String, warning: bool },
    RawContent { content: String },
    AuthError { message: String },
}

fn feedback(kind: FeedbackKind, message: impl Into<String>) -> Effect {
    Effect::Feedback {
        kind,
        message: message.into(),
    }
}

/// Read-only view of the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub user: Option<UserProfile>,
    pub run_id: u64,
    pub position: usize,
    pub total: usize,
    pub score: usize,
    pub keys: RewardKeys,
    pub hints_used: u32,
    pub quiz_remaining: u32,
    pub essay_remaining: u32,
    pub timer: TimerPhase,
    pub current: Option<PresentedQuestion>,
    pub selected: Option<usize>,
    pub locked: bool,
    pub eliminated: Vec<usize>,
    pub answers: Vec<AnswerRecord>,
    pub essay_topic: Option<String>,
    pub essay_words: usize,
    pub grading: bool,
    pub grade: Option<GradeReport>,
}

/// Fisher–Yates shuffle into a new vector; the input is left untouched
pub fn shuffle<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut shuffled = items.to_vec();
    for i in (1..shuffled.len()).rev() {
        let j = rng.gen_range(0..=i);
        shuffled.swap(i, j);
    }
    shuffled
}

/// The quiz state machine. Every mutation goes through [`Session::dispatch`],
/// which returns the effects for the front end and the timer owner.
pub struct Session {
    rng: StdRng,
    phase: Phase,
    user: Option<UserProfile>,
    run_id: u64,
    deck: Vec<QuizItem>,
    topics: Vec<String>,
    position: usize,
    current: Option<PresentedQuestion>,
    selected: Option<usize>,
    locked: bool,
    hint_used_here: bool,
    eliminated: Vec<usize>,
    score: usize,
    keys: RewardKeys,
    hints_used: u32,
    quiz_remaining: u32,
    essay_remaining: u32,
    timer: TimerPhase,
    answers: Vec<AnswerRecord>,
    essay: String,
    essay_topic: Option<String>,
    grading: bool,
    grade: Option<GradeReport>,
}

impl Default for Session {
    fn default() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            phase: Phase::Auth,
            user: None,
            run_id: 0,
            deck: Vec::new(),
            topics: Vec::new(),
            position: 0,
            current: None,
            selected: None,
            locked: false,
            hint_used_here: false,
            eliminated: Vec::new(),
            score: 0,
            keys: RewardKeys::default(),
            hints_used: 0,
            quiz_remaining: QUIZ_DURATION_SECS,
            essay_remaining: ESSAY_DURATION_SECS,
            timer: TimerPhase::Idle,
            answers: Vec::new(),
            essay: String::new(),
            essay_topic: None,
            grading: false,
            grade: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn timer(&self) -> TimerPhase {
        self.timer
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    pub fn current(&self) -> Option<&PresentedQuestion> {
        self.current.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            user: self.user.clone(),
            run_id: self.run_id,
            position: self.position,
            total: self.deck.len(),
            score: self.score,
            keys: self.keys,
            hints_used: self.hints_used,
            quiz_remaining: self.quiz_remaining,
            essay_remaining: self.essay_remaining,
            timer: self.timer,
            current: self.current.clone(),
            selected: self.selected,
            locked: self.locked,
            eliminated: self.eliminated.clone(),
            answers: self.answers.clone(),
            essay_topic: self.essay_topic.clone(),
            essay_words: word_count(&self.essay),
            grading: self.grading,
            grade: self.grade.clone(),
        }
    }

    pub fn dispatch(&mut self, action: Action) -> Vec<Effect> {
        debug!(phase = ?self.phase, action = action_name(&action), "Dispatching session action");

        match action {
            Action::Login(user) => self.login(user),
            Action::Logout => self.logout(),
            Action::StartGame { items, topics } => self.start_game(items, topics),
            Action::Select(index) => self.select(index),
            Action::SubmitAnswer => self.submit_answer(),
            Action::NextQuestion => self.next_question(),
            Action::ShowHint => self.show_hint(),
            Action::UpdateEssay(text) => self.update_essay(text),
            Action::SubmitEssay { auto } => self.submit_essay(auto),
            Action::Tick(phase) => self.tick(phase),
            Action::Surrender => self.surrender(),
            Action::GradeReady { run_id, report } => self.grade_ready(run_id, report),
        }
    }

    fn login(&mut self, user: UserProfile) -> Vec<Effect> {
        crate::log_session_event!("login", username = user.username);
        let mut effects = Vec::new();
        self.user = Some(user.clone());
        effects.push(Effect::UserChanged { user: Some(user) });
        if self.phase == Phase::Auth {
            self.phase = Phase::Lobby;
            effects.push(Effect::ShowScreen { phase: Phase::Lobby });
        }
        effects
    }

    fn logout(&mut self) -> Vec<Effect> {
        crate::log_session_event!("logout", run_id = self.run_id);
        let mut effects = self.stop_timers();
        self.reset_run();
        self.user = None;
        self.phase = Phase::Auth;
        effects.push(Effect::UserChanged { user: None });
        effects.push(Effect::ShowScreen { phase: Phase::Auth });
        effects
    }

    fn start_game(&mut self, items: Vec<QuizItem>, topics: Vec<String>) -> Vec<Effect> {
        if self.phase == Phase::Auth {
            return vec![feedback(FeedbackKind::Warning, "Моля, влезте в профила си!")];
        }
        if items.is_empty() {
            return vec![feedback(FeedbackKind::Warning, "Няма налични въпроси за игра.")];
        }

        let mut effects = self.stop_timers();
        self.reset_run();
        self.run_id += 1;
        self.deck = shuffle(&items, &mut self.rng);
        self.topics = if topics.is_empty() { catalog::default_topics() } else { topics };
        self.phase = Phase::Quiz;
        self.quiz_remaining = QUIZ_DURATION_SECS;

        info!(run_id = self.run_id, item_count = self.deck.len(), "Starting quiz run");

        effects.push(Effect::ShowScreen { phase: Phase::Quiz });
        effects.push(self.keys_effect());
        effects.extend(self.start_timer(TimerPhase::Quiz));
        effects.extend(self.load_question());
        effects
    }

    fn load_question(&mut self) -> Vec<Effect> {
        let Some(item) = self.deck.get(self.position) else {
            return Vec::new();
        };
        let question = PresentedQuestion::from_item(item, self.position, self.deck.len(), &mut self.rng);
        self.current = Some(question.clone());
        self.selected = None;
        self.locked = false;
        self.hint_used_here = false;
        self.eliminated.clear();
        vec![Effect::QuestionLoaded { question }]
    }

    fn select(&mut self, index: usize) -> Vec<Effect> {
        let Some(current) = &self.current else {
            return Vec::new();
        };
        if self.phase != Phase::Quiz
            || self.locked
            || index >= current.options.len()
            || self.eliminated.contains(&index)
        {
            return Vec::new();
        }
        self.selected = Some(index);
        vec![Effect::OptionSelected { index }]
    }

    fn submit_answer(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Quiz || self.locked {
            return Vec::new();
        }
        let Some(current) = self.current.clone() else {
            return Vec::new();
        };
        let Some(selected) = self.selected else {
            return vec![feedback(FeedbackKind::Warning, "Моля, изберете отговор!")];
        };

        let was_correct = selected == current.correct;
        if was_correct {
            self.score += 1;
            self.keys.award(current.tier);
        }
        self.answers.push(AnswerRecord {
            question_index: self.position,
            selected_index: selected,
            correct_index: current.correct,
            was_correct,
        });
        self.locked = true;

        let (kind, prefix) = if was_correct {
            (FeedbackKind::Success, "Правилно! ")
        } else {
            (FeedbackKind::Error, "Грешно! ")
        };

        vec![
            Effect::AnswerRevealed {
                selected,
                correct: current.correct,
                was_correct,
            },
            self.keys_effect(),
            feedback(kind, format!("{}{}", prefix, current.explanation)),
        ]
    }

    fn next_question(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Quiz {
            return Vec::new();
        }
        if !self.locked {
            return vec![feedback(FeedbackKind::Warning, "Моля, първо отговорете на въпроса!")];
        }

        self.position += 1;
        if self.position < self.deck.len() {
            return self.load_question();
        }

        self.current = None;
        self.enter_essay()
    }

    fn enter_essay(&mut self) -> Vec<Effect> {
        let mut effects = self.stop_timers();
        let topic = self
            .topics
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_default();

        crate::log_session_event!("essay_started", run_id = self.run_id);

        self.phase = Phase::Essay;
        self.essay.clear();
        self.essay_topic = Some(topic.clone());
        self.essay_remaining = ESSAY_DURATION_SECS;

        effects.push(Effect::ShowScreen { phase: Phase::Essay });
        effects.push(Effect::EssayTopicChosen { topic });
        effects.push(Effect::WordCount { words: 0 });
        effects.extend(self.start_timer(TimerPhase::Essay));
        effects
    }

    fn show_hint(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Quiz || self.locked {
            return Vec::new();
        }
        let Some(current) = self.current.clone() else {
            return vec![feedback(FeedbackKind::Error, "Грешка: Няма активен въпрос")];
        };
        if self.hint_used_here {
            return vec![feedback(FeedbackKind::Warning, "Вече използвахте подсказка за този въпрос!")];
        }

        let answer = current.correct_option();
        let first = answer.chars().next().map(String::from).unwrap_or_default();
        let message = format!(
            "💡 Подсказка: Правилният отговор започва с \"{}\" и има {} букви",
            first,
            answer.chars().count()
        );

        self.hint_used_here = true;
        self.hints_used += 1;

        let mut effects = vec![feedback(FeedbackKind::Info, message)];

        let wrong: Vec<usize> = (0..current.options.len())
            .filter(|i| *i != current.correct && !self.eliminated.contains(i))
            .collect();
        if let Some(&index) = wrong.choose(&mut self.rng) {
            self.eliminated.push(index);
            if self.selected == Some(index) {
                self.selected = None;
            }
            effects.push(Effect::OptionEliminated { index });
        }
        effects
    }

    fn update_essay(&mut self, text: String) -> Vec<Effect> {
        if self.phase != Phase::Essay {
            return Vec::new();
        }
        self.essay = text;
        vec![Effect::WordCount {
            words: word_count(&self.essay),
        }]
    }

    fn submit_essay(&mut self, auto: bool) -> Vec<Effect> {
        if self.phase != Phase::Essay {
            return Vec::new();
        }

        let words = word_count(&self.essay);
        if !auto && words < MIN_ESSAY_WORDS {
            return vec![feedback(FeedbackKind::Warning, "⚠️ Есето трябва да е поне 100 думи!")];
        }

        let mut effects = vec![if auto {
            feedback(FeedbackKind::Warning, "⏰ Времето изтече! Есето е подадено автоматично.")
        } else {
            feedback(FeedbackKind::Success, "✅ Есето е подадено успешно!")
        }];
        effects.extend(self.finish());
        effects
    }

    fn tick(&mut self, phase: TimerPhase) -> Vec<Effect> {
        if phase == TimerPhase::Idle || phase != self.timer {
            debug!(tick = ?phase, active = ?self.timer, "Ignoring stale timer tick");
            return Vec::new();
        }

        match phase {
            TimerPhase::Quiz => {
                self.quiz_remaining = self.quiz_remaining.saturating_sub(1);
                let remaining = self.quiz_remaining;
                let mut effects = vec![Effect::TimerUpdated { phase, remaining }];
                if let Some((_, message)) = QUIZ_WARNINGS.iter().find(|(at, _)| *at == remaining) {
                    effects.push(feedback(FeedbackKind::Warning, *message));
                }
                if remaining == 0 {
                    effects.push(feedback(
                        FeedbackKind::Error,
                        "⏰ Времето изтече! Играта приключва автоматично.",
                    ));
                    effects.extend(self.finish());
                }
                effects
            }
            TimerPhase::Essay => {
                self.essay_remaining = self.essay_remaining.saturating_sub(1);
                let remaining = self.essay_remaining;
                let mut effects = vec![Effect::TimerUpdated { phase, remaining }];
                if remaining == ESSAY_WARNING.0 {
                    effects.push(feedback(FeedbackKind::Warning, ESSAY_WARNING.1));
                }
                if remaining == 0 {
                    effects.extend(self.submit_essay(true));
                }
                effects
            }
            TimerPhase::Idle => Vec::new(),
        }
    }

    /// Quiz or essay is over: stop the clocks and ask for a grade
    fn finish(&mut self) -> Vec<Effect> {
        let mut effects = self.stop_timers();
        self.phase = Phase::Results;
        self.current = None;
        self.grading = true;
        self.grade = None;

        let total = self.deck.len();
        let summary = RunSummary {
            correct: self.score,
            wrong: total.saturating_sub(self.score),
            total,
            keys: self.keys,
            hints_used: self.hints_used,
        };
        let input = GradeInput {
            correct: self.score,
            total,
            essay: self.essay.clone(),
            hints_used: self.hints_used,
        };

        info!(
            run_id = self.run_id,
            score = self.score,
            total = total,
            hints_used = self.hints_used,
            "Run finished, requesting grade"
        );

        effects.push(Effect::ShowScreen { phase: Phase::Results });
        effects.push(Effect::GradingPending { summary });
        effects.push(Effect::RequestGrade {
            run_id: self.run_id,
            input,
        });
        effects
    }

    fn surrender(&mut self) -> Vec<Effect> {
        if !matches!(self.phase, Phase::Quiz | Phase::Essay) {
            return Vec::new();
        }
        crate::log_session_event!("surrender", run_id = self.run_id);

        let mut effects = self.stop_timers();
        self.reset_run();
        self.phase = Phase::Lobby;
        effects.push(feedback(
            FeedbackKind::Info,
            "Предадохте играта. Връщате се към началния екран.",
        ));
        effects.push(Effect::ShowScreen { phase: Phase::Lobby });
        effects
    }

    fn grade_ready(&mut self, run_id: u64, report: GradeReport) -> Vec<Effect> {
        if run_id != self.run_id || self.phase != Phase::Results || !self.grading {
            debug!(run_id, current_run = self.run_id, "Discarding grade for a finished run");
            return Vec::new();
        }
        self.grading = false;
        self.grade = Some(report.clone());
        vec![Effect::GradeShown { report }]
    }

    fn start_timer(&mut self, phase: TimerPhase) -> Vec<Effect> {
        self.timer = phase;
        let remaining = match phase {
            TimerPhase::Quiz => self.quiz_remaining,
            TimerPhase::Essay => self.essay_remaining,
            TimerPhase::Idle => 0,
        };
        vec![
            Effect::StartTimer { phase },
            Effect::TimerUpdated { phase, remaining },
        ]
    }

    /// Idempotent: nothing is emitted when no countdown runs
    fn stop_timers(&mut self) -> Vec<Effect> {
        if self.timer == TimerPhase::Idle {
            return Vec::new();
        }
        self.timer = TimerPhase::Idle;
        vec![Effect::StopTimers]
    }

    fn reset_run(&mut self) {
        self.deck.clear();
        self.position = 0;
        self.current = None;
        self.selected = None;
        self.locked = false;
        self.hint_used_here = false;
        self.eliminated.clear();
        self.score = 0;
        self.keys = RewardKeys::default();
        self.hints_used = 0;
        self.quiz_remaining = QUIZ_DURATION_SECS;
        self.essay_remaining = ESSAY_DURATION_SECS;
        self.answers.clear();
        self.essay.clear();
        self.essay_topic = None;
        self.grading = false;
        self.grade = None;
    }

    fn keys_effect(&self) -> Effect {
        Effect::KeysUpdated {
            keys: self.keys,
            score: self.score,
        }
    }
}

fn action_name(action: &Action) -> &'static str {
    match action {
        Action::Login(_) => "login",
        Action::Logout => "logout",
        Action::StartGame { .. } => "start_game",
        Action::Select(_) => "select",
        Action::SubmitAnswer => "submit_answer",
        Action::NextQuestion => "next_question",
        Action::ShowHint => "show_hint",
        Action::UpdateEssay(_) => "update_essay",
        Action::SubmitEssay { .. } => "submit_essay",
        Action::Tick(_) => "tick",
        Action::Surrender => "surrender",
        Action::GradeReady { .. } => "grade_ready",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn logged_in(seed: u64) -> Session {
        let mut session = Session::with_seed(seed);
        session.dispatch(Action::Login(UserProfile::local("ivan", Utc::now())));
        session
    }

    fn started(seed: u64) -> Session {
        let mut session = logged_in(seed);
        session.dispatch(Action::StartGame {
            items: catalog::default_items(),
            topics: catalog::default_topics(),
        });
        session
    }

    #[test]
    fn test_login_moves_to_lobby() {
        let session = logged_in(1);
        assert_eq!(session.phase(), Phase::Lobby);
        assert_eq!(session.user().map(|u| u.username.as_str()), Some("ivan"));
    }

    #[test]
    fn test_start_requires_user_and_items() {
        let mut session = Session::with_seed(1);
        let effects = session.dispatch(Action::StartGame {
            items: catalog::default_items(),
            topics: Vec::new(),
        });
        assert_eq!(session.phase(), Phase::Auth);
        assert!(matches!(effects[0], Effect::Feedback { kind: FeedbackKind::Warning, .. }));

        let mut session = logged_in(1);
        session.dispatch(Action::StartGame {
            items: Vec::new(),
            topics: Vec::new(),
        });
        assert_eq!(session.phase(), Phase::Lobby);
    }

    #[test]
    fn test_start_game_resets_and_starts_quiz_timer() {
        let mut session = started(7);
        let snapshot = session.snapshot();

        assert_eq!(snapshot.phase, Phase::Quiz);
        assert_eq!(snapshot.total, 30);
        assert_eq!(snapshot.quiz_remaining, QUIZ_DURATION_SECS);
        assert_eq!(snapshot.timer, TimerPhase::Quiz);
        assert!(snapshot.current.is_some());

        session.dispatch(Action::Tick(TimerPhase::Quiz));
        let restart = session.dispatch(Action::StartGame {
            items: catalog::default_items(),
            topics: Vec::new(),
        });
        assert_eq!(restart[0], Effect::StopTimers);
        assert_eq!(session.snapshot().quiz_remaining, QUIZ_DURATION_SECS);
        assert_eq!(session.run_id(), 2);
    }

    #[test]
    fn test_submit_without_selection_warns() {
        let mut session = started(3);
        let effects = session.dispatch(Action::SubmitAnswer);
        assert_eq!(
            effects,
            vec![feedback(FeedbackKind::Warning, "Моля, изберете отговор!")]
        );
        assert!(!session.snapshot().locked);
    }

    #[test]
    fn test_locked_question_ignores_selection_and_hint() {
        let mut session = started(5);
        let correct = session.current().unwrap().correct;
        session.dispatch(Action::Select(correct));
        session.dispatch(Action::SubmitAnswer);

        assert!(session.dispatch(Action::Select((correct + 1) % 4)).is_empty());
        assert!(session.dispatch(Action::ShowHint).is_empty());
        assert!(session.dispatch(Action::SubmitAnswer).is_empty());
        assert_eq!(session.answers().len(), 1);
    }

    #[test]
    fn test_next_requires_answer() {
        let mut session = started(9);
        let effects = session.dispatch(Action::NextQuestion);
        assert!(matches!(effects[0], Effect::Feedback { kind: FeedbackKind::Warning, .. }));
        assert_eq!(session.snapshot().position, 0);
    }

    #[test]
    fn test_hint_once_per_question() {
        let mut session = started(11);
        let current = session.current().unwrap().clone();

        let effects = session.dispatch(Action::ShowHint);
        let Effect::Feedback { message, .. } = &effects[0] else {
            panic!("expected hint feedback");
        };
        let answer = current.correct_option();
        assert!(message.contains(&answer.chars().next().unwrap().to_string()));
        assert!(message.contains(&format!("има {} букви", answer.chars().count())));

        let Effect::OptionEliminated { index } = effects[1] else {
            panic!("expected elimination");
        };
        assert_ne!(index, current.correct);
        assert!(session.dispatch(Action::Select(index)).is_empty());

        session.dispatch(Action::ShowHint);
        assert_eq!(session.snapshot().hints_used, 1);
        assert_eq!(session.snapshot().eliminated.len(), 1);
    }

    #[test]
    fn test_quiz_timeout_skips_essay() {
        let mut session = started(13);
        let mut warnings = Vec::new();
        let mut last = Vec::new();
        for _ in 0..QUIZ_DURATION_SECS {
            last = session.dispatch(Action::Tick(TimerPhase::Quiz));
            warnings.extend(last.iter().filter_map(|e| match e {
                Effect::Feedback { kind: FeedbackKind::Warning, message } => Some(message.clone()),
                _ => None,
            }));
        }

        assert_eq!(warnings, vec!["⚠️ Остават само 5 минути!", "⚠️ Остава само 1 минута!"]);
        assert_eq!(session.phase(), Phase::Results);
        assert_eq!(session.timer(), TimerPhase::Idle);
        assert!(last.iter().any(|e| matches!(e, Effect::RequestGrade { run_id: 1, .. })));
    }

    #[test]
    fn test_stale_ticks_are_ignored() {
        let mut session = started(17);
        assert!(session.dispatch(Action::Tick(TimerPhase::Essay)).is_empty());
        assert_eq!(session.snapshot().essay_remaining, ESSAY_DURATION_SECS);
    }

    #[test]
    fn test_surrender_returns_to_lobby() {
        let mut session = started(19);
        let effects = session.dispatch(Action::Surrender);

        assert_eq!(effects[0], Effect::StopTimers);
        assert_eq!(session.phase(), Phase::Lobby);
        assert_eq!(session.snapshot().total, 0);
        assert!(session.dispatch(Action::Surrender).is_empty());
    }

    #[test]
    fn test_logout_clears_user() {
        let mut session = started(23);
        session.dispatch(Action::Logout);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, Phase::Auth);
        assert!(snapshot.user.is_none());
        assert_eq!(snapshot.timer, TimerPhase::Idle);
    }

    #[test]
    fn test_shuffle_of_empty_and_single() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(shuffle::<u8, _>(&[], &mut rng).is_empty());
        assert_eq!(shuffle(&[42], &mut rng), vec![42]);
    }
}
