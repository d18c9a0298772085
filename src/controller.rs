use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::accounts::{AuthError, LocalAccounts};
use crate::content_generator::{ContentGenerator, GeneratedTest, GenerationError, GenerationRequest};
use crate::content_store::ContentStore;
use crate::grading::GradingEngine;
use crate::llm_providers::TextGenerator;
use crate::models::{GradeInput, GradeReport, UserProfile};
use crate::session::{Action, Effect, Session, SessionSnapshot};
use crate::timer::{PhaseTimer, Tick};

/// Requests a front end can make of the controller
#[derive(Debug)]
pub enum Command {
    Session(Action),
    StartGame,
    Generate(GenerationRequest),
    SaveGenerated,
    Register {
        username: String,
        password: String,
        confirm: String,
    },
    Login {
        username: String,
        password: String,
    },
    Logout,
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Shutdown,
}

/// Results of work spawned off the controller task
#[derive(Debug)]
enum Completion {
    Generated(Result<GeneratedTest, GenerationError>),
    Graded { run_id: u64, report: GradeReport },
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("the game controller has stopped")]
pub struct ControllerClosed;

/// Cloneable sender side of a running controller
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl ControllerHandle {
    pub fn send(&self, command: Command) -> Result<(), ControllerClosed> {
        self.commands.send(command).map_err(|_| ControllerClosed)
    }

    pub fn dispatch(&self, action: Action) -> Result<(), ControllerClosed> {
        self.send(Command::Session(action))
    }

    pub fn start_game(&self) -> Result<(), ControllerClosed> {
        self.send(Command::StartGame)
    }

    pub fn generate(&self, request: GenerationRequest) -> Result<(), ControllerClosed> {
        self.send(Command::Generate(request))
    }

    pub fn save_generated(&self) -> Result<(), ControllerClosed> {
        self.send(Command::SaveGenerated)
    }

    pub fn register(&self, username: &str, password: &str, confirm: &str) -> Result<(), ControllerClosed> {
        self.send(Command::Register {
            username: username.to_string(),
            password: password.to_string(),
            confirm: confirm.to_string(),
        })
    }

    pub fn login(&self, username: &str, password: &str) -> Result<(), ControllerClosed> {
        self.send(Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn logout(&self) -> Result<(), ControllerClosed> {
        self.send(Command::Logout)
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, ControllerClosed> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx))?;
        rx.await.map_err(|_| ControllerClosed)
    }

    pub fn shutdown(&self) -> Result<(), ControllerClosed> {
        self.send(Command::Shutdown)
    }
}

/// Single owner of the session, the content store and the countdown.
/// Commands, timer ticks and network completions are handled one at a time.
pub struct GameController {
    session: Session,
    store: ContentStore,
    accounts: LocalAccounts,
    generator: ContentGenerator,
    grader: GradingEngine,
    timer: PhaseTimer,
    effects: mpsc::UnboundedSender<Effect>,
    ticks: mpsc::UnboundedSender<Tick>,
    completions: mpsc::UnboundedSender<Completion>,
    generating: bool,
    grading_run: Option<u64>,
    last_generated: Option<GeneratedTest>,
}

impl GameController {
    /// Starts the event loop on the current runtime
    pub fn spawn(
        session: Session,
        store: ContentStore,
        accounts: LocalAccounts,
        llm: Arc<dyn TextGenerator>,
    ) -> (ControllerHandle, mpsc::UnboundedReceiver<Effect>, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (effect_tx, effect_rx) = mpsc::unbounded_channel();
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        let controller = GameController {
            session,
            store,
            accounts,
            generator: ContentGenerator::new(llm.clone()),
            grader: GradingEngine::new(llm),
            timer: PhaseTimer::default(),
            effects: effect_tx,
            ticks: tick_tx,
            completions: completion_tx,
            generating: false,
            grading_run: None,
            last_generated: None,
        };

        let task = tokio::spawn(controller.run(command_rx, tick_rx, completion_rx));
        (ControllerHandle { commands: command_tx }, effect_rx, task)
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut ticks: mpsc::UnboundedReceiver<Tick>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        crate::log_system_event!(startup, component = "controller", "game controller running");

        match self.accounts.restore().await {
            Ok(Some(user)) => self.apply(Action::Login(user)),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Could not restore remembered user"),
        }

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                Some(tick) = ticks.recv() => self.tick(tick),
                Some(done) = completions.recv() => self.handle_completion(done),
            }
        }

        self.timer.stop();
        crate::log_system_event!(shutdown, component = "controller", "game controller stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Session(action) => self.apply(action),
            Command::StartGame => self.start_game(),
            Command::Generate(request) => self.generate(request),
            Command::SaveGenerated => self.save_generated().await,
            Command::Register {
                username,
                password,
                confirm,
            } => {
                let result = self.accounts.register(&username, &password, &confirm).await;
                self.signed_in(result);
            }
            Command::Login { username, password } => {
                let result = self.accounts.login(&username, &password).await;
                self.signed_in(result);
            }
            Command::Logout => {
                if let Err(e) = self.accounts.logout().await {
                    warn!(error = %e, "Could not forget remembered user");
                }
                self.apply(Action::Logout);
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.session.snapshot());
            }
            Command::Shutdown => {}
        }
    }

    fn signed_in(&mut self, result: Result<UserProfile, AuthError>) {
        match result {
            Ok(user) => self.apply(Action::Login(user)),
            Err(e) => self.emit(Effect::AuthError {
                message: e.to_string(),
            }),
        }
    }

    fn tick(&mut self, tick: Tick) {
        if !self.timer.is_current(&tick) {
            debug!(
                tick_epoch = tick.epoch,
                tick_phase = ?tick.phase,
                active_phase = ?self.timer.phase(),
                "Dropping tick from a stopped countdown"
            );
            return;
        }
        self.apply(Action::Tick(tick.phase));
    }

    fn start_game(&mut self) {
        let items = self.store.items().to_vec();
        let topics = self.store.topics().to_vec();
        self.apply(Action::StartGame { items, topics });
    }

    /// Runs the session and carries out the effects that need the controller
    fn apply(&mut self, action: Action) {
        for effect in self.session.dispatch(action) {
            match &effect {
                Effect::StartTimer { phase } => self.timer.start(*phase, self.ticks.clone()),
                Effect::StopTimers => self.timer.stop(),
                Effect::RequestGrade { run_id, input } => self.request_grade(*run_id, input.clone()),
                _ => {}
            }
            self.emit(effect);
        }
    }

    fn request_grade(&mut self, run_id: u64, input: GradeInput) {
        if self.grading_run == Some(run_id) {
            debug!(run_id, "Grade already requested for this run");
            return;
        }
        self.grading_run = Some(run_id);

        let grader = self.grader.clone();
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let report = grader.grade(&input).await;
            let _ = completions.send(Completion::Graded { run_id, report });
        });
    }

    fn generate(&mut self, request: GenerationRequest) {
        if self.generating {
            self.generation_failed(GenerationError::AlreadyRunning);
            return;
        }
        if let Err(e) = request.validate() {
            self.generation_failed(e);
            return;
        }

        self.generating = true;
        self.emit(Effect::GenerationStatus {
            message: "Генерирам тест… Моля изчакайте.".to_string(),
            warning: false,
        });

        let generator = self.generator.clone();
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = generator.generate(&request).await;
            let _ = completions.send(Completion::Generated(result));
        });
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Graded { run_id, report } => {
                if self.grading_run == Some(run_id) {
                    self.grading_run = None;
                }
                self.apply(Action::GradeReady { run_id, report });
            }
            Completion::Generated(result) => {
                self.generating = false;
                match result {
                    Ok(test) => self.generated(test),
                    Err(e) => self.generation_failed(e),
                }
            }
        }
    }

    fn generated(&mut self, test: GeneratedTest) {
        info!(
            title = %test.title,
            item_count = test.items.len(),
            "Replacing catalog with generated test"
        );

        self.emit(Effect::GenerationStatus {
            message: test.reconciliation.status_message(),
            warning: test.reconciliation.is_warning(),
        });

        self.store.replace_all(test.items.clone());
        if let Some(topic) = &test.essay_topic {
            self.store.replace_topics(vec![topic.clone()]);
        }
        self.last_generated = Some(test);
        self.start_game();
    }

    fn generation_failed(&mut self, err: GenerationError) {
        warn!(error = %err, "Test generation failed");
        self.emit(Effect::GenerationStatus {
            message: err.user_message(),
            warning: true,
        });
        if let Some(raw) = err.raw_content() {
            self.emit(Effect::RawContent {
                content: raw.to_string(),
            });
        }
    }

    async fn save_generated(&mut self) {
        let Some(test) = self.last_generated.take() else {
            self.emit(Effect::GenerationStatus {
                message: "Няма генериран тест за запазване.".to_string(),
                warning: true,
            });
            return;
        };

        match self.store.append(test.items.clone()).await {
            Ok(()) => self.emit(Effect::GenerationStatus {
                message: "Тестът и въпросите са запазени локално.".to_string(),
                warning: false,
            }),
            Err(e) => {
                error!(error = %e, "Saving generated test failed");
                self.emit(Effect::GenerationStatus {
                    message: format!("Грешка при записване: {}", e),
                    warning: true,
                });
                self.last_generated = Some(test);
            }
        }
    }

    fn emit(&self, effect: Effect) {
        if self.effects.send(effect).is_err() {
            debug!("Effect receiver dropped");
        }
    }
}
