use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use literature_quiz::{
    config::{ClientConfig, Config, GeminiConfig},
    logging::init_tracing,
    session::FeedbackKind,
    Action, ContentStore, ControllerHandle, Effect, FileStore, GameController, GenerationRequest, KeyValueStore,
    LLMProviderFactory, LLMProviderType, LocalAccounts, MemoryStore, Phase, RewardKeys, Session, TextGenerator, Tier,
};

const HELP: &str = "\
Команди:
  register <име> <парола> <парола>   регистрация
  login <име> <парола>               вход
  logout                             изход
  start                              нова игра
  a <1-4>                            избор на отговор
  submit | next | hint               отговор / следващ въпрос / подсказка
  essay <текст>                      добавя ред към есето
  done                               подаване на есето
  surrender                          предаване
  generate <брой> <bronze|silver|gold> [ключови думи]
  save                               запазва генерирания тест
  status | help | quit";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let mut logging = config.logging.clone();
    logging.console_enabled = false;
    let _guard = init_tracing(&logging, "quiz-cli.log")?;

    let cache: Arc<dyn KeyValueStore> = match &config.client.state_file {
        Some(path) => Arc::new(FileStore::open(path).await?),
        None => Arc::new(MemoryStore::new()),
    };
    let store = ContentStore::open(cache.clone()).await?;
    let accounts = LocalAccounts::new(cache);
    let llm = build_provider(&config.client, &config.gemini);

    let (handle, mut effects, task) = GameController::spawn(Session::new(), store, accounts, llm);

    tokio::spawn(async move {
        while let Some(effect) = effects.recv().await {
            render(&effect);
        }
    });

    println!("БЕЛ матура 10. клас\n{}", HELP);

    let mut essay = String::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "quit" || line == "exit" {
            break;
        }
        if let Err(e) = handle_line(&handle, line, &mut essay).await {
            eprintln!("{}", e);
            break;
        }
    }

    handle.shutdown().ok();
    task.await?;
    Ok(())
}

fn build_provider(client: &ClientConfig, gemini: &GeminiConfig) -> Arc<dyn TextGenerator> {
    let created = match client.provider {
        LLMProviderType::Proxy => LLMProviderFactory::create_provider(
            LLMProviderType::Proxy,
            None,
            client.proxy_base_url.clone(),
            client.proxy_model.clone(),
        ),
        LLMProviderType::Gemini => LLMProviderFactory::create_provider(
            LLMProviderType::Gemini,
            gemini.api_key.clone(),
            gemini.base_url.clone(),
            gemini.model.clone(),
        ),
    };

    created.unwrap_or_else(|e| {
        warn!(error = %e, "Falling back to the proxy relay");
        Arc::new(literature_quiz::ProxyClient::new(
            client.proxy_base_url.clone(),
            client.proxy_model.clone(),
        ))
    })
}

async fn handle_line(handle: &ControllerHandle, line: &str, essay: &mut String) -> Result<()> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(());
    };
    let args: Vec<&str> = parts.collect();

    match (command, args.as_slice()) {
        ("register", [username, password, confirm]) => handle.register(username, password, confirm)?,
        ("login", [username, password]) => handle.login(username, password)?,
        ("logout", []) => handle.logout()?,
        ("start", []) => {
            essay.clear();
            handle.start_game()?
        }
        ("a", [n]) => match n.parse::<usize>() {
            Ok(n) if n >= 1 => handle.dispatch(Action::Select(n - 1))?,
            _ => println!("Невалиден номер на отговор"),
        },
        ("submit", []) => handle.dispatch(Action::SubmitAnswer)?,
        ("next", []) => handle.dispatch(Action::NextQuestion)?,
        ("hint", []) => handle.dispatch(Action::ShowHint)?,
        ("essay", words) if !words.is_empty() => {
            if !essay.is_empty() {
                essay.push('\n');
            }
            essay.push_str(&words.join(" "));
            handle.dispatch(Action::UpdateEssay(essay.clone()))?
        }
        ("done", []) => handle.dispatch(Action::SubmitEssay { auto: false })?,
        ("surrender", []) => handle.dispatch(Action::Surrender)?,
        ("generate", [count, tier, keywords @ ..]) => {
            let (Ok(count), Some(tier)) = (count.parse::<usize>(), Tier::parse(tier)) else {
                println!("Употреба: generate <брой> <bronze|silver|gold> [ключови думи]");
                return Ok(());
            };
            essay.clear();
            handle.generate(GenerationRequest::new(count, tier).with_keywords(&keywords.join(" ")))?
        }
        ("save", []) => handle.save_generated()?,
        ("status", []) => {
            let snapshot = handle.snapshot().await?;
            println!(
                "Фаза: {:?} | въпрос {}/{} | точки {} | ключове {} | подсказки {} | време {}s / есе {}s",
                snapshot.phase,
                (snapshot.position + 1).min(snapshot.total),
                snapshot.total,
                snapshot.score,
                keys_line(&snapshot.keys),
                snapshot.hints_used,
                snapshot.quiz_remaining,
                snapshot.essay_remaining
            );
        }
        ("help", _) => println!("{}", HELP),
        _ => println!("Непозната команда. Напишете help."),
    }
    Ok(())
}

fn keys_line(keys: &RewardKeys) -> String {
    let per_tier: Vec<String> = Tier::ALL
        .iter()
        .map(|tier| format!("{} {}", tier, keys.count(*tier)))
        .collect();
    format!("{} ({})", keys.total(), per_tier.join(", "))
}

fn render(effect: &Effect) {
    match effect {
        Effect::ShowScreen { phase } => match phase {
            Phase::Auth => println!("\n== Вход ==  (register / login)"),
            Phase::Lobby => println!("\n== Начало ==  (start / generate)"),
            Phase::Quiz => println!("\n== Тест =="),
            Phase::Essay => println!("\n== Есе ==  (essay <текст>, после done)"),
            Phase::Results => println!("\n== Резултати =="),
        },
        Effect::Feedback { kind, message } => {
            let marker = match kind {
                FeedbackKind::Info => "ℹ",
                FeedbackKind::Success => "✔",
                FeedbackKind::Warning => "!",
                FeedbackKind::Error => "✘",
            };
            println!("{} {}", marker, message);
        }
        Effect::UserChanged { user: Some(user) } => println!("Здравей, {}!", user.username),
        Effect::QuestionLoaded { question } => {
            println!(
                "\nВъпрос {}/{} [{}]\n{}",
                question.position + 1,
                question.total,
                question.tier,
                question.question
            );
            for (i, option) in question.options.iter().enumerate() {
                println!("  {}) {}", i + 1, option);
            }
        }
        Effect::AnswerRevealed { correct, .. } => println!("Верен отговор: {}", correct + 1),
        Effect::OptionEliminated { index } => println!("Отговор {} е елиминиран", index + 1),
        Effect::TimerUpdated { remaining, .. } if remaining % 60 == 0 => {
            println!("⏱ Остават {} мин.", remaining / 60)
        }
        Effect::EssayTopicChosen { topic } => println!("Тема: {}", topic),
        Effect::WordCount { words } if *words > 0 => println!("Думи: {}", words),
        Effect::GradingPending { summary } => println!(
            "Верни: {} | Грешни: {} | Ключове: {} | Подсказки: {}\nОценява се...",
            summary.correct,
            summary.wrong,
            keys_line(&summary.keys),
            summary.hints_used
        ),
        Effect::GradeShown { report } => println!(
            "Оценка: {}\nТестова част: {}\nЕсе: {}\nОбщ коментар: {}",
            report.result.formatted_grade(),
            report.result.test_feedback,
            report.result.thesis_feedback,
            report.result.comment
        ),
        Effect::GenerationStatus { message, .. } => println!("AI: {}", message),
        Effect::RawContent { content } => println!("--- Отговор на модела ---\n{}\n---", content),
        Effect::AuthError { message } => println!("✘ {}", message),
        _ => {}
    }
}
