use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{QuizSettings, UserId};
use services::{
    AppServices, AttemptStats, AttemptStatus, BeginOutcome, Clock, QuizDriver, SessionError, SessionNotice,
    SessionPhase, SessionSnapshot, SharedIdentity,
};
use storage::repository::Storage;
use storage::rest::RestConfig;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

type Input = Lines<BufReader<Stdin>>;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidUserId { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidUserId { raw } => {
                write!(f, "invalid --user value (expected UUID): {raw}")
            }
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn env_number<T: std::str::FromStr>(
    key: &str,
    flag: &'static str,
    default: T,
) -> Result<T, ArgsError> {
    match std::env::var(key) {
        Ok(raw) => parse_number(flag, raw),
        Err(_) => Ok(default),
    }
}

fn user_id_from_env(raw: Option<String>) -> Result<Option<UserId>, ArgsError> {
    raw.map(|raw| {
        raw.trim()
            .parse::<UserId>()
            .map_err(|_| ArgsError::InvalidUserId { raw: raw.clone() })
    })
    .transpose()
}

struct Args {
    db_url: String,
    rest: Option<RestConfig>,
    user_id: Option<UserId>,
    question_limit: u32,
    reveal_ms: u64,
    history_limit: u32,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| "sqlite:quiz.sqlite3?mode=rwc".into());
        let mut user_id = user_id_from_env(std::env::var("QUIZ_USER_ID").ok())?;
        let mut question_limit = env_number(
            "QUIZ_QUESTION_LIMIT",
            "--limit",
            QuizSettings::DEFAULT_QUESTION_LIMIT,
        )?;
        let mut reveal_ms = env_number(
            "QUIZ_REVEAL_MS",
            "--reveal-ms",
            QuizSettings::DEFAULT_REVEAL_DWELL_MS,
        )?;
        let mut history_limit = env_number(
            "QUIZ_HISTORY_LIMIT",
            "--history",
            QuizSettings::DEFAULT_HISTORY_LIMIT,
        )?;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--user" => {
                    let value = require_value(args, "--user")?;
                    let parsed = value
                        .parse::<UserId>()
                        .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?;
                    user_id = Some(parsed);
                }
                "--limit" => {
                    question_limit = parse_number("--limit", require_value(args, "--limit")?)?;
                }
                "--reveal-ms" => {
                    reveal_ms = parse_number("--reveal-ms", require_value(args, "--reveal-ms")?)?;
                }
                "--history" => {
                    history_limit = parse_number("--history", require_value(args, "--history")?)?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            rest: RestConfig::from_env(),
            user_id,
            question_limit,
            reveal_ms,
            history_limit,
        })
    }

    fn settings(&self) -> Result<QuizSettings, quiz_core::model::SettingsError> {
        QuizSettings::new(
            self.question_limit,
            Duration::from_millis(self.reveal_ms),
            self.history_limit,
        )
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>     SQLite URL (default: sqlite:quiz.sqlite3?mode=rwc)");
    eprintln!("  --user <uuid>         Signed-in player");
    eprintln!("  --limit <n>           Questions per quiz (default: 10)");
    eprintln!("  --reveal-ms <ms>      How long each answer stays revealed (default: 1500)");
    eprintln!("  --history <n>         Past attempts to list (default: 5)");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_USER_ID, QUIZ_QUESTION_LIMIT, QUIZ_REVEAL_MS, QUIZ_HISTORY_LIMIT");
    eprintln!("  QUIZ_REST_URL + QUIZ_REST_KEY select the hosted REST store instead of SQLite");
}

fn question_header(snapshot: &SessionSnapshot) -> Option<String> {
    let question = snapshot.question.as_ref()?;
    let progress = snapshot.progress;
    Some(format!(
        "Question {} of {}    score {}    {}% done",
        question.number,
        progress.total,
        progress.score,
        progress.percent_answered()
    ))
}

fn render_question(snapshot: &SessionSnapshot) {
    let (Some(header), Some(question)) = (question_header(snapshot), &snapshot.question) else {
        return;
    };
    println!();
    println!("{header}");
    println!("{}", question.prompt);
    for (index, option) in question.options.iter().enumerate() {
        println!("  {}) {option}", index + 1);
    }
}

fn render_reveal(snapshot: &SessionSnapshot) {
    let Some(question) = &snapshot.question else {
        return;
    };
    match (snapshot.last_answer_correct, question.correct_index) {
        (Some(true), _) => println!("Correct!"),
        (Some(false), Some(correct)) => {
            let answer = question.options.get(correct).map_or("", String::as_str);
            println!("Wrong. The correct answer is: {answer}");
        }
        _ => {}
    }
}

fn summary_lines(snapshot: &SessionSnapshot, stats: Option<&AttemptStats>) -> Vec<String> {
    let mut lines = vec![format!(
        "Quiz complete! You scored {} out of {}",
        snapshot.progress.score, snapshot.progress.total
    )];
    if let Some(stats) = stats.filter(|s| s.attempts > 0) {
        let best = stats.best_score.map_or_else(String::new, |b| format!(", best score {b}"));
        lines.push(format!(
            "{} attempts{best}, {} perfect",
            stats.attempts, stats.perfect_runs
        ));
    }
    if snapshot.history.is_empty() {
        return lines;
    }
    lines.push(String::new());
    lines.push("Your Progress".to_owned());
    for item in &snapshot.history {
        lines.push(format!(
            "  Attempt {}: {}/{}  ({})",
            item.ordinal,
            item.score,
            item.total,
            item.completed_at.format("%Y-%m-%d %H:%M")
        ));
    }
    lines
}

async fn render_summary(driver: &QuizDriver) {
    let stats = match driver.service().current_user() {
        Some(user_id) => match driver.service().ledger().stats(user_id).await {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load attempt stats");
                None
            }
        },
        None => None,
    };
    println!();
    for line in summary_lines(&driver.snapshot(), stats.as_ref()) {
        println!("{line}");
    }
}

fn render_notice(notice: SessionNotice) {
    eprintln!("{}", notice.message());
}

async fn prompt(input: &mut Input, text: &str) -> Result<Option<String>, std::io::Error> {
    println!("{text}");
    Ok(input.next_line().await?.map(|line| line.trim().to_owned()))
}

async fn confirm(input: &mut Input, text: &str) -> Result<bool, std::io::Error> {
    let answer = prompt(input, text).await?;
    Ok(matches!(answer.as_deref(), Some("y" | "Y" | "yes")))
}

/// Reads a 1-based option number. `None` means the player quit.
async fn read_choice(input: &mut Input, options: usize) -> Result<Option<usize>, std::io::Error> {
    loop {
        let Some(line) = prompt(input, &format!("Your answer [1-{options}, q to quit]:")).await?
        else {
            return Ok(None);
        };
        if line.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        match line.parse::<usize>() {
            Ok(n) if (1..=options).contains(&n) => return Ok(Some(n - 1)),
            _ => eprintln!("Please enter a number between 1 and {options}"),
        }
    }
}

/// Plays the current session to completion. Returns `false` if the player quit.
async fn play(driver: &QuizDriver, input: &mut Input) -> Result<bool, Box<dyn std::error::Error>> {
    let mut updates = driver.subscribe();
    loop {
        let snapshot = updates.borrow_and_update().clone();
        match snapshot.phase {
            SessionPhase::Loading => return Ok(true),
            SessionPhase::Presenting(_) => {
                render_question(&snapshot);
                let options = snapshot.question.as_ref().map_or(0, |q| q.options.len());
                let Some(choice) = read_choice(input, options).await? else {
                    return Ok(false);
                };
                if let services::AnswerOutcome::Ignored(reason) = driver.answer(choice).await {
                    tracing::debug!(?reason, "answer ignored");
                }
            }
            SessionPhase::Revealing(index) => {
                render_reveal(&snapshot);
                let generation = snapshot.generation;
                updates
                    .wait_for(|s| {
                        s.generation != generation || s.phase != SessionPhase::Revealing(index)
                    })
                    .await?;
            }
            SessionPhase::Complete => {
                let settled = updates
                    .wait_for(|s| {
                        matches!(s.attempt, AttemptStatus::Saved(_) | AttemptStatus::Failed)
                    })
                    .await?
                    .clone();
                if settled.attempt == AttemptStatus::Failed {
                    render_notice(SessionNotice::SaveFailed);
                    while confirm(input, "Retry saving your result? [y/N]").await? {
                        match driver.retry_save().await {
                            Ok(_) => break,
                            Err(e) => eprintln!("{e}"),
                        }
                    }
                }
                driver.refresh_history().await;
                render_summary(driver).await;
                return Ok(true);
            }
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    let settings = args.settings()?;

    let storage = match args.rest.clone() {
        Some(config) => {
            tracing::info!(base_url = %config.base_url, "using hosted REST store");
            Storage::rest(config)
        }
        None => {
            tracing::info!(db_url = %args.db_url, "using SQLite store");
            Storage::sqlite(&args.db_url).await?
        }
    };

    let identity = match args.user_id {
        Some(user_id) => SharedIdentity::signed_in(user_id),
        None => SharedIdentity::default(),
    };
    let app = AppServices::new(&storage, Clock::system(), settings, Arc::new(identity));
    let driver = app.driver();
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match driver.restart().await {
            Ok(BeginOutcome::Started) => {
                if !play(&driver, &mut input).await? {
                    return Ok(());
                }
            }
            Ok(BeginOutcome::Stale) => continue,
            Err(SessionError::NotSignedIn) => {
                render_notice(SessionNotice::NotSignedIn);
                return Err(SessionError::NotSignedIn.into());
            }
            Err(e) => {
                tracing::debug!(error = %e, "restart failed");
                if let Some(notice) = driver.snapshot().notice {
                    render_notice(notice);
                }
                if !confirm(&mut input, "Try again? [y/N]").await? {
                    return Ok(());
                }
                continue;
            }
        }

        if !confirm(&mut input, "Play again? [y/N]").await? {
            return Ok(());
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("app=info,services=info,storage=info")
        }))
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
