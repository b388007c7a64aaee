use std::fmt;

use chrono::{DateTime, Duration, Utc};
use quiz_core::model::{AttemptId, AttemptRecord, Question, QuestionId, UserId};
use storage::repository::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    user_id: Option<UserId>,
    attempts: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidUserId { raw: String },
    InvalidAttempts { raw: String },
    InvalidNow { raw: String },
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
            ArgsError::InvalidAttempts { raw } => write!(f, "invalid --attempts value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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

/// An unset variable means no player; a set but malformed one is rejected like `--user`.
fn user_id_from_env(raw: Option<String>) -> Result<Option<UserId>, ArgsError> {
    raw.map(|raw| {
        raw.trim()
            .parse::<UserId>()
            .map_err(|_| ArgsError::InvalidUserId { raw: raw.clone() })
    })
    .transpose()
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| "sqlite:quiz.sqlite3?mode=rwc".into());
        let mut user_id = user_id_from_env(std::env::var("QUIZ_USER_ID").ok())?;
        let mut attempts = 0;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    let parsed = value
                        .parse::<UserId>()
                        .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?;
                    user_id = Some(parsed);
                }
                "--attempts" => {
                    let value = require_value(&mut args, "--attempts")?;
                    attempts = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidAttempts { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
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
            user_id,
            attempts,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:quiz.sqlite3?mode=rwc)");
    eprintln!("  --user <uuid>             Player to attach sample attempts to");
    eprintln!("  --attempts <n>            Number of sample attempts to append (default: 0)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_DB_URL, QUIZ_USER_ID");
}

const BANK: &[(&str, &[&str], usize)] = &[
    (
        "Which pathogen causes late blight in potatoes and tomatoes?",
        &["Phytophthora infestans", "Alternaria solani", "Botrytis cinerea", "Pseudomonas syringae"],
        0,
    ),
    (
        "Powdery mildew usually first appears as:",
        &["Yellow veins", "White powdery patches on leaves", "Wet black stems", "Curled roots"],
        1,
    ),
    (
        "Early blight lesions on tomato leaves typically show:",
        &["Concentric target-like rings", "Silver streaks", "Orange pustules", "No visible lesions"],
        0,
    ),
    (
        "Rust diseases on wheat are caused by:",
        &["Bacteria", "Viruses", "Fungi", "Nematodes"],
        2,
    ),
    (
        "Which practice helps reduce the spread of fungal leaf diseases?",
        &["Overhead watering at night", "Crop rotation", "Crowding plants together", "Leaving infected debris"],
        1,
    ),
    (
        "Tobacco mosaic virus commonly causes:",
        &["Mottled light and dark green leaves", "Root galls", "Fruit rot only", "White mould on stems"],
        0,
    ),
    (
        "Apple scab is best recognised by:",
        &["Olive-green to black spots on leaves and fruit", "Holes in the bark", "Purple flowers", "Sticky honeydew"],
        0,
    ),
    (
        "Bacterial wilt in cucumbers is spread mainly by:",
        &["Wind", "Cucumber beetles", "Rainfall alone", "Earthworms"],
        1,
    ),
    (
        "Damping-off mostly affects:",
        &["Mature trees", "Seedlings", "Harvested grain", "Cut flowers"],
        1,
    ),
    (
        "Which symptom points to downy mildew rather than powdery mildew?",
        &["Growth on upper leaf surface only", "Grey-purple fuzz on the underside of leaves", "Dry white dust", "Leaf galls"],
        1,
    ),
    (
        "Citrus canker produces:",
        &["Raised corky lesions with yellow halos", "Smooth shiny leaves", "Blue fruit", "Hollow stems"],
        0,
    ),
    (
        "Fusarium wilt blocks the plant's:",
        &["Pollen tubes", "Water-conducting vessels", "Stomata only", "Seed coat"],
        1,
    ),
];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    for (i, (prompt, options, correct)) in BANK.iter().enumerate() {
        let id = QuestionId::new(u64::try_from(i)? + 1);
        let options = options.iter().map(|o| (*o).to_string()).collect();
        let question = Question::new(id, *prompt, options, *correct)?;
        storage.questions.upsert_question(&question).await?;
    }
    info!(count = BANK.len(), "seeded question bank");

    if let Some(user_id) = args.user_id {
        for i in 0..args.attempts {
            let completed_at = now - Duration::days(i64::from(i));
            let total = 10;
            let score = total - i % 4;
            let record =
                AttemptRecord::new(AttemptId::generate(), user_id, score, total, completed_at)?;
            storage.attempts.append_attempt(&record).await?;
        }
        info!(%user_id, attempts = args.attempts, "seeded sample attempts");
    }

    println!(
        "Seeded {} questions and {} attempts into {}",
        BANK.len(),
        if args.user_id.is_some() { args.attempts } else { 0 },
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("storage=info")),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_user_id_is_validated() {
        assert!(user_id_from_env(None).unwrap().is_none());

        let parsed = user_id_from_env(Some("6f1c1a52-8d0e-4c59-9a43-3f1b2f0c7d11".into()))
            .unwrap()
            .unwrap();
        assert_eq!(parsed.to_string(), "6f1c1a52-8d0e-4c59-9a43-3f1b2f0c7d11");

        let err = user_id_from_env(Some("not-a-uuid".into())).unwrap_err();
        assert!(matches!(err, ArgsError::InvalidUserId { raw } if raw == "not-a-uuid"));
    }
}
