use std::fmt;

use services::{AppServices, Clock};
use strength_core::model::{PlanId, SessionSettings, SettingsError};
use tracing_subscriber::EnvFilter;

mod console;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    UnknownPlan(String),
    Settings(SettingsError),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::UnknownPlan(id) => write!(f, "unknown plan: {id} (expected day-a or day-b)"),
            ArgsError::Settings(err) => write!(f, "{err}"),
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

fn parse_secs(flag: &'static str, raw: &str) -> Result<u32, ArgsError> {
    raw.trim().parse().map_err(|_| ArgsError::InvalidNumber {
        flag,
        raw: raw.to_owned(),
    })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [run] [--db <sqlite_url>] [--plan <id>] [--rest-secs <n>] [--redo-delay-secs <n>]");
    eprintln!("  cargo run -p app -- history [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- reset   [--db <sqlite_url>] [--history]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:strength.sqlite3");
    eprintln!("  --plan <unfinished plan, else the day after the last workout>");
    eprintln!("  --rest-secs {}", SessionSettings::DEFAULT_REST_SECS);
    eprintln!("  --redo-delay-secs {}", SessionSettings::DEFAULT_REDO_DELAY_SECS);
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STRENGTH_DB_URL, STRENGTH_PLAN, STRENGTH_REST_SECS, STRENGTH_REDO_DELAY_SECS, STRENGTH_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    History,
    Reset,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "run" => Some(Self::Run),
            "history" => Some(Self::History),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    plan: Option<PlanId>,
    settings: SessionSettings,
    clear_history: bool,
}

impl Args {
    fn parse(cmd: Command, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("STRENGTH_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://strength.sqlite3".into(), normalize_sqlite_url);
        let mut plan = std::env::var("STRENGTH_PLAN").ok().map(PlanId::new);
        let mut rest_secs = match std::env::var("STRENGTH_REST_SECS") {
            Ok(raw) => parse_secs("STRENGTH_REST_SECS", &raw)?,
            Err(_) => SessionSettings::DEFAULT_REST_SECS,
        };
        let mut redo_delay_secs = match std::env::var("STRENGTH_REDO_DELAY_SECS") {
            Ok(raw) => parse_secs("STRENGTH_REDO_DELAY_SECS", &raw)?,
            Err(_) => SessionSettings::DEFAULT_REDO_DELAY_SECS,
        };
        let mut clear_history = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--plan" if cmd == Command::Run => {
                    plan = Some(PlanId::new(require_value(args, "--plan")?));
                }
                "--rest-secs" if cmd == Command::Run => {
                    let value = require_value(args, "--rest-secs")?;
                    rest_secs = parse_secs("--rest-secs", &value)?;
                }
                "--redo-delay-secs" if cmd == Command::Run => {
                    let value = require_value(args, "--redo-delay-secs")?;
                    redo_delay_secs = parse_secs("--redo-delay-secs", &value)?;
                }
                "--history" if cmd == Command::Reset => clear_history = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let settings = SessionSettings::new(rest_secs, redo_delay_secs, true, 0)
            .map_err(ArgsError::Settings)?;

        Ok(Self {
            db_url,
            plan,
            settings,
            clear_history,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("STRENGTH_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means start or resume a workout.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Run,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Run,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(cmd, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&parsed.db_url)?;
    let app = AppServices::new_sqlite(&parsed.db_url, Clock::System, parsed.settings)
        .await?
        .with_session_observers(console::observer_factory());
    tracing::debug!(db_url = %parsed.db_url, ?cmd, "storage ready");

    match cmd {
        Command::Run => {
            let plan = match &parsed.plan {
                Some(id) => app
                    .plan(id)
                    .ok_or_else(|| ArgsError::UnknownPlan(id.to_string()))?,
                None => app.suggested_plan().await?,
            }
            .clone();
            console::run_workout(&app, plan).await
        }
        Command::History => console::print_history(&app).await,
        Command::Reset => {
            app.sessions().reset_progress().await?;
            if parsed.clear_history {
                app.history().clear().await?;
                println!("Session progress and workout history cleared.");
            } else {
                println!("Session progress cleared.");
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
