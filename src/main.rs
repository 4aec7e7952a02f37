use std::{io::Write, path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;

use monkmode_lib::{
    init_logging, ControllerDeps, Database, LogScheduler, PersistedSessionStore, SessionConfig,
    SessionLedger, SessionStatus, SessionTimerController, SettingsStore, SqliteKv, TimerEvent,
    TimerSnapshot,
};

#[derive(Parser)]
#[command(name = "monkmode", version, about = "Focused reading sessions")]
struct Cli {
    /// Directory for the database and settings (defaults to the user data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new session
    Start {
        /// Session length in minutes (defaults to the configured duration)
        #[arg(long)]
        minutes: Option<u64>,
        /// Session length in seconds
        #[arg(long, conflicts_with = "minutes")]
        seconds: Option<u64>,
        /// What is being read, e.g. a book id
        #[arg(long)]
        subject: Option<String>,
        /// Display name shown in the completion alert
        #[arg(long, requires = "subject")]
        label: Option<String>,
        /// Keep running and show the countdown
        #[arg(long)]
        watch: bool,
    },
    /// Pause the running session
    Pause,
    /// Resume a paused session
    Resume,
    /// Abandon the current session
    Cancel,
    /// Print the current session as JSON
    Status,
    /// Follow the countdown until the session ends (Ctrl-C to detach)
    Watch,
    /// List recently completed sessions
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => dirs::data_dir()
            .ok_or_else(|| anyhow!("no user data directory; pass --data-dir"))?
            .join("monkmode"),
    };
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;

    let settings = SettingsStore::new(data_dir.join("settings.json"))?.get();
    let db = Database::new(data_dir.join("monkmode.sqlite3"))?;
    let ledger = SessionLedger::new(db.clone());
    let store = PersistedSessionStore::new(Arc::new(SqliteKv::new(db.clone())));

    let deps = ControllerDeps::new(store, Arc::new(LogScheduler), Arc::new(ledger.clone()))
        .with_settings(settings.clone());
    let controller = SessionTimerController::new(deps)?;

    let result = match cli.command {
        Commands::Start {
            minutes,
            seconds,
            subject,
            label,
            watch: follow,
        } => {
            let total = match (seconds, minutes) {
                (Some(secs), _) => secs,
                (None, Some(mins)) => mins.saturating_mul(60),
                (None, None) => settings.timer.default_duration_minutes.saturating_mul(60),
            };
            let mut config = SessionConfig::new(total)?;
            if let Some(subject) = subject {
                config = config.with_subject(subject, label);
            }
            print_snapshot(&controller.start(config).await?)?;
            if follow {
                watch(&controller).await?;
            }
            Ok(())
        }
        Commands::Pause => print_snapshot(&controller.pause().await?),
        Commands::Resume => print_snapshot(&controller.resume().await?),
        Commands::Cancel => print_snapshot(&controller.cancel().await?),
        Commands::Status => print_snapshot(&controller.resync().await),
        Commands::Watch => watch(&controller).await,
        Commands::History { limit } => {
            for session in ledger.recent(limit).await? {
                println!(
                    "{}  {:>6}  {}",
                    session.completed_at.format("%Y-%m-%d %H:%M"),
                    format_clock(session.duration_seconds),
                    session.subject_id.as_deref().unwrap_or("-"),
                );
            }
            Ok(())
        }
    };

    controller.shutdown().await;
    result
}

async fn watch(controller: &SessionTimerController) -> Result<()> {
    let mut events = controller.subscribe();
    let snapshot = controller.resync().await;
    if snapshot.status != SessionStatus::Running {
        return print_snapshot(&snapshot);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("Detached; the session keeps running.");
                return Ok(());
            }
            event = events.recv() => match event {
                Ok(TimerEvent::Tick { remaining_seconds, .. }) => {
                    print!("\r{}  ", format_clock(remaining_seconds));
                    std::io::stdout().flush()?;
                }
                Ok(TimerEvent::Completed { duration_seconds, .. }) => {
                    println!();
                    println!("Session complete ({}).", format_clock(duration_seconds));
                    return Ok(());
                }
                Ok(TimerEvent::StateChanged(snapshot))
                    if matches!(snapshot.status, SessionStatus::Paused | SessionStatus::Idle) =>
                {
                    println!();
                    return print_snapshot(&snapshot);
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return Ok(()),
            },
        }
    }
}

fn print_snapshot(snapshot: &TimerSnapshot) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(snapshot)?);
    Ok(())
}

fn format_clock(total_seconds: u64) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}
