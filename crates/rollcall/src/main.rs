use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod capture;
mod commands;
mod config;
mod engine;
mod export;
mod ledger;
mod store;

use config::Config;

#[derive(Parser)]
#[command(name = "rollcall", version, about = "Blink-verified face attendance")]
struct Cli {
    /// Database path (overrides ROLLCALL_DB_PATH).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enroll (or re-enroll) an identity from a JSON encoding file.
    Enroll {
        identity: String,
        /// JSON array of floats produced by the face encoder.
        #[arg(long)]
        encoding: PathBuf,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        roll_no: String,
    },
    /// Remove an enrolled identity.
    Remove { identity: String },
    /// List enrolled identities.
    Users,
    /// Identify and liveness-check a recorded burst, marking attendance.
    Check { capture: PathBuf },
    /// Record attendance manually.
    Mark {
        identity: String,
        /// Defaults to today.
        #[arg(long)]
        date: Option<String>,
        /// present or absent.
        #[arg(long, default_value = "present")]
        status: String,
    },
    /// Print the attendance log.
    Log {
        #[arg(long)]
        date: Option<String>,
    },
    /// Per-identity status for a date.
    Status {
        #[arg(long)]
        date: Option<String>,
    },
    /// Attendance figures for a date.
    Summary {
        #[arg(long)]
        date: Option<String>,
    },
    /// Export the attendance log as CSV.
    Export {
        output: PathBuf,
        #[arg(long)]
        date: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    tracing::debug!(db = %config.db_path.display(), "configuration loaded");

    match cli.command {
        Command::Enroll {
            identity,
            encoding,
            email,
            roll_no,
        } => commands::enroll(&config, &identity, &encoding, &email, &roll_no).await,
        Command::Remove { identity } => commands::remove(&config, &identity).await,
        Command::Users => commands::users(&config).await,
        Command::Check { capture } => commands::check(&config, &capture).await,
        Command::Mark {
            identity,
            date,
            status,
        } => commands::mark(&config, &identity, date.as_deref(), &status).await,
        Command::Log { date } => commands::log(&config, date.as_deref()).await,
        Command::Status { date } => commands::status(&config, date.as_deref()).await,
        Command::Summary { date } => commands::summary(&config, date.as_deref()).await,
        Command::Export { output, date } => {
            commands::export(&config, &output, date.as_deref()).await
        }
    }
}
