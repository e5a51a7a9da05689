use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use rollcall_core::{Encoding, Gallery, RecognitionResult};

use crate::capture::Capture;
use crate::config::Config;
use crate::engine;
use crate::export;
use crate::ledger::{self, AttendanceLedger, Status};
use crate::store::FaceStore;

async fn open(config: &Config) -> Result<(FaceStore, AttendanceLedger)> {
    let store = FaceStore::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open database {}", config.db_path.display()))?;
    let ledger = AttendanceLedger::attach(store.connection()).await?;
    Ok((store, ledger))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn date_or_today(date: Option<&str>) -> Result<String> {
    match date {
        Some(d) => Ok(ledger::parse_date(d)?),
        None => Ok(ledger::today()),
    }
}

async fn enrolled_identities(store: &FaceStore) -> Result<Vec<String>> {
    Ok(store
        .users()
        .await?
        .into_iter()
        .map(|u| u.identity)
        .collect())
}

pub async fn enroll(
    config: &Config,
    identity: &str,
    encoding_path: &Path,
    email: &str,
    roll_no: &str,
) -> Result<()> {
    if identity.trim().is_empty() {
        bail!("identity must not be empty");
    }
    let json = std::fs::read_to_string(encoding_path)
        .with_context(|| format!("failed to read {}", encoding_path.display()))?;
    let encoding: Encoding = serde_json::from_str(&json)
        .with_context(|| format!("{} is not a JSON array of numbers", encoding_path.display()))?;

    let (store, _) = open(config).await?;
    store.enroll(identity, email, roll_no, &encoding).await?;

    tracing::info!(identity, dim = encoding.dim(), "enrolled");
    println!("{identity} enrolled ({} dimensions)", encoding.dim());
    Ok(())
}

pub async fn remove(config: &Config, identity: &str) -> Result<()> {
    let (store, _) = open(config).await?;
    if !store.remove(identity).await? {
        bail!("identity '{identity}' is not enrolled");
    }
    tracing::info!(identity, "removed");
    println!("{identity} removed");
    Ok(())
}

pub async fn users(config: &Config) -> Result<()> {
    let (store, _) = open(config).await?;
    let count = store.count().await?;
    let users = store.users().await?;
    print_json(&serde_json::json!({ "count": count, "users": users }))
}

#[derive(Serialize)]
struct CheckReport {
    names: Vec<String>,
    details: Vec<RecognitionResult>,
}

pub async fn check(config: &Config, capture_path: &Path) -> Result<()> {
    let capture = Capture::load(capture_path)?;
    let (store, ledger) = open(config).await?;

    // An unreadable gallery means nobody can be identified, not a failed check.
    let gallery = store.gallery().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "gallery unavailable; no identities will match");
        Gallery::new()
    });

    let details = engine::run_check(capture, gallery, config.pipeline()).await?;
    let names = record_attendance(&ledger, &details, config.dedup_daily).await?;

    print_json(&CheckReport { names, details })
}

/// Mark every identified, live face present. Returns the identities marked.
pub async fn record_attendance(
    ledger: &AttendanceLedger,
    results: &[RecognitionResult],
    dedup_daily: bool,
) -> Result<Vec<String>> {
    let today = ledger::today();
    let mut marked: Vec<String> = Vec::new();

    for result in results {
        let Some(identity) = result.identity.as_deref() else {
            continue;
        };
        if !result.is_live {
            tracing::warn!(identity, "identified face failed liveness; not marked");
            continue;
        }
        if marked.iter().any(|m| m == identity) {
            continue;
        }
        if dedup_daily && ledger.is_present_on(identity, &today).await? {
            tracing::info!(identity, date = %today, "already present today; skipped");
            continue;
        }
        ledger.mark_present_now(identity).await?;
        marked.push(identity.to_string());
    }

    Ok(marked)
}

pub async fn mark(config: &Config, identity: &str, date: Option<&str>, status: &str) -> Result<()> {
    let status: Status = status.parse()?;
    let date = date_or_today(date)?;
    let time = chrono::Local::now().format(ledger::TIME_FORMAT).to_string();

    let (_, ledger) = open(config).await?;
    ledger.mark(identity, &date, &time, status).await?;

    tracing::info!(identity, date = %date, status = %status, "manual attendance recorded");
    println!("{identity} marked {status} for {date}");
    Ok(())
}

pub async fn log(config: &Config, date: Option<&str>) -> Result<()> {
    let (_, ledger) = open(config).await?;
    print_json(&ledger.records(date).await?)
}

pub async fn status(config: &Config, date: Option<&str>) -> Result<()> {
    let date = date_or_today(date)?;
    let (store, ledger) = open(config).await?;
    let enrolled = enrolled_identities(&store).await?;
    let status = ledger.status_for_date(&date, &enrolled).await?;
    print_json(&serde_json::json!({ "date": date, "status": status }))
}

pub async fn summary(config: &Config, date: Option<&str>) -> Result<()> {
    let date = date_or_today(date)?;
    let (store, ledger) = open(config).await?;
    let enrolled = enrolled_identities(&store).await?;
    print_json(&ledger.summary(&date, &enrolled).await?)
}

pub async fn export(config: &Config, output: &Path, date: Option<&str>) -> Result<()> {
    let (store, ledger) = open(config).await?;
    let records = ledger.records(date).await?;
    let users = store.users().await?;

    let file = std::fs::File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let count = export::write_csv(file, &records, &users)?;

    tracing::info!(path = %output.display(), records = count, "attendance exported");
    println!("{count} record(s) written to {}", output.display());
    Ok(())
}
