//! Append-only attendance log.
//!
//! Every mark is a new row; nothing is updated in place. The status of an
//! identity on a given date is the latest row for that date, and anyone
//! enrolled without a row counts as absent.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use thiserror::Error;
use tokio_rusqlite::Connection;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Db(#[from] tokio_rusqlite::Error),
    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("invalid status '{0}' (expected present or absent)")]
    InvalidStatus(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Present,
    Absent,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Present => "present",
            Status::Absent => "absent",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(Status::Present),
            "absent" => Ok(Status::Absent),
            other => Err(LedgerError::InvalidStatus(other.to_string())),
        }
    }
}

/// One row of the attendance log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceRecord {
    pub id: String,
    pub identity: String,
    pub date: String,
    pub time: String,
    pub status: Status,
}

/// Attendance figures for one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub date: String,
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub percent: f64,
    pub status: BTreeMap<String, Status>,
}

/// Parse a `YYYY-MM-DD` date, normalising it.
pub fn parse_date(date: &str) -> Result<String, LedgerError> {
    NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map(|d| d.format(DATE_FORMAT).to_string())
        .map_err(|_| LedgerError::InvalidDate(date.to_string()))
}

pub fn today() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}

#[derive(Clone)]
pub struct AttendanceLedger {
    conn: Connection,
}

impl AttendanceLedger {
    /// Attach to an open database, creating the attendance table if needed.
    pub async fn attach(conn: Connection) -> Result<Self, LedgerError> {
        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS attendance (
                     id TEXT PRIMARY KEY,
                     identity TEXT NOT NULL,
                     date TEXT NOT NULL,
                     time TEXT NOT NULL,
                     status TEXT NOT NULL,
                     recorded_at TEXT NOT NULL
                 );
                 CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date);",
            )?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }

    /// Append a record. Returns its id.
    pub async fn mark(
        &self,
        identity: &str,
        date: &str,
        time: &str,
        status: Status,
    ) -> Result<String, LedgerError> {
        let date = parse_date(date)?;
        let id = uuid::Uuid::new_v4().to_string();
        let recorded_at = chrono::Utc::now().to_rfc3339();

        let id_clone = id.clone();
        let identity = identity.to_string();
        let time = time.to_string();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO attendance (id, identity, date, time, status, recorded_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![id_clone, identity, date, time, status.as_str(), recorded_at],
                )?;
                Ok(())
            })
            .await?;

        Ok(id)
    }

    /// Mark `identity` present at the current local date and time.
    pub async fn mark_present_now(&self, identity: &str) -> Result<String, LedgerError> {
        let now = Local::now();
        let date = now.format(DATE_FORMAT).to_string();
        let time = now.format(TIME_FORMAT).to_string();
        let id = self.mark(identity, &date, &time, Status::Present).await?;
        tracing::info!(identity, date = %date, time = %time, "marked present");
        Ok(id)
    }

    /// Whether `identity` has a present record on `date`.
    pub async fn is_present_on(&self, identity: &str, date: &str) -> Result<bool, LedgerError> {
        let date = parse_date(date)?;
        let identity = identity.to_string();
        let found = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM attendance
                     WHERE identity = ?1 AND date = ?2 AND status = 'present'",
                    [&identity, &date],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await?;
        Ok(found)
    }

    /// Log rows in insertion order, optionally restricted to one date.
    pub async fn records(&self, date: Option<&str>) -> Result<Vec<AttendanceRecord>, LedgerError> {
        let date = date.map(parse_date).transpose()?;
        let rows: Vec<(String, String, String, String, String)> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, identity, date, time, status FROM attendance
                     WHERE ?1 IS NULL OR date = ?1
                     ORDER BY rowid",
                )?;
                let rows = stmt.query_map([&date], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await?;

        rows.into_iter()
            .map(|(id, identity, date, time, status)| {
                Ok(AttendanceRecord {
                    id,
                    identity,
                    date,
                    time,
                    status: status.parse()?,
                })
            })
            .collect()
    }

    /// Status of every enrolled identity on `date`, plus anyone with a record
    /// that day who is no longer enrolled.
    pub async fn status_for_date(
        &self,
        date: &str,
        enrolled: &[String],
    ) -> Result<BTreeMap<String, Status>, LedgerError> {
        let mut status: BTreeMap<String, Status> = enrolled
            .iter()
            .map(|identity| (identity.clone(), Status::Absent))
            .collect();
        for record in self.records(Some(date)).await? {
            status.insert(record.identity, record.status);
        }
        Ok(status)
    }

    pub async fn summary(&self, date: &str, enrolled: &[String]) -> Result<Summary, LedgerError> {
        let date = parse_date(date)?;
        let status = self.status_for_date(&date, enrolled).await?;
        let total = status.len();
        let present = status.values().filter(|s| **s == Status::Present).count();
        let percent = if total > 0 {
            (present as f64 / total as f64 * 10000.0).round() / 100.0
        } else {
            0.0
        };
        Ok(Summary {
            date,
            total,
            present,
            absent: total - present,
            percent,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ledger() -> AttendanceLedger {
        let conn = Connection::open_in_memory().await.unwrap();
        AttendanceLedger::attach(conn).await.unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_mark_and_query() {
        let ledger = ledger().await;
        ledger
            .mark("alice", "2026-03-02", "09:01:00", Status::Present)
            .await
            .unwrap();
        ledger
            .mark("bob", "2026-03-03", "09:05:00", Status::Present)
            .await
            .unwrap();

        assert!(ledger.is_present_on("alice", "2026-03-02").await.unwrap());
        assert!(!ledger.is_present_on("alice", "2026-03-03").await.unwrap());

        let all = ledger.records(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].identity, "alice");

        let one_day = ledger.records(Some("2026-03-03")).await.unwrap();
        assert_eq!(one_day.len(), 1);
        assert_eq!(one_day[0].identity, "bob");
        assert_eq!(one_day[0].time, "09:05:00");
    }

    #[tokio::test]
    async fn test_latest_record_wins() {
        let ledger = ledger().await;
        ledger
            .mark("alice", "2026-03-02", "09:00:00", Status::Present)
            .await
            .unwrap();
        ledger
            .mark("alice", "2026-03-02", "12:00:00", Status::Absent)
            .await
            .unwrap();

        let status = ledger
            .status_for_date("2026-03-02", &names(&["alice"]))
            .await
            .unwrap();
        assert_eq!(status["alice"], Status::Absent);
    }

    #[tokio::test]
    async fn test_summary() {
        let ledger = ledger().await;
        ledger
            .mark("alice", "2026-03-02", "09:00:00", Status::Present)
            .await
            .unwrap();
        ledger
            .mark("carol", "2026-03-02", "09:03:00", Status::Present)
            .await
            .unwrap();

        let summary = ledger
            .summary("2026-03-02", &names(&["alice", "bob"]))
            .await
            .unwrap();
        // carol is no longer enrolled but still appears for that day
        assert_eq!(summary.total, 3);
        assert_eq!(summary.present, 2);
        assert_eq!(summary.absent, 1);
        assert_eq!(summary.percent, 66.67);
        assert_eq!(summary.status["bob"], Status::Absent);
    }

    #[tokio::test]
    async fn test_summary_nobody_enrolled() {
        let summary = ledger().await.summary("2026-03-02", &[]).await.unwrap();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.percent, 0.0);
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let ledger = ledger().await;
        let err = ledger
            .mark("alice", "02/03/2026", "09:00:00", Status::Present)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidDate(_)));
        assert!(matches!(
            "late".parse::<Status>(),
            Err(LedgerError::InvalidStatus(_))
        ));
    }

    #[tokio::test]
    async fn test_mark_present_now_is_today() {
        let ledger = ledger().await;
        ledger.mark_present_now("alice").await.unwrap();
        assert!(ledger.is_present_on("alice", &today()).await.unwrap());
    }
}
