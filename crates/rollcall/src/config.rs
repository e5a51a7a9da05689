use std::path::PathBuf;

use rollcall_core::config::{DEFAULT_MATCH_THRESHOLD, DEFAULT_OPENNESS_THRESHOLD};
use rollcall_core::PipelineConfig;

/// Application configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database holding enrollments and attendance.
    pub db_path: PathBuf,
    /// Euclidean distance below which a face matches an enrolled identity.
    pub match_threshold: f32,
    /// Eye openness at or below which an eye counts as closed.
    pub openness_threshold: f32,
    /// Whether an identity already marked present today is skipped on
    /// subsequent checks the same day. Off by default: every check appends.
    pub dedup_daily: bool,
}

impl Config {
    /// Load configuration from `ROLLCALL_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("rollcall");

        let db_path = std::env::var("ROLLCALL_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("rollcall.db"));

        Self {
            db_path,
            match_threshold: env_f32("ROLLCALL_MATCH_THRESHOLD", DEFAULT_MATCH_THRESHOLD),
            openness_threshold: env_f32("ROLLCALL_OPENNESS_THRESHOLD", DEFAULT_OPENNESS_THRESHOLD),
            dedup_daily: env_flag("ROLLCALL_DEDUP_DAILY", false),
        }
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            match_threshold: self.match_threshold,
            openness_threshold: self.openness_threshold,
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// `1`, `true`, `yes` or `on` enable; anything else set disables.
fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}
