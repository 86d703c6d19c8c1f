//! turnier-bot — JSONL audit event stream
//!
//! One JSON line per domain event, appended to `logs/YYYY-MM-DD.jsonl`.
//! The stream is the only record of what went out; tournament state itself
//! is rebuilt from the index on every restart.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event types ───────────────────────────────────────────────────────────────

/// One scrape cycle finished.
#[derive(Serialize, Debug)]
pub struct CycleEvent {
    pub ts:            String,
    pub event:         &'static str,   // "CYCLE"
    pub fetched:       usize,
    pub updated:       usize,
    pub notifications: usize,
}

/// A tournament was inserted or replaced and its detail page re-read.
#[derive(Serialize, Debug)]
pub struct TournamentUpdatedEvent {
    pub ts:                 String,
    pub event:              &'static str,   // "TOURNAMENT_UPDATED"
    pub id:                 String,
    pub title:              String,
    pub changed:            String,         // RFC 3339
    pub registration_start: Option<String>, // RFC 3339
    pub phases:             usize,
}

/// A reminder went out to the tracked channels.
#[derive(Serialize, Debug)]
pub struct NotificationEvent {
    pub ts:            String,
    pub event:         &'static str,   // "NOTIFICATION_SENT"
    pub tournament_id: String,
    pub title:         String,
    pub phase:         Option<String>,
    pub opens_at:      String,         // RFC 3339
    pub channels:      usize,          // successful sends
}

/// An index or detail fetch failed; the cycle carries on without it.
#[derive(Serialize, Debug)]
pub struct FetchErrorEvent {
    pub ts:      String,
    pub event:   &'static str,   // "FETCH_ERROR"
    pub url:     String,
    pub message: String,
}
