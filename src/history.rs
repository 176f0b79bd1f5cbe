//! Durable transcript log.
//!
//! Append-only CSV, one file per day, rows keyed by a short session id.
//! The pipeline core never reads this back mid-turn; the chat loop appends
//! `(role, content)` pairs after each completed exchange.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

use crate::errors::Result;

/// One persisted transcript row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub timestamp: String,
    pub session_id: String,
    pub role: String,
    pub content: String,
}

/// Append-only transcript store, dated files under one directory
pub struct HistoryStore {
    dir: PathBuf,
    session_id: String,
}

impl HistoryStore {
    /// Open the store, creating the directory and a fresh session id
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let session_id = short_id();
        info!(%session_id, "transcript session started");

        Ok(Self { dir, session_id })
    }

    /// Current session id
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Rotate to a new session id
    pub fn new_session(&mut self) -> &str {
        self.session_id = short_id();
        info!(session_id = %self.session_id, "transcript session rotated");
        &self.session_id
    }

    /// Append one `(role, content)` pair to today's log
    pub fn append(&self, role: &str, content: &str) -> Result<()> {
        let path = self.file_for(Local::now().date_naive());
        let exists = path.exists();

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(!exists)
            .from_writer(file);

        writer.serialize(TranscriptEntry {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            session_id: self.session_id.clone(),
            role: role.to_string(),
            content: content.to_string(),
        })?;
        writer.flush()?;

        Ok(())
    }

    /// Messages of one session from today's log; defaults to the current
    /// session. Missing file means no messages, not an error.
    pub fn session_messages(&self, session_id: Option<&str>) -> Result<Vec<TranscriptEntry>> {
        let wanted = session_id.unwrap_or(&self.session_id);
        let path = self.file_for(Local::now().date_naive());

        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&path)?;
        let mut messages = Vec::new();
        for row in reader.deserialize::<TranscriptEntry>() {
            let entry = row?;
            if entry.session_id == wanted {
                messages.push(entry);
            }
        }

        Ok(messages)
    }

    /// Distinct session ids logged on a given day, in first-seen order
    pub fn sessions_on(&self, date: NaiveDate) -> Result<Vec<String>> {
        let path = self.file_for(date);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&path)?;
        let mut sessions: Vec<String> = Vec::new();
        for row in reader.deserialize::<TranscriptEntry>() {
            let entry = row?;
            if !sessions.contains(&entry.session_id) {
                sessions.push(entry.session_id);
            }
        }

        Ok(sessions)
    }

    fn file_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.csv", date.format("%Y-%m-%d")))
    }
}

fn short_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}
