//! Cycle journal
//!
//! Appends one JSON line per finished cycle for after-the-fact review.
//! The journal is never read back by the agent.

use crate::cycle::CycleOutcome;
use crate::executor::ExecutionRecord;
use crate::intent::Intent;
use crate::state::BalanceSnapshot;
use crate::Error;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Entry in the cycle journal
#[derive(Debug, Serialize)]
struct JournalEntry<'a> {
    timestamp: DateTime<Utc>,
    cycle_id: Uuid,
    status: &'static str,
    snapshot: Option<&'a BalanceSnapshot>,
    intent: Option<&'a Intent>,
    execution: Option<&'a ExecutionRecord>,
    error: Option<String>,
}

pub struct CycleJournal {
    path: Mutex<PathBuf>,
}

impl CycleJournal {
    /// Journal appending to `path` (JSONL)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Mutex::new(path.into()),
        }
    }

    /// Record how a cycle ended. Write failures are logged, never returned.
    pub async fn record(&self, cycle_id: Uuid, result: &Result<CycleOutcome, Error>) {
        let entry = match result {
            Ok(outcome) => JournalEntry {
                timestamp: Utc::now(),
                cycle_id,
                status: outcome.status(),
                snapshot: outcome.snapshot(),
                intent: outcome.intent(),
                execution: outcome.execution(),
                error: None,
            },
            Err(e) => JournalEntry {
                timestamp: Utc::now(),
                cycle_id,
                status: "failed",
                snapshot: None,
                intent: None,
                execution: None,
                error: Some(e.to_string()),
            },
        };

        let path = self.path.lock().await;
        if let Err(e) = append(&path, &entry) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write journal entry");
        }
    }
}

fn append(path: &Path, entry: &JournalEntry<'_>) -> crate::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{}", json)?;
    Ok(())
}
