//! Placement journal: an append-only record of committed transitions.
//!
//! Events are appended to a JSONL (JSON Lines) file with file locking. The
//! record table stays the source of truth; the journal only explains how it
//! got there.

use crate::Result;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// What a committed operation changed
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlacementChange {
    Admitted { facility: String },
    Transferred { from: String, to: String },
    StatusUpdated { from: String, to: String },
    Discharged { facility: String },
}

/// One journal entry
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlacementEvent {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    pub patient_id: String,
    pub change: PlacementChange,
}

impl PlacementEvent {
    pub fn new(patient_id: impl Into<String>, change: PlacementChange) -> Self {
        Self {
            id: Uuid::new_v4(),
            at: Utc::now(),
            patient_id: patient_id.into(),
            change,
        }
    }
}

/// Event sink trait for persisting placement events
pub trait EventSink {
    fn append(&mut self, event: &PlacementEvent) -> Result<()>;
}

/// JSONL-based journal with file locking
pub struct JsonlJournal {
    path: PathBuf,
}

impl JsonlJournal {
    /// Create a new journal for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl EventSink for JsonlJournal {
    fn append(&mut self, event: &PlacementEvent) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(event)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Journaled {:?} for patient {}", event.change, event.patient_id);
        Ok(())
    }
}

/// Read journal events, oldest first.
///
/// With `patient_id` set only that patient's events are returned. With
/// `limit` set only the most recent `limit` matching events are kept.
pub fn read_events(
    path: &Path,
    patient_id: Option<&str>,
    limit: Option<usize>,
) -> Result<Vec<PlacementEvent>> {
    if !path.exists() || limit == Some(0) {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut events = VecDeque::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        let event = match serde_json::from_str::<PlacementEvent>(&line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Skipping journal line {}: {}", line_num + 1, e);
                continue;
            }
        };
        if patient_id.is_some_and(|id| event.patient_id != id) {
            continue;
        }

        events.push_back(event);
        if limit.is_some_and(|max| events.len() > max) {
            events.pop_front();
        }
    }

    file.unlock()?;
    Ok(events.into())
}
