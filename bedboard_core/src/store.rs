//! Durable record table with file locking and atomic full-table saves.
//!
//! The CSV file holds one row per patient. Every save replaces the whole
//! table through a temp file and rename, so readers only ever see a complete
//! committed snapshot. A small JSON sidecar carries the snapshot version used
//! for optimistic conflict detection between writers.

use crate::{CovidStatus, Error, PatientRecord, RecordTable, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// Column headers of the persisted table, in write order
pub const COLUMNS: [&str; 4] = ["Patient_ID", "Hospital", "Status", "Covid_Positive"];

/// Durable home of the record table.
///
/// `load` returns the full table stamped with the stored version. `save`
/// replaces the stored table with the given snapshot and returns the new
/// version, failing with `Conflict` if someone else saved in between.
pub trait RecordStore {
    fn load(&self) -> Result<RecordTable>;
    fn save(&self, table: &RecordTable) -> Result<u64>;
}

/// A row in the CSV file
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(rename = "Patient_ID")]
    patient_id: String,
    #[serde(rename = "Hospital")]
    hospital: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "Covid_Positive")]
    covid_positive: String,
}

impl From<&PatientRecord> for CsvRow {
    fn from(record: &PatientRecord) -> Self {
        CsvRow {
            patient_id: record.patient_id.clone(),
            hospital: record.facility.clone(),
            status: record.severity_status.clone(),
            covid_positive: record.covid_status.to_string(),
        }
    }
}

impl From<CsvRow> for PatientRecord {
    fn from(row: CsvRow) -> Self {
        PatientRecord {
            patient_id: row.patient_id,
            facility: row.hospital,
            severity_status: row.status,
            covid_status: CovidStatus::from(row.covid_positive.as_str()),
        }
    }
}

/// Snapshot metadata stored next to the table
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotMeta {
    version: u64,
    saved_at: DateTime<Utc>,
    records: usize,
}

/// CSV-backed record store
#[derive(Clone, Debug)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    /// Open a store handle for the given table path. No I/O happens here.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create an empty table at `path` unless one already exists.
    ///
    /// Returns whether a new file was written.
    pub fn create(path: impl Into<PathBuf>) -> Result<(Self, bool)> {
        let store = Self::open(path);
        if store.path.exists() {
            tracing::info!("Record table {:?} already exists, leaving it intact", store.path);
            return Ok((store, false));
        }

        std::fs::create_dir_all(store.parent_dir()).map_err(|e| Error::store(&store.path, e))?;
        store
            .with_lock(true, || store.write_csv(&[]))
            .map_err(|e| Error::store(&store.path, e))?;
        tracing::info!("Created empty record table at {:?}", store.path);
        Ok((store, true))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    fn sidecar(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn lock_path(&self) -> PathBuf {
        self.sidecar(".lock")
    }

    fn meta_path(&self) -> PathBuf {
        self.sidecar(".meta.json")
    }

    /// Run `f` while holding the table lock (shared or exclusive)
    fn with_lock<T>(&self, exclusive: bool, f: impl FnOnce() -> io::Result<T>) -> io::Result<T> {
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;

        if exclusive {
            lock.lock_exclusive()?;
        } else {
            lock.lock_shared()?;
        }

        let result = f();
        let _ = lock.unlock();
        result
    }

    fn read_version(&self) -> io::Result<u64> {
        let meta_path = self.meta_path();
        if !meta_path.exists() {
            return Ok(0);
        }

        let file = File::open(&meta_path)?;
        let meta: SnapshotMeta = serde_json::from_reader(BufReader::new(file))?;
        Ok(meta.version)
    }

    fn read_rows(&self) -> Result<Vec<PatientRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_path(&self.path)
            .map_err(|e| Error::store(&self.path, e))?;

        let headers = reader
            .headers()
            .map_err(|e| Error::store(&self.path, e))?
            .clone();
        for column in COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(Error::store(
                    &self.path,
                    format!("missing required column '{}'", column),
                ));
            }
        }

        let mut records = Vec::new();
        for (idx, row) in reader.deserialize::<CsvRow>().enumerate() {
            let row = row.map_err(|e| Error::store(&self.path, format!("row {}: {}", idx + 1, e)))?;
            if row.patient_id.is_empty() || row.hospital.is_empty() {
                return Err(Error::store(
                    &self.path,
                    format!("row {}: patient id and hospital must not be empty", idx + 1),
                ));
            }
            records.push(PatientRecord::from(row));
        }
        Ok(records)
    }

    fn write_csv(&self, records: &[PatientRecord]) -> io::Result<()> {
        let temp = NamedTempFile::new_in(self.parent_dir())?;

        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(temp.as_file());
            writer.write_record(COLUMNS)?;
            for record in records {
                writer.serialize(CsvRow::from(record))?;
            }
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.persist(&self.path)?;
        Ok(())
    }

    fn write_meta(&self, version: u64, records: usize) -> io::Result<()> {
        let meta = SnapshotMeta {
            version,
            saved_at: Utc::now(),
            records,
        };

        let temp = NamedTempFile::new_in(self.parent_dir())?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, &meta)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(self.meta_path())?;
        Ok(())
    }
}

impl RecordStore for CsvStore {
    fn load(&self) -> Result<RecordTable> {
        if !self.path.exists() {
            return Err(Error::store(
                &self.path,
                "record table does not exist (run `bedboard init` to create one)",
            ));
        }

        let (version, rows) = self
            .with_lock(false, || Ok((self.read_version()?, self.read_rows())))
            .map_err(|e| Error::store(&self.path, e))?;
        let records = rows?;

        let table = RecordTable::from_records(records, version).map_err(|id| {
            Error::store(&self.path, format!("duplicate patient id {}", id))
        })?;

        tracing::debug!(
            "Loaded {} records (version {}) from {:?}",
            table.len(),
            table.version(),
            self.path
        );
        Ok(table)
    }

    fn save(&self, table: &RecordTable) -> Result<u64> {
        std::fs::create_dir_all(self.parent_dir()).map_err(|e| Error::store(&self.path, e))?;

        let outcome = self
            .with_lock(true, || {
                let found = self.read_version()?;
                if found != table.version() {
                    return Ok(Err(found));
                }

                let next = found + 1;
                self.write_csv(table.records())?;
                self.write_meta(next, table.len())?;
                Ok(Ok(next))
            })
            .map_err(|e| Error::store(&self.path, e))?;

        match outcome {
            Ok(version) => {
                tracing::debug!(
                    "Saved {} records (version {}) to {:?}",
                    table.len(),
                    version,
                    self.path
                );
                Ok(version)
            }
            Err(found) => {
                tracing::warn!(
                    "Refusing to save {:?}: loaded version {}, stored version {}",
                    self.path,
                    table.version(),
                    found
                );
                Err(Error::Conflict {
                    expected: table.version(),
                    found,
                })
            }
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<PatientRecord>,
    version: u64,
    unavailable: bool,
}

/// In-process record store with the same versioning contract as `CsvStore`
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing set of rows (stored version 0)
    pub fn with_records(records: Vec<PatientRecord>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                records,
                ..MemoryState::default()
            }),
        }
    }

    /// Simulate the backing resource going away (or coming back)
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.unavailable = unavailable;
        }
    }

    fn state(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        let state = self
            .state
            .lock()
            .map_err(|_| Error::StoreUnavailable("memory store lock poisoned".into()))?;
        if state.unavailable {
            return Err(Error::StoreUnavailable("memory store is unavailable".into()));
        }
        Ok(state)
    }
}

impl RecordStore for MemoryStore {
    fn load(&self) -> Result<RecordTable> {
        let state = self.state()?;
        RecordTable::from_records(state.records.clone(), state.version)
            .map_err(|id| Error::StoreUnavailable(format!("duplicate patient id {}", id)))
    }

    fn save(&self, table: &RecordTable) -> Result<u64> {
        let mut state = self.state()?;
        if state.version != table.version() {
            return Err(Error::Conflict {
                expected: table.version(),
                found: state.version,
            });
        }
        state.records = table.records().to_vec();
        state.version += 1;
        Ok(state.version)
    }
}
