//! Core domain types for the bed board.
//!
//! This module defines the fundamental types used throughout the system:
//! - Patient records and COVID status
//! - The record table (unit of persistence)
//! - Facilities and their capacities

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Patient Types
// ============================================================================

/// COVID test status of a patient
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum CovidStatus {
    Positive,
    Negative,
    Unknown,
}

impl CovidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CovidStatus::Positive => "positive",
            CovidStatus::Negative => "negative",
            CovidStatus::Unknown => "unknown",
        }
    }
}

impl From<&str> for CovidStatus {
    /// Lenient parse of operator or file input. Anything that is not a
    /// recognizable yes/no answer is `Unknown`.
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "positive" | "pos" | "yes" | "y" | "true" | "t" | "1" | "+" => CovidStatus::Positive,
            "negative" | "neg" | "no" | "n" | "false" | "f" | "0" | "-" => CovidStatus::Negative,
            _ => CovidStatus::Unknown,
        }
    }
}

impl From<String> for CovidStatus {
    fn from(s: String) -> Self {
        CovidStatus::from(s.as_str())
    }
}

impl From<CovidStatus> for String {
    fn from(status: CovidStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for CovidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the record table
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientRecord {
    pub patient_id: String,
    pub facility: String,
    pub severity_status: String,
    pub covid_status: CovidStatus,
}

// ============================================================================
// Record Table
// ============================================================================

/// The full ordered collection of patient records.
///
/// Row order is insertion order. Patient ids are unique within a table;
/// `insert` refuses duplicates. `version` is the stored snapshot version this
/// table was loaded from and is checked by the store on save.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordTable {
    records: Vec<PatientRecord>,
    version: u64,
}

impl RecordTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from rows, rejecting duplicate patient ids.
    ///
    /// Returns the offending id on failure.
    pub fn from_records(records: Vec<PatientRecord>, version: u64) -> std::result::Result<Self, String> {
        let mut table = RecordTable {
            records: Vec::with_capacity(records.len()),
            version,
        };
        for record in records {
            if table.contains(&record.patient_id) {
                return Err(record.patient_id);
            }
            table.records.push(record);
        }
        Ok(table)
    }

    pub fn records(&self) -> &[PatientRecord] {
        &self.records
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, patient_id: &str) -> bool {
        self.find(patient_id).is_some()
    }

    pub fn find(&self, patient_id: &str) -> Option<&PatientRecord> {
        self.records.iter().find(|r| r.patient_id == patient_id)
    }

    pub fn find_mut(&mut self, patient_id: &str) -> Option<&mut PatientRecord> {
        self.records.iter_mut().find(|r| r.patient_id == patient_id)
    }

    /// Append a record. Returns the record back if its id is already taken.
    pub fn insert(&mut self, record: PatientRecord) -> std::result::Result<(), PatientRecord> {
        if self.contains(&record.patient_id) {
            return Err(record);
        }
        self.records.push(record);
        Ok(())
    }

    /// Remove a record by id, preserving the order of the remaining rows
    pub fn remove(&mut self, patient_id: &str) -> Option<PatientRecord> {
        let idx = self.records.iter().position(|r| r.patient_id == patient_id)?;
        Some(self.records.remove(idx))
    }

    /// Number of records currently assigned to `facility`
    pub fn count_at(&self, facility: &str) -> usize {
        self.records.iter().filter(|r| r.facility == facility).count()
    }
}

// ============================================================================
// Facility
// ============================================================================

/// A site with a fixed maximum number of simultaneous occupants
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Facility {
    pub name: String,
    pub capacity: u32,
}

impl Facility {
    pub fn new(name: impl Into<String>, capacity: u32) -> Self {
        Self {
            name: name.into(),
            capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, facility: &str) -> PatientRecord {
        PatientRecord {
            patient_id: id.into(),
            facility: facility.into(),
            severity_status: "stable".into(),
            covid_status: CovidStatus::Negative,
        }
    }

    #[test]
    fn test_covid_status_parsing() {
        assert_eq!(CovidStatus::from("Positive"), CovidStatus::Positive);
        assert_eq!(CovidStatus::from(" yes "), CovidStatus::Positive);
        assert_eq!(CovidStatus::from("False"), CovidStatus::Negative);
        assert_eq!(CovidStatus::from("negative"), CovidStatus::Negative);
        assert_eq!(CovidStatus::from("pending"), CovidStatus::Unknown);
        assert_eq!(CovidStatus::from(""), CovidStatus::Unknown);
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let mut table = RecordTable::new();
        table.insert(record("123a", "A")).unwrap();

        let rejected = table.insert(record("123a", "B")).unwrap_err();
        assert_eq!(rejected.facility, "B");
        assert_eq!(table.len(), 1);
        assert_eq!(table.find("123a").unwrap().facility, "A");
    }

    #[test]
    fn test_from_records_reports_duplicate() {
        let result = RecordTable::from_records(vec![record("1a", "A"), record("1a", "B")], 0);
        assert_eq!(result.unwrap_err(), "1a");
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut table = RecordTable::new();
        for id in ["1a", "2b", "3c"] {
            table.insert(record(id, "A")).unwrap();
        }

        let removed = table.remove("2b").unwrap();
        assert_eq!(removed.patient_id, "2b");

        let ids: Vec<_> = table.records().iter().map(|r| r.patient_id.as_str()).collect();
        assert_eq!(ids, vec!["1a", "3c"]);
        assert!(table.remove("2b").is_none());
    }

    #[test]
    fn test_count_at() {
        let mut table = RecordTable::new();
        table.insert(record("1a", "A")).unwrap();
        table.insert(record("2b", "A")).unwrap();
        table.insert(record("3c", "C")).unwrap();

        assert_eq!(table.count_at("A"), 2);
        assert_eq!(table.count_at("B"), 0);
        assert_eq!(table.count_at("C"), 1);
    }
}
