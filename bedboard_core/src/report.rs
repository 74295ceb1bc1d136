//! Read-only views over a loaded record table.

use crate::policy::CapacityPolicy;
use crate::{PatientRecord, RecordTable};
use serde::Serialize;
use std::collections::BTreeMap;

/// Occupancy of one configured facility
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct FacilityOccupancy {
    pub name: String,
    pub occupancy: usize,
    pub capacity: u32,
}

impl FacilityOccupancy {
    /// Free beds (zero when at or over capacity)
    pub fn available(&self) -> usize {
        (self.capacity as usize).saturating_sub(self.occupancy)
    }

    pub fn is_full(&self) -> bool {
        self.available() == 0
    }
}

/// Patient count per facility name, ordered by name.
///
/// Only facilities that appear in the table are listed.
pub fn occupancy_report(table: &RecordTable) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in table.records() {
        *counts.entry(record.facility.clone()).or_insert(0) += 1;
    }
    counts
}

/// The complete table in stored order
pub fn full_roster(table: &RecordTable) -> &[PatientRecord] {
    table.records()
}

/// Occupancy and capacity for every configured facility, including empty ones
pub fn capacity_summary(table: &RecordTable, policy: &CapacityPolicy) -> Vec<FacilityOccupancy> {
    let counts = occupancy_report(table);
    policy
        .facilities()
        .map(|facility| FacilityOccupancy {
            occupancy: counts.get(&facility.name).copied().unwrap_or(0),
            name: facility.name,
            capacity: facility.capacity,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CovidStatus, Facility};

    fn table() -> RecordTable {
        let rows = [("1a", "C"), ("2b", "A"), ("3c", "C"), ("4d", "Z")];
        RecordTable::from_records(
            rows.iter()
                .map(|(id, facility)| PatientRecord {
                    patient_id: id.to_string(),
                    facility: facility.to_string(),
                    severity_status: "stable".into(),
                    covid_status: CovidStatus::Unknown,
                })
                .collect(),
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_occupancy_report_ordered_by_name() {
        let report = occupancy_report(&table());
        let entries: Vec<_> = report.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(entries, vec![("A", 1), ("C", 2), ("Z", 1)]);
    }

    #[test]
    fn test_empty_table_reports_nothing() {
        assert!(occupancy_report(&RecordTable::new()).is_empty());
        assert!(full_roster(&RecordTable::new()).is_empty());
    }

    #[test]
    fn test_full_roster_keeps_order() {
        let table = table();
        let ids: Vec<_> = full_roster(&table).iter().map(|r| r.patient_id.as_str()).collect();
        assert_eq!(ids, vec!["1a", "2b", "3c", "4d"]);
    }

    #[test]
    fn test_capacity_summary_covers_configured_facilities() {
        let policy = CapacityPolicy::new(vec![
            Facility::new("A", 20),
            Facility::new("B", 13),
            Facility::new("C", 2),
        ])
        .unwrap();

        let summary = capacity_summary(&table(), &policy);
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0].occupancy, 1);
        assert_eq!(summary[0].available(), 19);
        assert_eq!(summary[1].name, "B");
        assert_eq!(summary[1].occupancy, 0);
        assert!(summary[2].is_full());
    }
}
