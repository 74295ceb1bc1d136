//! Per-facility capacity limits and the admission-control predicate.
//!
//! `can_accept` is the only gate in the system that decides whether a
//! facility may take one more patient. It is evaluated against the table as
//! loaded immediately before the write that would raise occupancy.

use crate::{Error, Facility, RecordTable, Result};
use std::collections::BTreeMap;

/// Maximum simultaneous occupancy for each known facility
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapacityPolicy {
    capacities: BTreeMap<String, u32>,
}

impl CapacityPolicy {
    /// Build a policy from a facility set.
    ///
    /// Names must be unique and capacities positive.
    pub fn new(facilities: impl IntoIterator<Item = Facility>) -> Result<Self> {
        let mut capacities = BTreeMap::new();
        for facility in facilities {
            if facility.capacity == 0 {
                return Err(Error::Config(format!(
                    "facility {} must have a capacity of at least 1",
                    facility.name
                )));
            }
            if capacities.insert(facility.name.clone(), facility.capacity).is_some() {
                return Err(Error::Config(format!(
                    "facility {} is configured more than once",
                    facility.name
                )));
            }
        }
        Ok(Self { capacities })
    }

    /// Configured facilities ordered by name
    pub fn facilities(&self) -> impl Iterator<Item = Facility> + '_ {
        self.capacities
            .iter()
            .map(|(name, capacity)| Facility::new(name.clone(), *capacity))
    }

    pub fn is_known(&self, facility: &str) -> bool {
        self.capacities.contains_key(facility)
    }

    /// Capacity of a facility. Names not in the policy are never given a
    /// default capacity.
    pub fn capacity_of(&self, facility: &str) -> Result<u32> {
        self.capacities
            .get(facility)
            .copied()
            .ok_or_else(|| Error::UnknownFacility(facility.to_string()))
    }

    /// Fail with `UnknownFacility` unless the facility is configured
    pub fn ensure_known(&self, facility: &str) -> Result<()> {
        self.capacity_of(facility).map(|_| ())
    }

    /// True iff the facility currently holds fewer patients than its capacity
    pub fn can_accept(&self, table: &RecordTable, facility: &str) -> Result<bool> {
        let capacity = self.capacity_of(facility)?;
        Ok(occupancy_of(table, facility) < capacity as usize)
    }

    /// Admission gate: `Ok(())` if one more patient fits, `FacilityFull` otherwise
    pub fn check_admission(&self, table: &RecordTable, facility: &str) -> Result<()> {
        if self.can_accept(table, facility)? {
            return Ok(());
        }

        let capacity = self.capacity_of(facility)?;
        tracing::warn!(
            "Admission rejected: facility {} at capacity ({}/{})",
            facility,
            occupancy_of(table, facility),
            capacity
        );
        Err(Error::FacilityFull {
            facility: facility.to_string(),
            capacity,
        })
    }

    /// Facilities whose occupancy exceeds capacity, as `(name, occupancy, capacity)`
    pub fn violations(&self, table: &RecordTable) -> Vec<(String, usize, u32)> {
        self.capacities
            .iter()
            .filter_map(|(name, &capacity)| {
                let occupancy = occupancy_of(table, name);
                (occupancy > capacity as usize).then(|| (name.clone(), occupancy, capacity))
            })
            .collect()
    }
}

/// Number of records currently assigned to `facility`
pub fn occupancy_of(table: &RecordTable, facility: &str) -> usize {
    table.count_at(facility)
}
