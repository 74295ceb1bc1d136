//! Placement engine: the only writer of the record table.
//!
//! Every operation is one self-contained transition:
//! 1. Load the current table from the store
//! 2. Validate (facility known, patient exists, capacity available)
//! 3. Mutate the in-memory copy
//! 4. Save the full snapshot
//!
//! All checks run before the first mutation, so a failed operation never
//! reaches the store. A full facility is reported as `Error::FacilityFull`;
//! choosing an alternate and retrying is up to the caller (see
//! [`place_with_alternates`]).

use crate::identity::unique_patient_id;
use crate::journal::{EventSink, PlacementChange, PlacementEvent};
use crate::policy::CapacityPolicy;
use crate::store::RecordStore;
use crate::{CovidStatus, Error, PatientRecord, RecordTable, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Default re-roll budget for new patient ids
pub const DEFAULT_MAX_ID_ATTEMPTS: u32 = 64;

/// Outcome of a successful transfer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transfer {
    /// The record as committed
    pub record: PatientRecord,
    /// Facility the patient occupied before the transfer
    pub from: String,
}

impl Transfer {
    /// False when the patient was already at the destination
    pub fn moved(&self) -> bool {
        self.from != self.record.facility
    }
}

/// Applies admit, transfer, status-update and discharge against a store
pub struct PlacementEngine<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    policy: &'a CapacityPolicy,
    rng: StdRng,
    max_id_attempts: u32,
    journal: Option<Box<dyn EventSink>>,
}

impl<'a, S: RecordStore + ?Sized> PlacementEngine<'a, S> {
    pub fn new(store: &'a S, policy: &'a CapacityPolicy) -> Self {
        Self {
            store,
            policy,
            rng: StdRng::from_entropy(),
            max_id_attempts: DEFAULT_MAX_ID_ATTEMPTS,
            journal: None,
        }
    }

    /// Use a specific random source for patient ids
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_max_id_attempts(mut self, max_id_attempts: u32) -> Self {
        self.max_id_attempts = max_id_attempts.max(1);
        self
    }

    /// Record every committed transition in `journal`
    pub fn with_journal(mut self, journal: impl EventSink + 'static) -> Self {
        self.journal = Some(Box::new(journal));
        self
    }

    pub fn policy(&self) -> &CapacityPolicy {
        self.policy
    }

    /// Admit a new patient to `facility`.
    ///
    /// Fails with `FacilityFull` without touching the table when the facility
    /// has no free capacity.
    pub fn admit(
        &mut self,
        facility: &str,
        severity_status: &str,
        covid_status: CovidStatus,
    ) -> Result<PatientRecord> {
        let capacity = self.policy.capacity_of(facility)?;

        let mut table = self.load()?;
        self.policy.check_admission(&table, facility)?;

        let patient_id = unique_patient_id(&table, &mut self.rng, self.max_id_attempts)?;
        let record = PatientRecord {
            patient_id,
            facility: facility.to_string(),
            severity_status: severity_status.to_string(),
            covid_status,
        };

        table.insert(record.clone()).map_err(|_| Error::IdentifierCollision {
            attempts: self.max_id_attempts,
        })?;
        self.commit(&table)?;

        tracing::info!(
            "Admitted patient {} to {} ({}/{})",
            record.patient_id,
            facility,
            table.count_at(facility),
            capacity
        );
        self.record_event(PlacementEvent::new(
            &record.patient_id,
            PlacementChange::Admitted {
                facility: facility.to_string(),
            },
        ));
        Ok(record)
    }

    /// Move an existing patient to `new_facility`.
    ///
    /// Transferring a patient to the facility they already occupy does not
    /// raise occupancy, so it succeeds without a capacity check or a write.
    pub fn transfer(&mut self, patient_id: &str, new_facility: &str) -> Result<Transfer> {
        self.policy.ensure_known(new_facility)?;

        let mut table = self.load()?;
        let current = table
            .find(patient_id)
            .ok_or_else(|| Error::PatientNotFound(patient_id.to_string()))?
            .clone();

        if current.facility == new_facility {
            tracing::info!(
                "Patient {} is already at {}, nothing to transfer",
                patient_id,
                new_facility
            );
            return Ok(Transfer {
                from: current.facility.clone(),
                record: current,
            });
        }

        self.policy.check_admission(&table, new_facility)?;

        let record = match table.find_mut(patient_id) {
            Some(record) => {
                record.facility = new_facility.to_string();
                record.clone()
            }
            None => return Err(Error::PatientNotFound(patient_id.to_string())),
        };
        self.commit(&table)?;

        tracing::info!(
            "Transferred patient {} from {} to {}",
            patient_id,
            current.facility,
            new_facility
        );
        self.record_event(PlacementEvent::new(
            patient_id,
            PlacementChange::Transferred {
                from: current.facility.clone(),
                to: new_facility.to_string(),
            },
        ));
        Ok(Transfer {
            record,
            from: current.facility,
        })
    }

    /// Replace a patient's severity status. Returns the previous status.
    ///
    /// Occupancy is unchanged, so no capacity check is made. A facility that
    /// was over its limit when loaded stays over it after this write.
    pub fn update_status(&mut self, patient_id: &str, new_status: &str) -> Result<String> {
        let mut table = self.load()?;
        let record = table
            .find_mut(patient_id)
            .ok_or_else(|| Error::PatientNotFound(patient_id.to_string()))?;
        let previous = std::mem::replace(&mut record.severity_status, new_status.to_string());
        self.commit(&table)?;

        tracing::info!(
            "Updated status of patient {}: {:?} -> {:?}",
            patient_id,
            previous,
            new_status
        );
        self.record_event(PlacementEvent::new(
            patient_id,
            PlacementChange::StatusUpdated {
                from: previous.clone(),
                to: new_status.to_string(),
            },
        ));
        Ok(previous)
    }

    /// Remove a patient from the table. Returns the removed record.
    pub fn discharge(&mut self, patient_id: &str) -> Result<PatientRecord> {
        let mut table = self.load()?;
        let record = table
            .remove(patient_id)
            .ok_or_else(|| Error::PatientNotFound(patient_id.to_string()))?;
        self.commit(&table)?;

        tracing::info!(
            "Discharged patient {} from {}",
            patient_id,
            record.facility
        );
        self.record_event(PlacementEvent::new(
            patient_id,
            PlacementChange::Discharged {
                facility: record.facility.clone(),
            },
        ));
        Ok(record)
    }

    /// Load the current snapshot.
    ///
    /// A table that already exceeds a capacity (for example after a limit was
    /// lowered in configuration) is accepted with a warning. Admissions and
    /// transfers into such a facility keep failing with `FacilityFull` until
    /// it drops below its limit, but capacity-neutral writes such as a status
    /// update or a discharge still commit the over-capacity snapshot as is.
    fn load(&self) -> Result<RecordTable> {
        let table = self.store.load()?;
        for (facility, occupancy, capacity) in self.policy.violations(&table) {
            tracing::warn!(
                "Facility {} holds {} patients but its capacity is {}",
                facility,
                occupancy,
                capacity
            );
        }
        Ok(table)
    }

    fn commit(&self, table: &RecordTable) -> Result<u64> {
        self.store.save(table)
    }

    fn record_event(&mut self, event: PlacementEvent) {
        if let Some(journal) = self.journal.as_mut() {
            if let Err(e) = journal.append(&event) {
                tracing::warn!(
                    "Committed change for patient {} could not be journaled: {}",
                    event.patient_id,
                    e
                );
            }
        }
    }
}

/// Run a placement, asking for an alternate facility each time the target is full.
///
/// `attempt` performs the whole operation against one facility. When it
/// fails with a recoverable error, `next_facility` is asked for a
/// replacement; `None` abandons the placement and yields `Ok(None)`. Any
/// other error is returned as is. Each attempt reloads the table, so a
/// retry sees whatever was committed in the meantime.
pub fn place_with_alternates<T, A, N>(
    initial: &str,
    mut attempt: A,
    mut next_facility: N,
) -> Result<Option<T>>
where
    A: FnMut(&str) -> Result<T>,
    N: FnMut(&Error) -> Option<String>,
{
    let mut facility = initial.to_string();
    loop {
        match attempt(&facility) {
            Ok(placed) => return Ok(Some(placed)),
            Err(err) if err.is_recoverable() => match next_facility(&err) {
                Some(alternate) => {
                    tracing::info!("Retrying placement at {} after: {}", alternate, err);
                    facility = alternate;
                }
                None => {
                    tracing::info!("Placement abandoned after: {}", err);
                    return Ok(None);
                }
            },
            Err(err) => return Err(err),
        }
    }
}
