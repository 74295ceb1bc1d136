//! Patient identifier generation.
//!
//! Identifiers are three random decimal digits followed by one random
//! lowercase letter (`"042k"`), which leaves 26,000 possible values. New ids
//! are re-rolled against the current table until an unused one turns up.

use crate::{Error, RecordTable, Result};
use rand::Rng;

const DIGITS: &[u8] = b"0123456789";
const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Draw one candidate identifier
pub fn generate_patient_id<R: Rng>(rng: &mut R) -> String {
    let mut id = String::with_capacity(4);
    for _ in 0..3 {
        id.push(DIGITS[rng.gen_range(0..DIGITS.len())] as char);
    }
    id.push(LETTERS[rng.gen_range(0..LETTERS.len())] as char);
    id
}

/// Draw identifiers until one is not already in `table`.
///
/// Fails with `IdentifierCollision` once `max_attempts` candidates were taken.
pub fn unique_patient_id<R: Rng>(
    table: &RecordTable,
    rng: &mut R,
    max_attempts: u32,
) -> Result<String> {
    for attempt in 1..=max_attempts {
        let candidate = generate_patient_id(rng);
        if !table.contains(&candidate) {
            if attempt > 1 {
                tracing::debug!("Patient id {} found after {} attempts", candidate, attempt);
            }
            return Ok(candidate);
        }
        tracing::debug!("Patient id {} already in use, re-rolling", candidate);
    }

    Err(Error::IdentifierCollision {
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CovidStatus, PatientRecord};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn is_well_formed(id: &str) -> bool {
        let bytes = id.as_bytes();
        bytes.len() == 4
            && bytes[..3].iter().all(u8::is_ascii_digit)
            && bytes[3].is_ascii_lowercase()
    }

    #[test]
    fn test_generated_ids_are_well_formed() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let id = generate_patient_id(&mut rng);
            assert!(is_well_formed(&id), "bad id {}", id);
        }
    }

    #[test]
    fn test_is_well_formed() {
        assert!(is_well_formed("999z"));
        assert!(is_well_formed("000a"));
        assert!(!is_well_formed("99z"));
        assert!(!is_well_formed("999Z"));
        assert!(!is_well_formed("a999"));
    }

    #[test]
    fn test_unique_id_rerolls_on_collision() {
        let mut table = RecordTable::new();
        let first = generate_patient_id(&mut StdRng::seed_from_u64(42));
        table
            .insert(PatientRecord {
                patient_id: first.clone(),
                facility: "A".into(),
                severity_status: "stable".into(),
                covid_status: CovidStatus::Negative,
            })
            .unwrap();

        // Same seed draws `first` again, which must be skipped
        let mut rng = StdRng::seed_from_u64(42);
        let id = unique_patient_id(&table, &mut rng, 16).unwrap();
        assert_ne!(id, first);
        assert!(is_well_formed(&id));
    }

    #[test]
    fn test_exhausted_budget_is_collision() {
        let mut table = RecordTable::new();
        let taken = generate_patient_id(&mut StdRng::seed_from_u64(3));
        table
            .insert(PatientRecord {
                patient_id: taken,
                facility: "A".into(),
                severity_status: "stable".into(),
                covid_status: CovidStatus::Negative,
            })
            .unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let err = unique_patient_id(&table, &mut rng, 1).unwrap_err();
        assert!(matches!(err, Error::IdentifierCollision { attempts: 1 }));
    }
}
