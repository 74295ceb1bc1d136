//! Error types for the bedboard_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for bedboard_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The durable record table could not be read or written
    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    /// Facility name is not part of the configured facility set
    #[error("Unknown facility: {0}")]
    UnknownFacility(String),

    /// Admission control rejected the placement
    #[error("Facility {facility} is full ({capacity} of {capacity} beds occupied)")]
    FacilityFull { facility: String, capacity: u32 },

    /// Referenced patient does not exist in the record table
    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    /// No unused patient identifier was found within the re-roll budget
    #[error("Could not generate a unique patient id after {attempts} attempts")]
    IdentifierCollision { attempts: u32 },

    /// The stored table advanced since it was loaded
    #[error("Record table changed since it was loaded (expected version {expected}, found {found})")]
    Conflict { expected: u64, found: u64 },

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the operation may be retried with corrected input.
    ///
    /// Only a full facility qualifies: the operator picks another facility
    /// and the same operation runs again against a freshly loaded table.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::FacilityFull { .. })
    }

    pub(crate) fn store(path: &std::path::Path, cause: impl std::fmt::Display) -> Self {
        Error::StoreUnavailable(format!("{}: {}", path.display(), cause))
    }
}
