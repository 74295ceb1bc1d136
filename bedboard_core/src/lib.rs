#![forbid(unsafe_code)]

//! Core domain model and business logic for the Bedboard placement system.
//!
//! This crate provides:
//! - Domain types (patient records, record table, facilities)
//! - Record store (CSV table with locking and versioned atomic saves)
//! - Capacity policy (admission control)
//! - Placement engine (admit, transfer, status update, discharge)
//! - Read-only reports and the placement journal

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod store;
pub mod policy;
pub mod identity;
pub mod journal;
pub mod report;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use store::{CsvStore, MemoryStore, RecordStore};
pub use policy::{occupancy_of, CapacityPolicy};
pub use journal::{read_events, EventSink, JsonlJournal, PlacementChange, PlacementEvent};
pub use report::{capacity_summary, full_roster, occupancy_report, FacilityOccupancy};
pub use engine::{place_with_alternates, PlacementEngine, Transfer};
