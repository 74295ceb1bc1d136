//! Configuration file support for Bedboard.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/bedboard/config.toml`.

use crate::policy::CapacityPolicy;
use crate::{Error, Facility, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Facility set used when no configuration file names one
static DEFAULT_FACILITIES: Lazy<Vec<Facility>> = Lazy::new(|| {
    vec![
        Facility::new("A", 20),
        Facility::new("B", 13),
        Facility::new("C", 10),
    ]
});

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default = "default_facilities")]
    pub facilities: Vec<Facility>,

    #[serde(default)]
    pub placement: PlacementConfig,

    #[serde(default)]
    pub journal: JournalConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            facilities: default_facilities(),
            placement: PlacementConfig::default(),
            journal: JournalConfig::default(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_roster_path")]
    pub roster_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            roster_path: default_roster_path(),
        }
    }
}

/// Placement engine parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlacementConfig {
    #[serde(default = "default_max_id_attempts")]
    pub max_id_attempts: u32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            max_id_attempts: default_max_id_attempts(),
        }
    }
}

/// Placement journal configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JournalConfig {
    #[serde(default = "default_journal_enabled")]
    pub enabled: bool,

    #[serde(default = "default_journal_path")]
    pub path: PathBuf,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: default_journal_enabled(),
            path: default_journal_path(),
        }
    }
}

// Default value functions
fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bedboard")
}

fn default_roster_path() -> PathBuf {
    data_dir().join("patients.csv")
}

fn default_journal_path() -> PathBuf {
    data_dir().join("placements.jsonl")
}

fn default_journal_enabled() -> bool {
    true
}

fn default_facilities() -> Vec<Facility> {
    DEFAULT_FACILITIES.to_vec()
}

fn default_max_id_attempts() -> u32 {
    64
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load and validate configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bedboard")
            .join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Check the facility set and placement parameters
    pub fn validate(&self) -> Result<()> {
        if self.facilities.is_empty() {
            return Err(Error::Config("at least one facility must be configured".into()));
        }

        let mut seen = HashSet::new();
        for facility in &self.facilities {
            if facility.name.trim().is_empty() {
                return Err(Error::Config("facility name must not be empty".into()));
            }
            if facility.name.trim() != facility.name {
                return Err(Error::Config(format!(
                    "facility name {:?} has leading or trailing whitespace",
                    facility.name
                )));
            }
            if facility.capacity == 0 {
                return Err(Error::Config(format!(
                    "facility {} must have a capacity of at least 1",
                    facility.name
                )));
            }
            if !seen.insert(facility.name.as_str()) {
                return Err(Error::Config(format!(
                    "facility {} is configured more than once",
                    facility.name
                )));
            }
        }

        if self.placement.max_id_attempts == 0 {
            return Err(Error::Config("placement.max_id_attempts must be at least 1".into()));
        }

        Ok(())
    }

    /// Build the capacity policy for the configured facility set
    pub fn capacity_policy(&self) -> Result<CapacityPolicy> {
        self.validate()?;
        CapacityPolicy::new(self.facilities.iter().cloned())
    }
}
