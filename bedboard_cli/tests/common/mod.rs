//! Shared helpers for the bedboard CLI tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const HEADER: &str = "Patient_ID,Hospital,Status,Covid_Positive";

/// Temp directory holding the roster, journal and XDG homes for one test
pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    pub fn roster(&self) -> PathBuf {
        self.dir.path().join("patients.csv")
    }

    pub fn journal(&self) -> PathBuf {
        self.dir.path().join("placements.jsonl")
    }

    /// CLI command isolated from the user's config and pointed at the sandbox roster
    pub fn cli(&self) -> Command {
        let mut cmd = Command::cargo_bin("bedboard").expect("Failed to find bedboard binary");
        cmd.env("XDG_CONFIG_HOME", self.dir.path().join("config"))
            .env("XDG_DATA_HOME", self.dir.path().join("data"))
            .env_remove("RUST_LOG")
            .arg("--roster")
            .arg(self.roster());
        cmd
    }

    /// Write a roster with `count` stable patients per facility
    pub fn seed(&self, counts: &[(&str, usize)]) {
        let mut contents = String::from(HEADER);
        contents.push('\n');
        for (facility, count) in counts {
            for i in 0..*count {
                contents.push_str(&format!(
                    "{:03}{},{},stable,negative\n",
                    i,
                    facility.to_lowercase(),
                    facility
                ));
            }
        }
        fs::write(self.roster(), contents).expect("Failed to write roster");
    }

    pub fn roster_contents(&self) -> String {
        fs::read_to_string(self.roster()).expect("Failed to read roster")
    }

    /// Roster rows as `(id, facility, status, covid)`
    pub fn rows(&self) -> Vec<(String, String, String, String)> {
        read_rows(&self.roster())
    }

    pub fn count_at(&self, facility: &str) -> usize {
        self.rows().iter().filter(|r| r.1 == facility).count()
    }
}

pub fn read_rows(path: &Path) -> Vec<(String, String, String, String)> {
    let mut reader = csv::Reader::from_path(path).expect("Failed to open roster");
    reader
        .deserialize::<(String, String, String, String)>()
        .map(|row| row.expect("Malformed roster row"))
        .collect()
}
