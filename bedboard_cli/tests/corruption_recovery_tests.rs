//! Corruption recovery tests for bedboard.
//!
//! These tests verify the system can handle:
//! - Missing or malformed roster files
//! - Corrupted snapshot metadata
//! - Corrupted journal files
//! - Rosters written by spreadsheet tools

mod common;

use common::{Sandbox, HEADER};
use predicates::prelude::*;
use std::fs;

#[test]
fn test_missing_roster_is_reported() {
    let sandbox = Sandbox::new();

    sandbox
        .cli()
        .arg("list")
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("Record store unavailable")
                .and(predicate::str::contains("bedboard init")),
        );

    // A failed admission must not create the roster either
    sandbox
        .cli()
        .args(["admit", "--facility", "A", "--status", "stable"])
        .assert()
        .failure();
    assert!(!sandbox.roster().exists());
}

#[test]
fn test_missing_column_is_reported() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.roster(), "Patient_ID,Status\n101a,stable\n").unwrap();

    sandbox
        .cli()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required column 'Hospital'"));
}

#[test]
fn test_duplicate_ids_block_writes() {
    let sandbox = Sandbox::new();
    let contents = format!("{}\n101a,A,stable,no\n101a,B,serious,yes\n", HEADER);
    fs::write(sandbox.roster(), &contents).unwrap();

    sandbox
        .cli()
        .args(["discharge", "101a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate patient id 101a"));

    assert_eq!(sandbox.roster_contents(), contents);
}

#[test]
fn test_corrupted_snapshot_metadata() {
    let sandbox = Sandbox::new();
    sandbox.seed(&[("A", 1)]);
    fs::write(
        sandbox.dir.path().join("patients.csv.meta.json"),
        "{ invalid json }}}",
    )
    .unwrap();

    sandbox
        .cli()
        .args(["status", "000a", "critical"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Record store unavailable"));

    assert_eq!(sandbox.rows()[0].2, "stable");
}

#[test]
fn test_corrupted_journal_does_not_block_operations() {
    let sandbox = Sandbox::new();
    sandbox.seed(&[("A", 1)]);
    fs::write(sandbox.journal(), "{ invalid json }\n{ more invalid }").unwrap();

    sandbox.cli().args(["transfer", "000a", "B"]).assert().success();

    sandbox
        .cli()
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("transferred A → B"));
}

#[test]
fn test_roster_with_index_column_is_readable() {
    let sandbox = Sandbox::new();
    fs::write(
        sandbox.roster(),
        ",Patient_ID,Hospital,Status,Covid_Positive\n0,101a,A,stable,No\n1,102b,B,critical,Yes\n",
    )
    .unwrap();

    sandbox
        .cli()
        .arg("list")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("101a")
                .and(predicate::str::contains("positive"))
                .and(predicate::str::contains("2 patient(s)")),
        );

    // The next save rewrites the table in the canonical layout
    sandbox.cli().args(["discharge", "101a"]).assert().success();
    let contents = sandbox.roster_contents();
    assert!(contents.starts_with(HEADER));
    assert!(contents.contains("102b,B,critical,positive"));
}
