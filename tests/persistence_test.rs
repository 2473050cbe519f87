#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::process::Command;
use tempfile::tempdir;

mod common;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("ledger_db");

    // First run: one verified payment for driver 5.
    let journal1 = common::write_journal(&[
        "capture,1,101,5,55,100.00,r.jpg,,",
        "verify,1,,,,,,,",
    ]);
    let output1 = Command::new(cargo_bin!("driver-ledger"))
        .arg(journal1.path())
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("5,1,100.00"));

    // Second run against the same database: the first payment was
    // recovered and the new one joins the batch.
    let journal2 = common::write_journal(&[
        "capture,2,102,5,55,50.00,r.jpg,,",
        "verify,2,,,,,,,",
    ]);
    let output2 = Command::new(cargo_bin!("driver-ledger"))
        .arg(journal2.path())
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    assert!(stdout2.contains("5,2,150.00"));
}

#[test]
fn test_rocksdb_settlement_is_durable() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("ledger_db");

    let journal1 = common::write_journal(&[
        "capture,1,101,5,55,100.00,r.jpg,,",
        "verify,1,,,,,,,",
        "settle,,,5,,,,,",
    ]);
    let output1 = Command::new(cargo_bin!("driver-ledger"))
        .arg(journal1.path())
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("failed to execute command");
    assert!(output1.status.success());

    // A restart must not resurrect the settled payment.
    let journal2 = common::write_journal(&[]);
    let output2 = Command::new(cargo_bin!("driver-ledger"))
        .arg(journal2.path())
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    assert!(!stdout2.contains("5,"));
}
