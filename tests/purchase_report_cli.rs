//! Integration tests for the purchase report binary

use assert_cmd::Command;
use predicates::prelude::*;

fn purchase_report() -> Command {
    Command::cargo_bin("complete_09_purchase_report").unwrap()
}

#[test]
fn test_single_file_report() {
    purchase_report()
        .arg("tests/fixtures/dana.dat")
        .assert()
        .success()
        .stdout(
            "dana spent $10.00 on average\n\
             \n\
             dana had the highest average: $10.00\n\
             dana had the highest total: $30.00\n",
        );
}

#[test]
fn test_average_and_total_winners_diverge() {
    let assert = purchase_report()
        .args([
            "tests/fixtures/dana.dat",
            "tests/fixtures/eli.dat",
            "tests/fixtures/finn.dat",
        ])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 6);

    // Per-file lines arrive in completion order.
    let mut per_file = lines[..3].to_vec();
    per_file.sort();
    assert_eq!(
        per_file,
        vec![
            "dana spent $10.00 on average",
            "eli spent $10.00 on average",
            "finn spent $30.00 on average",
        ]
    );
    assert_eq!(lines[3], "");
    assert_eq!(lines[4], "finn had the highest average: $30.00");
    assert_eq!(lines[5], "eli had the highest total: $50.00");
}

#[test]
fn test_requires_at_least_one_file() {
    purchase_report()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_rejects_non_data_file() {
    purchase_report()
        .args(["tests/fixtures/dana.dat", "notes.txt"])
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains(
            "notes.txt doesn't appear to be a data file.",
        ));
}

#[test]
fn test_bad_record_aborts_run() {
    purchase_report()
        .args(["tests/fixtures/broken.dat"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("highest").not())
        .stderr(predicate::str::contains("broken.dat:2"))
        .stderr(predicate::str::contains(r#"\"PurchaseTotal\": \"12.5\""#));
}

#[test]
fn test_missing_file_aborts_run() {
    purchase_report()
        .args(["tests/fixtures/dana.dat", "tests/fixtures/nobody.dat"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("highest").not())
        .stderr(predicate::str::contains("Failed to open tests/fixtures/nobody.dat"));
}

#[test]
fn test_help_lists_usage() {
    purchase_report()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("NAME.dat"));
}
