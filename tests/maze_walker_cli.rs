//! Integration tests for the maze walker binary
//!
//! Runs the compiled binary against fixture mazes and checks stdout, stderr,
//! and exit status.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn maze_walker() -> Command {
    Command::cargo_bin("complete_08_maze_walker").unwrap()
}

#[test]
fn test_walks_fixture_maze() {
    maze_walker()
        .arg("tests/fixtures/winding_maze.txt")
        .assert()
        .success()
        .stdout(
            "Step forward\n\
             Step forward\n\
             Turn right and step forward\n\
             Step forward\n\
             Turn right and step forward\n\
             Turn left and step forward\n\
             You're free!\n",
        );
}

#[test]
fn test_output_is_repeatable() {
    let first = maze_walker()
        .arg("tests/fixtures/winding_maze.txt")
        .output()
        .unwrap();
    let second = maze_walker()
        .arg("tests/fixtures/winding_maze.txt")
        .output()
        .unwrap();
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn test_missing_argument_is_usage_error() {
    maze_walker()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_extra_argument_is_usage_error() {
    maze_walker()
        .args(["a.txt", "b.txt"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_help_exits_zero() {
    maze_walker()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn test_unreadable_file() {
    let dir = TempDir::new().unwrap();
    maze_walker()
        .arg(dir.path().join("missing.txt"))
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("failed to read maze file"));
}

#[test]
fn test_ragged_rows_are_rejected() {
    maze_walker()
        .arg("tests/fixtures/ragged_maze.txt")
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("Row 2 has 2 columns. It should have 3."));
}

#[test]
fn test_extraneous_symbol_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("maze.txt");
    fs::write(&path, "#^#\n#o#\n").unwrap();

    maze_walker()
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("extraneous symbol 'o' at row 2, column 2"));
}

#[test]
fn test_logs_stay_off_stdout() {
    maze_walker()
        .args(["-vvv", "tests/fixtures/winding_maze.txt"])
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stdout(predicate::str::ends_with("You're free!\n"))
        .stdout(predicate::str::contains("loaded maze").not())
        .stderr(predicate::str::contains("loaded maze"));
}
