//! `check` integration tests

use super::harness::{command, Fixture};
use predicates::prelude::*;

#[test]
fn valid_suites_pass() {
    let fixture = Fixture::new();
    let lifecycle = fixture.suite("lifecycle");
    let limited = fixture.suite("limited");

    command(&fixture)
        .args(["check", lifecycle.to_str().unwrap(), limited.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("brokers, 6 step(s)"))
        .stdout(predicate::str::contains("crafts, 1 step(s)"));

    assert!(fixture.calls().is_empty());
}

#[test]
fn invalid_suite_fails_with_reason() {
    let fixture = Fixture::new();
    let invalid = fixture.suite("invalid");

    command(&fixture)
        .args(["check", invalid.to_str().unwrap()])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("path must start with '.'"))
        .stdout(predicate::str::contains("1 of 1 suite(s) invalid"));
}

#[test]
fn unknown_fields_are_rejected() {
    let fixture = Fixture::new();
    let suite = fixture.write_suite(
        "typo",
        "name = \"typo\"\n\n[[step]]\nname = \"list\"\nargs = [\"view\", \"brokers\", \"list\"]\nis_aray = true\n",
    );

    command(&fixture)
        .args(["check", suite.to_str().unwrap()])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Failed to parse suite"));
}

#[test]
fn missing_file_is_reported() {
    let fixture = Fixture::new();

    command(&fixture)
        .args(["check", "no-such-suite.toml"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Failed to read suite no-such-suite.toml"));
}
