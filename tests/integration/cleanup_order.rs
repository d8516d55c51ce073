//! Cleanup integration tests
//!
//! Resources are deleted newest first, with the confirmation flag, once.

use super::harness::{command, xbe_harness, Fixture, HarnessAssertions};
use predicates::prelude::*;

#[test]
fn dependents_are_deleted_before_parents() {
    let fixture = Fixture::new();
    let suite = fixture.suite("lifecycle");
    xbe_harness(&fixture, &["run", suite.to_str().unwrap()]).assert_success();

    let customer = fixture
        .call_index("do customers delete 99 --confirm")
        .expect("customer should be deleted");
    let broker = fixture
        .call_index("do brokers delete 42 --confirm")
        .expect("broker should be deleted");
    assert!(customer < broker, "calls: {:?}", fixture.calls());
}

#[test]
fn each_resource_is_deleted_once() {
    let fixture = Fixture::new();
    let suite = fixture.suite("lifecycle");
    xbe_harness(&fixture, &["run", suite.to_str().unwrap()]).assert_success();

    let deletes = fixture
        .calls()
        .into_iter()
        .filter(|c| c.ends_with("--confirm"))
        .count();
    assert_eq!(deletes, 2);
}

#[test]
fn custom_confirm_flag_failure_does_not_change_verdict() {
    let fixture = Fixture::new();
    let suite = fixture.suite("lifecycle");

    command(&fixture)
        .env("XBE_CONFIRM_FLAG", "--yes")
        .args(["run", suite.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("cleanup action(s) failed"));

    assert!(fixture
        .calls()
        .contains(&"do brokers delete 42 --yes".to_string()));
}
