//! Library integration tests
//!
//! Drives `Harness` directly, the way a hand-written test program would,
//! against the fake CLI.

use super::harness::Fixture;
use xbe_harness::config::{FileConfig, HarnessConfig};
use xbe_harness::invoke::CommandInvoker;
use xbe_harness::{Harness, TestStatus};

fn harness_for(fixture: &Fixture) -> Harness {
    let config = HarnessConfig::from_sources(
        FileConfig::default(),
        [(
            "XBE_BIN".to_string(),
            fixture.bin().to_string_lossy().to_string(),
        )],
    );
    let invoker = CommandInvoker::from_config(&config)
        .env("FAKE_XBE_LOG", fixture.log_path().to_string_lossy());
    Harness::with_invoker(config, Box::new(invoker))
}

#[test]
fn scripted_lifecycle() {
    let fixture = Fixture::new();
    let mut h = harness_for(&fixture);

    h.describe("brokers");
    h.test("list brokers");
    h.invoke_json(&["view", "brokers", "list"]);
    if h.assert_success() && h.assert_json_is_array() && h.assert_json_equals(".[0].quantity", "10") {
        h.pass();
    }

    h.test("create broker");
    h.invoke_json(&["do", "brokers", "create", "--name", "Test"]);
    match h.json_value(".id") {
        Some(id) => {
            h.register_cleanup("brokers", &id);
            h.pass();
        }
        None => h.fail("no id in create output"),
    }

    h.test("delete without confirmation is refused");
    h.invoke(&["do", "brokers", "delete", "42"]);
    if h.assert_failure() {
        h.pass();
    }

    let summary = h.run_tests();
    assert_eq!(summary.passed, 3);
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(
        fixture.calls().last().map(String::as_str),
        Some("do brokers delete 42 --confirm")
    );
}

#[test]
fn failed_assertions_do_not_abort() {
    let fixture = Fixture::new();
    let mut h = harness_for(&fixture);

    h.test("first truck");
    h.invoke_json(&["view", "trucks", "list"]);
    assert!(h.assert_json_is_array());
    assert!(!h.assert_json_has(".[0].id"));

    h.test("next case still runs");
    h.invoke_json(&["view", "brokers", "list"]);
    assert!(h.assert_success());
    h.pass();

    let cases = h.results().cases();
    assert_eq!(cases[0].status, TestStatus::Fail);
    assert_eq!(cases[1].status, TestStatus::Pass);
    assert_eq!(h.run_tests().exit_code(), 1);
}

#[test]
fn dropping_the_harness_cleans_up() {
    let fixture = Fixture::new();
    {
        let mut h = harness_for(&fixture);
        h.test("create customer");
        h.invoke_json(&["do", "customers", "create"]);
        let id = h.json_value(".id").expect("customer id");
        h.register_cleanup("customers", &id);
        h.pass();
    }

    assert!(fixture
        .calls()
        .contains(&"do customers delete 99 --confirm".to_string()));
}
