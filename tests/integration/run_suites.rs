//! `run` integration tests
//!
//! Verifies verdicts, totals and exit codes for suites run against the
//! fake CLI.

use super::harness::{xbe_harness, xbe_harness_with_env, Fixture, HarnessAssertions};
use std::collections::HashMap;

#[test]
fn passing_suite_exits_zero() {
    let fixture = Fixture::new();
    let suite = fixture.suite("lifecycle");
    let result = xbe_harness(&fixture, &["run", suite.to_str().unwrap()]);

    result.assert_success();
    result.assert_totals(6, 6, 0, 0);
    result.assert_output_contains("✓ create broker");
}

#[test]
fn failures_exit_one_and_are_listed() {
    let fixture = Fixture::new();
    let suite = fixture.suite("failing");
    let result = xbe_harness(&fixture, &["run", suite.to_str().unwrap()]);

    result.assert_exit_code(1);
    result.assert_totals(3, 1, 2, 0);
    result.assert_output_contains("Failed tests:");
    result.assert_output_contains("failures: show unknown broker");
    result.assert_output_contains("failures: first truck");
}

#[test]
fn cleanup_runs_even_when_tests_fail() {
    let fixture = Fixture::new();
    let suite = fixture.suite("failing");
    xbe_harness(&fixture, &["run", suite.to_str().unwrap()]).assert_failure();

    assert!(fixture
        .calls()
        .contains(&"do brokers delete 42 --confirm".to_string()));
}

#[test]
fn authorization_refusal_is_skipped() {
    let fixture = Fixture::new();
    let suite = fixture.suite("limited");
    let result = xbe_harness(&fixture, &["run", suite.to_str().unwrap()]);

    result.assert_success();
    result.assert_totals(1, 0, 0, 1);
    result.assert_output_contains("skipped: environment limitation: forbidden");
}

#[test]
fn missing_fixture_skips_the_suite() {
    let fixture = Fixture::new();
    let suite = fixture.suite("requires");
    let result = xbe_harness(&fixture, &["run", suite.to_str().unwrap()]);

    result.assert_success();
    result.assert_totals(1, 0, 0, 1);
    result.assert_output_contains("missing broker_fixture");
    assert!(fixture.calls().is_empty());
}

#[test]
fn fixture_override_is_used() {
    let fixture = Fixture::new();
    let suite = fixture.suite("requires");
    let env = HashMap::from([("XBE_TEST_BROKER_FIXTURE".to_string(), "42".to_string())]);
    let result = xbe_harness_with_env(&fixture, &["run", suite.to_str().unwrap()], env);

    result.assert_success();
    result.assert_totals(1, 1, 0, 0);
    assert_eq!(fixture.calls(), vec!["view brokers show 42 --json".to_string()]);
}

#[test]
fn abort_stops_later_suites() {
    let fixture = Fixture::new();
    let abort = fixture.suite("abort");
    let lifecycle = fixture.suite("lifecycle");
    let result = xbe_harness(
        &fixture,
        &["run", abort.to_str().unwrap(), lifecycle.to_str().unwrap()],
    );

    result.assert_exit_code(1);
    result.assert_totals(1, 0, 1, 0);
    assert_eq!(fixture.calls(), vec!["do crafts create".to_string()]);
}

#[test]
fn non_json_output_fails_the_step() {
    let fixture = Fixture::new();
    let suite = fixture.suite("malformed");
    let result = xbe_harness(&fixture, &["run", suite.to_str().unwrap()]);

    result.assert_exit_code(1);
    result.assert_output_contains("output is not JSON");
}

#[test]
fn invalid_suite_runs_nothing() {
    let fixture = Fixture::new();
    let lifecycle = fixture.suite("lifecycle");
    let invalid = fixture.suite("invalid");
    let result = xbe_harness(
        &fixture,
        &["run", lifecycle.to_str().unwrap(), invalid.to_str().unwrap()],
    );

    result.assert_exit_code(1);
    result.assert_output_contains("Invalid step 'bad path'");
    assert!(fixture.calls().is_empty());
}

#[test]
fn missing_cli_binary_is_reported() {
    let fixture = Fixture::new();
    let suite = fixture.suite("lifecycle");
    let result = xbe_harness(
        &fixture,
        &["run", suite.to_str().unwrap(), "--bin", "/nonexistent/xbe"],
    );

    result.assert_exit_code(1);
    result.assert_output_contains("CLI binary '/nonexistent/xbe' not found");
}

#[test]
fn verbose_shows_command_lines() {
    let fixture = Fixture::new();
    let suite = fixture.suite("limited");
    let result = xbe_harness(&fixture, &["run", "--verbose", suite.to_str().unwrap()]);

    result.assert_success();
    result.assert_output_contains("do crafts create --name Welding");
    result.assert_output_contains("not authorized");
}
