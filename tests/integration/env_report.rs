//! `env` integration tests

use super::harness::{command, Fixture};
use predicates::prelude::*;
use std::fs;

#[test]
fn json_report_redacts_the_token() {
    let fixture = Fixture::new();

    let output = command(&fixture)
        .env("XBE_TOKEN", "super-secret-token")
        .env("XBE_BASE_URL", "https://staging.example.com/")
        .env("XBE_TEST_BROKER_ID", "42")
        .args(["env", "--json"])
        .output()
        .expect("Failed to execute xbe-harness");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("super-secret-token"));

    let report: serde_json::Value = serde_json::from_str(&stdout).expect("env --json output");
    assert_eq!(report["token_set"], true);
    assert_eq!(report["base_url"], "https://staging.example.com");
    assert_eq!(report["fixtures"]["broker_id"], "42");
    assert_eq!(report["confirm_flag"], "--confirm");
    assert_eq!(
        report["bin_path"].as_str(),
        fixture.bin().to_str(),
        "fake CLI should resolve"
    );
}

#[test]
fn config_file_is_read_and_env_wins() {
    let fixture = Fixture::new();
    let config_dir = fixture.home().join(".xbe-harness");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.toml"),
        "[cli]\nconfirm_flag = \"--yes\"\n\n[api]\nbase_url = \"https://file.example.com\"\n",
    )
    .unwrap();

    command(&fixture)
        .env("XBE_BASE_URL", "https://env.example.com")
        .arg("env")
        .assert()
        .success()
        .stdout(predicate::str::contains("Base URL: https://env.example.com"))
        .stdout(predicate::str::contains("Confirm flag: --yes"))
        .stdout(predicate::str::contains("Token: not set"));
}

#[test]
fn missing_cli_is_flagged() {
    let fixture = Fixture::new();

    command(&fixture)
        .env("XBE_BIN", "definitely-not-installed-xbe")
        .arg("env")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "CLI: definitely-not-installed-xbe not found",
        ));
}
