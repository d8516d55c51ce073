//! Signal handling integration tests
//!
//! A signal must stop a CLI call that never returns, then report and clean
//! up before exiting with 130.

use super::harness::{std_command, Fixture};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn sigterm_stops_a_hung_call_and_cleans_up() {
    let fixture = Fixture::new();
    let suite = fixture.suite("slow");
    let child = std_command(&fixture)
        .args(["run", suite.to_str().unwrap()])
        .env("FAKE_XBE_SLOW", "30")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start xbe-harness");

    let started = Instant::now();
    while fixture.call_index("view brokers list").is_none() {
        assert!(
            started.elapsed() < Duration::from_secs(10),
            "slow step never started: {:?}",
            fixture.calls()
        );
        thread::sleep(Duration::from_millis(50));
    }

    let killed = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .expect("Failed to run kill");
    assert!(killed.success());

    let output = child.wait_with_output().expect("xbe-harness output");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(
        started.elapsed() < Duration::from_secs(20),
        "harness waited for the CLI call to finish"
    );
    assert_eq!(output.status.code(), Some(130), "stdout: {}", stdout);
    assert!(stdout.contains("Interrupted, cleaning up before exit"));
    assert!(!stdout.contains("Harness misuse"));
    assert!(fixture
        .calls()
        .contains(&"do brokers delete 42 --confirm".to_string()));
}
