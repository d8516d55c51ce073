//! Binary execution for integration tests

use super::Fixture;
use std::collections::HashMap;
use std::process::{Command, Output};

/// Result of running the xbe-harness binary
#[derive(Debug)]
pub struct RunResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Standard output as string
    pub stdout: String,
    /// Standard error as string
    pub stderr: String,
}

impl RunResult {
    /// Check if command succeeded (exit code 0)
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Check if stdout contains a substring
    pub fn stdout_contains(&self, needle: &str) -> bool {
        self.stdout.contains(needle)
    }

    /// Combined output (stdout + stderr)
    pub fn output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }

    /// Check if combined output contains a substring
    pub fn output_contains(&self, needle: &str) -> bool {
        self.output().contains(needle)
    }
}

impl From<Output> for RunResult {
    fn from(output: Output) -> Self {
        Self {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// xbe-harness preconfigured for the fixture: fake CLI, isolated HOME and
/// no inherited XBE_* settings
pub fn std_command(fixture: &Fixture) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin("xbe-harness"));
    cmd.current_dir(&fixture.path);

    // Clear potentially interfering env vars
    for (key, _) in std::env::vars() {
        if key.starts_with("XBE_") {
            cmd.env_remove(&key);
        }
    }

    cmd.env("HOME", fixture.home());
    cmd.env("XBE_BIN", fixture.bin());
    cmd.env("FAKE_XBE_LOG", fixture.log_path());
    cmd
}

/// [`std_command`] with assert_cmd's assertions
pub fn command(fixture: &Fixture) -> assert_cmd::Command {
    assert_cmd::Command::from_std(std_command(fixture))
}

/// Run xbe-harness in the fixture workspace
pub fn xbe_harness(fixture: &Fixture, args: &[&str]) -> RunResult {
    xbe_harness_with_env(fixture, args, HashMap::new())
}

/// Run xbe-harness with custom environment variables
pub fn xbe_harness_with_env(
    fixture: &Fixture,
    args: &[&str],
    env: HashMap<String, String>,
) -> RunResult {
    let mut cmd = command(fixture);
    cmd.args(args);

    // Apply custom env vars
    for (key, value) in env {
        cmd.env(&key, &value);
    }

    let output = cmd.output().expect("Failed to execute xbe-harness");
    RunResult::from(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_result_success() {
        let result = RunResult {
            exit_code: 0,
            stdout: "output".to_string(),
            stderr: "".to_string(),
        };
        assert!(result.success());
    }

    #[test]
    fn run_result_contains() {
        let result = RunResult {
            exit_code: 1,
            stdout: "Total: 1".to_string(),
            stderr: "warning message".to_string(),
        };
        assert!(!result.success());
        assert!(result.stdout_contains("Total"));
        assert!(result.output_contains("warning"));
    }
}
