//! Custom assertions for xbe-harness integration tests

use super::RunResult;

/// Extension trait for run-report assertions
pub trait HarnessAssertions {
    /// Assert the printed totals line
    fn assert_totals(&self, total: usize, passed: usize, failed: usize, skipped: usize);

    /// Assert that output contains a message
    fn assert_output_contains(&self, message: &str);

    /// Assert that the process exited with a specific code
    fn assert_exit_code(&self, code: i32);

    /// Assert command succeeded
    fn assert_success(&self);

    /// Assert command failed
    fn assert_failure(&self);
}

impl HarnessAssertions for RunResult {
    fn assert_totals(&self, total: usize, passed: usize, failed: usize, skipped: usize) {
        let line = format!(
            "Total: {}  Passed: {}  Failed: {}  Skipped: {}",
            total, passed, failed, skipped
        );
        assert!(
            self.stdout_contains(&line),
            "Expected '{}' in output:\nstdout: {}\nstderr: {}",
            line,
            self.stdout,
            self.stderr
        );
    }

    fn assert_output_contains(&self, message: &str) {
        assert!(
            self.output_contains(message),
            "Expected '{}' in output:\nstdout: {}\nstderr: {}",
            message,
            self.stdout,
            self.stderr
        );
    }

    fn assert_exit_code(&self, code: i32) {
        assert_eq!(
            self.exit_code, code,
            "Unexpected exit code:\nstdout: {}\nstderr: {}",
            self.stdout, self.stderr
        );
    }

    fn assert_success(&self) {
        assert!(
            self.success(),
            "Expected success (exit 0), got exit {}:\nstdout: {}\nstderr: {}",
            self.exit_code,
            self.stdout,
            self.stderr
        );
    }

    fn assert_failure(&self) {
        assert!(
            !self.success(),
            "Expected failure (non-zero exit), got exit 0:\nstdout: {}\nstderr: {}",
            self.stdout,
            self.stderr
        );
    }
}
