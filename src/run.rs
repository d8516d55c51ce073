//! Test case and test run bookkeeping
//!
//! A case moves `Pending -> {Pass | Fail | Skip}` exactly once. A run moves
//! `Collecting -> Reporting -> Terminated`.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pending,
    Pass,
    Fail,
    Skip,
}

impl TestStatus {
    pub fn is_terminal(self) -> bool {
        self != TestStatus::Pending
    }
}

/// How a case reached its terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finalizer {
    /// `pass()`/`fail()`/`skip()` called by the test
    Explicit,
    /// A failed assertion
    Assertion,
    /// The harness closed a case the test left pending
    Harness,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestCase {
    pub name: String,
    /// `describe` group the case was declared under
    pub group: Option<String>,
    pub status: TestStatus,
    /// Failure or skip messages, in the order they were recorded
    pub messages: Vec<String>,
    #[serde(skip)]
    finalized_by: Option<Finalizer>,
}

impl TestCase {
    pub fn new(name: &str, group: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            group: group.map(str::to_string),
            status: TestStatus::Pending,
            messages: Vec::new(),
            finalized_by: None,
        }
    }

    pub fn finalized_by(&self) -> Option<Finalizer> {
        self.finalized_by
    }

    /// First recorded message, if any
    pub fn message(&self) -> Option<&str> {
        self.messages.first().map(String::as_str)
    }

    /// Move a pending case to a terminal state. Returns false, changing
    /// nothing, when the case is already terminal.
    pub fn finalize(&mut self, status: TestStatus, message: Option<String>, by: Finalizer) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.messages.extend(message);
        self.finalized_by = Some(by);
        true
    }

    /// Attach another failure message to an already failed case
    pub fn note_failure(&mut self, message: String) {
        self.messages.push(message);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Collecting,
    Reporting,
    Terminated,
}

/// Counts produced once a run is reported
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Harness-contract violations (double or missing finalizers)
    pub violations: usize,
    /// Cleanup entries that could not be removed; never affects the verdict
    pub cleanup_failures: usize,
    /// The run stopped on an interrupt signal
    pub interrupted: bool,
}

impl Summary {
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    /// 0 when nothing failed, 1 on any failure, 130 when interrupted
    pub fn exit_code(&self) -> i32 {
        if self.interrupted {
            130
        } else if self.success() {
            0
        } else {
            1
        }
    }
}

/// Ordered cases plus counters for one run
#[derive(Debug, Clone, Serialize)]
pub struct TestRun {
    cases: Vec<TestCase>,
    passed: usize,
    failed: usize,
    skipped: usize,
    violations: usize,
    state: RunState,
}

impl Default for TestRun {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRun {
    pub fn new() -> Self {
        Self {
            cases: Vec::new(),
            passed: 0,
            failed: 0,
            skipped: 0,
            violations: 0,
            state: RunState::Collecting,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn current(&self) -> Option<&TestCase> {
        self.cases.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut TestCase> {
        self.cases.last_mut()
    }

    pub fn push(&mut self, case: TestCase) {
        self.cases.push(case);
    }

    pub fn record_violation(&mut self) {
        self.violations += 1;
    }

    /// Finalize the current case and bump the matching counter
    pub fn finalize_current(
        &mut self,
        status: TestStatus,
        message: Option<String>,
        by: Finalizer,
    ) -> bool {
        let Some(case) = self.cases.last_mut() else {
            return false;
        };
        if !case.finalize(status, message, by) {
            return false;
        }
        match status {
            TestStatus::Pass => self.passed += 1,
            TestStatus::Fail => self.failed += 1,
            TestStatus::Skip => self.skipped += 1,
            TestStatus::Pending => {}
        }
        true
    }

    /// Enter `Reporting`; only the first call succeeds
    pub fn begin_report(&mut self) -> bool {
        if self.state != RunState::Collecting {
            return false;
        }
        self.state = RunState::Reporting;
        true
    }

    pub fn terminate(&mut self) {
        self.state = RunState::Terminated;
    }

    pub fn summary(&self) -> Summary {
        Summary {
            total: self.cases.len(),
            passed: self.passed,
            failed: self.failed,
            skipped: self.skipped,
            violations: self.violations,
            cleanup_failures: 0,
            interrupted: false,
        }
    }
}
