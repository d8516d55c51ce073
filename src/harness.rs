//! The test harness: owns one run's cases, invocations and cleanup
//!
//! Assertions record a verdict on the current case and return; nothing a
//! test step does aborts the program except [`Harness::run_tests`] (or
//! [`Harness::exit`]) and an interrupt signal.

use crate::assert::{self, text_of, Verdict};
use crate::cleanup::{CleanupRegistry, CleanupReport};
use crate::config::HarnessConfig;
use crate::http::DirectClient;
use crate::invoke::{to_args, with_json_flag, CommandInvoker, Invocation, Invoke, JsonError};
use crate::outcome;
use crate::query::QueryPath;
use crate::run::{Finalizer, RunState, Summary, TestCase, TestRun, TestStatus};
use crate::util::ui;
use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct Harness {
    config: HarnessConfig,
    invoker: Box<dyn Invoke>,
    client: Option<DirectClient>,
    run: TestRun,
    cleanup: CleanupRegistry,
    group: Option<String>,
    last: Option<Invocation>,
    summary: Option<Summary>,
    /// Set by the signal handler; cleared once the run has noted it
    interrupted: Arc<AtomicBool>,
    was_interrupted: bool,
    verbose: bool,
}

impl Harness {
    /// Harness driving the configured CLI. Once the signal handler is
    /// installed, a signal kills the running CLI call.
    pub fn new(config: HarnessConfig) -> Self {
        let interrupted = Arc::new(AtomicBool::new(false));
        let invoker =
            CommandInvoker::from_config(&config).interrupt_flag(Arc::clone(&interrupted));
        let mut harness = Self::with_invoker(config, Box::new(invoker));
        harness.interrupted = interrupted;
        harness
    }

    /// Harness driving any [`Invoke`] implementation
    pub fn with_invoker(config: HarnessConfig, invoker: Box<dyn Invoke>) -> Self {
        Self {
            config,
            invoker,
            client: None,
            run: TestRun::new(),
            cleanup: CleanupRegistry::new(),
            group: None,
            last: None,
            summary: None,
            interrupted: Arc::new(AtomicBool::new(false)),
            was_interrupted: false,
            verbose: false,
        }
    }

    /// Print every command line and its captured output
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Route SIGINT/SIGTERM into this harness. Only one handler can exist per
    /// process; returns false if another one is already installed.
    pub fn install_signal_handler(&mut self) -> bool {
        let flag = Arc::clone(&self.interrupted);
        match ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
            Ok(()) => true,
            Err(e) => {
                ui::warn(&format!("Could not install signal handler: {}", e));
                false
            }
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn results(&self) -> &TestRun {
        &self.run
    }

    pub fn cleanup_registry(&self) -> &CleanupRegistry {
        &self.cleanup
    }

    /// Pre-existing fixture ID from XBE_TEST_*
    pub fn fixture(&self, name: &str) -> Option<&str> {
        self.config.fixture(name)
    }

    // ---------------------------------------------------------------------
    // Test lifecycle
    // ---------------------------------------------------------------------

    /// Label the cases that follow
    pub fn describe(&mut self, group: &str) {
        if !self.collecting("describe") {
            return;
        }
        ui::section(group);
        self.group = Some(group.to_string());
    }

    /// Start a new case. A previous case left without a verdict is closed
    /// as failed and counted as a contract violation.
    pub fn test(&mut self, name: &str) {
        if !self.collecting("test") {
            return;
        }
        self.close_pending_case();
        self.run.push(TestCase::new(name, self.group.as_deref()));
        self.last = None;
    }

    pub fn pass(&mut self) {
        self.finalize(TestStatus::Pass, None);
    }

    pub fn fail(&mut self, message: &str) {
        self.finalize(TestStatus::Fail, Some(message.to_string()));
    }

    pub fn skip(&mut self, reason: &str) {
        self.finalize(TestStatus::Skip, Some(reason.to_string()));
    }

    fn finalize(&mut self, status: TestStatus, message: Option<String>) {
        if !self.collecting("finalize") {
            return;
        }
        let Some(case) = self.run.current() else {
            self.violation("pass/fail/skip called before any test was declared");
            return;
        };
        let name = case.name.clone();

        match (case.status, case.finalized_by()) {
            (TestStatus::Pending, _) => {
                self.run.finalize_current(status, message.clone(), Finalizer::Explicit);
                report_case(&name, status, message.as_deref());
            }
            // The failed assertion already decided this case.
            (TestStatus::Fail, Some(Finalizer::Assertion)) if status != TestStatus::Skip => {
                if let (TestStatus::Fail, Some(message), Some(case)) =
                    (status, message, self.run.current_mut())
                {
                    ui::detail("reason", &message);
                    case.note_failure(message);
                }
            }
            (current, _) => {
                self.violation(&format!(
                    "'{}' already finished as {:?}; ignoring {:?}",
                    name, current, status
                ));
            }
        }
    }

    fn close_pending_case(&mut self) {
        let Some(case) = self.run.current() else {
            return;
        };
        if case.status != TestStatus::Pending {
            return;
        }
        let name = case.name.clone();
        self.violation(&format!("'{}' finished without a verdict", name));
        let message = "no verdict recorded".to_string();
        self.run
            .finalize_current(TestStatus::Fail, Some(message.clone()), Finalizer::Harness);
        report_case(&name, TestStatus::Fail, Some(&message));
    }

    fn collecting(&mut self, operation: &str) -> bool {
        if self.run.state() == RunState::Collecting {
            return true;
        }
        ui::warn(&format!("Ignoring {} after run_tests", operation));
        false
    }

    fn violation(&mut self, message: &str) {
        self.run.record_violation();
        ui::warn(&format!("Harness misuse: {}", message));
    }

    // ---------------------------------------------------------------------
    // Invocations
    // ---------------------------------------------------------------------

    /// Run the CLI. The result replaces the previous invocation.
    pub fn invoke<S: AsRef<str>>(&mut self, args: &[S]) -> &Invocation {
        let args = to_args(args);
        let inv = match self.invoker.invoke(&args) {
            Ok(inv) => inv,
            Err(e) => {
                let reason = format!("{:#}", e);
                ui::error(&reason);
                Invocation::not_started(args, &reason)
            }
        };
        self.store(inv)
    }

    /// Run the CLI in JSON mode (`--json` appended when missing)
    pub fn invoke_json<S: AsRef<str>>(&mut self, args: &[S]) -> &Invocation {
        let args = with_json_flag(&to_args(args));
        self.invoke(&args)
    }

    /// Run the CLI in JSON mode and parse stdout
    pub fn invoke_expect_json<S: AsRef<str>>(&mut self, args: &[S]) -> Result<Value, JsonError> {
        self.invoke_json(args).json()
    }

    /// Call the API directly, for operations the CLI does not offer
    pub fn request(&mut self, method: &str, path: &str, body: Option<&Value>) -> &Invocation {
        let result = self
            .client()
            .and_then(|client| client.request(method, path, body));
        let inv = result.unwrap_or_else(|e| {
            let reason = format!("{:#}", e);
            ui::error(&reason);
            Invocation::not_started(
                vec![method.to_ascii_uppercase(), path.to_string()],
                &reason,
            )
        });
        self.store(inv)
    }

    pub fn last(&self) -> Option<&Invocation> {
        self.last.as_ref()
    }

    /// Text value at `path` in the last invocation's JSON (`None` for
    /// missing or null values)
    pub fn json_value(&self, path: &str) -> Option<String> {
        let query = path.parse::<QueryPath>().ok()?;
        let doc = self.last.as_ref()?.json().ok()?;
        query
            .get(&doc)
            .filter(|v| !v.is_null())
            .map(text_of)
    }

    fn client(&mut self) -> Result<&DirectClient> {
        if self.client.is_none() {
            self.client = Some(DirectClient::from_config(&self.config)?);
        }
        self.client.as_ref().context("Direct API client unavailable")
    }

    fn store(&mut self, inv: Invocation) -> &Invocation {
        if self.verbose {
            ui::dim(&format!("$ {} {}", self.config.bin, inv.command_line()));
            ui::detail("exit", &inv.exit_code.to_string());
            ui::detail("stdout", &inv.stdout);
            ui::detail("stderr", &inv.stderr);
        }
        if let Some(summary) = self.take_interrupt() {
            std::process::exit(summary.exit_code());
        }
        self.last.insert(inv)
    }

    /// When a signal arrived, report and clean up, then hand back the
    /// summary the process should exit with
    fn take_interrupt(&mut self) -> Option<Summary> {
        if !self.interrupted.load(Ordering::SeqCst) || self.summary.is_some() {
            return None;
        }
        ui::warn("Interrupted, cleaning up before exit");
        self.fail_interrupted_case();
        Some(self.run_tests())
    }

    /// The case that was running when the signal arrived failed; that is
    /// not a misuse of the harness
    fn fail_interrupted_case(&mut self) {
        let Some(case) = self.run.current() else {
            return;
        };
        if case.status != TestStatus::Pending {
            return;
        }
        let name = case.name.clone();
        let message = "interrupted".to_string();
        self.run
            .finalize_current(TestStatus::Fail, Some(message.clone()), Finalizer::Harness);
        report_case(&name, TestStatus::Fail, Some(&message));
    }

    // ---------------------------------------------------------------------
    // Assertions
    // ---------------------------------------------------------------------

    pub fn assert_success(&mut self) -> bool {
        self.check_last(assert::success)
    }

    pub fn assert_failure(&mut self) -> bool {
        self.check_last(assert::failure)
    }

    pub fn assert_json_is_array(&mut self) -> bool {
        self.check_last(assert::json_is_array)
    }

    pub fn assert_json_has(&mut self, path: &str) -> bool {
        self.check_last(|inv| assert::json_has(inv, path))
    }

    pub fn assert_json_equals(&mut self, path: &str, expected: &str) -> bool {
        self.check_last(|inv| assert::json_equals(inv, path, expected))
    }

    fn check_last<F>(&mut self, check: F) -> bool
    where
        F: FnOnce(&Invocation) -> Verdict,
    {
        let verdict = match self.last {
            Some(ref inv) => check(inv),
            None => Verdict::Fail("No invocation to check in this test".to_string()),
        };
        self.record(verdict)
    }

    /// Record an assertion outcome on the current case. A failure finalizes
    /// a pending case as failed; execution always continues.
    pub fn record(&mut self, verdict: Verdict) -> bool {
        let passed = verdict.passed();
        if !self.collecting("assertion") {
            return passed;
        }
        let Verdict::Fail(message) = verdict else {
            return true;
        };
        let Some(case) = self.run.current() else {
            self.violation("assertion made before any test was declared");
            ui::detail("reason", &message);
            return false;
        };
        let name = case.name.clone();
        let status = case.status;

        match status {
            TestStatus::Pending => {
                self.run
                    .finalize_current(TestStatus::Fail, Some(message.clone()), Finalizer::Assertion);
                report_case(&name, TestStatus::Fail, Some(&message));
            }
            TestStatus::Fail => {
                ui::detail("reason", &message);
                if let Some(case) = self.run.current_mut() {
                    case.note_failure(message);
                }
            }
            status => {
                self.violation(&format!(
                    "assertion failed after '{}' finished as {:?}",
                    name, status
                ));
                ui::detail("reason", &message);
            }
        }
        false
    }

    /// Skip the current case when the last invocation was refused for
    /// authorization or validation-policy reasons
    pub fn skip_if_limited(&mut self) -> bool {
        let Some(kind) = self.last.as_ref().and_then(outcome::classify) else {
            return false;
        };
        if !kind.is_environment_limitation() {
            return false;
        }
        self.skip(&format!("environment limitation: {}", kind));
        true
    }

    /// Fixture ID, or skip the current case when it is not configured
    pub fn fixture_or_skip(&mut self, name: &str) -> Option<String> {
        if let Some(id) = self.config.fixture(name) {
            return Some(id.to_string());
        }
        self.skip(&format!(
            "{}{} not set",
            crate::config::FIXTURE_PREFIX,
            name.to_ascii_uppercase()
        ));
        None
    }

    // ---------------------------------------------------------------------
    // Cleanup and reporting
    // ---------------------------------------------------------------------

    /// Register a created resource for deletion at the end of the run
    pub fn register_cleanup(&mut self, kind: &str, id: &str) -> bool {
        self.cleanup.register(kind, id)
    }

    /// Register teardown for resources the CLI cannot delete
    pub fn add_cleanup_hook<F>(&mut self, label: &str, action: F)
    where
        F: FnOnce() -> Result<()> + 'static,
    {
        self.cleanup.add_hook(label, action);
    }

    /// Delete everything registered so far. Safe to call repeatedly.
    pub fn run_cleanup(&mut self) -> CleanupReport {
        if self.cleanup.is_empty() {
            return CleanupReport::default();
        }
        println!();
        ui::info(&format!("Cleaning up {} resource(s)", self.cleanup.len()));
        self.cleanup
            .run(self.invoker.as_mut(), &self.config.confirm_flag)
    }

    /// Report the run and clean up. Calling it mid-script stops further
    /// testing: later cases are never declared. Only the first call
    /// reports; later calls return the same summary.
    pub fn run_tests(&mut self) -> Summary {
        if let Some(ref summary) = self.summary {
            return summary.clone();
        }
        // Clear the flag so cleanup calls are not killed; a second signal
        // during cleanup still kills the call in flight.
        if self.interrupted.swap(false, Ordering::SeqCst) {
            self.was_interrupted = true;
            self.fail_interrupted_case();
        }
        self.close_pending_case();
        self.run.begin_report();

        let mut summary = self.run.summary();
        summary.interrupted = self.was_interrupted;
        print_summary(&self.run, &summary);

        let report = self.run_cleanup();
        summary.cleanup_failures = report.failures.len();
        if !report.is_clean() {
            ui::warn(&format!(
                "{} cleanup action(s) failed; the verdict is unaffected",
                report.failures.len()
            ));
        }

        self.run.terminate();
        self.summary = Some(summary.clone());
        summary
    }

    /// Report, clean up and exit the process with the run's exit code
    pub fn exit(mut self) -> ! {
        let code = self.run_tests().exit_code();
        std::process::exit(code)
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        if self.summary.is_some() || self.cleanup.is_empty() {
            return;
        }
        if std::thread::panicking() {
            ui::warn("Test program panicked, cleaning up");
        }
        self.run_cleanup();
    }
}

fn report_case(name: &str, status: TestStatus, message: Option<&str>) {
    match status {
        TestStatus::Pass => ui::success(name),
        TestStatus::Fail => {
            ui::error(name);
            if let Some(message) = message {
                ui::detail("reason", message);
            }
        }
        TestStatus::Skip => match message {
            Some(reason) => ui::skip(&format!("{} (skipped: {})", name, reason)),
            None => ui::skip(&format!("{} (skipped)", name)),
        },
        TestStatus::Pending => {}
    }
}

fn print_summary(run: &TestRun, summary: &Summary) {
    println!();
    println!("{}", "═".repeat(50));
    ui::info(&format!(
        "Total: {}  Passed: {}  Failed: {}  Skipped: {}",
        summary.total, summary.passed, summary.failed, summary.skipped
    ));

    let failed: Vec<_> = run
        .cases()
        .iter()
        .filter(|c| c.status == TestStatus::Fail)
        .collect();
    if !failed.is_empty() {
        println!();
        ui::info("Failed tests:");
        for case in failed {
            let label = match case.group {
                Some(ref group) => format!("{}: {}", group, case.name),
                None => case.name.clone(),
            };
            ui::error(&label);
            if let Some(message) = case.message() {
                ui::dim(&format!("  {}", message.lines().next().unwrap_or_default()));
            }
        }
    }

    if summary.violations > 0 {
        ui::warn(&format!(
            "{} harness misuse warning(s); see above",
            summary.violations
        ));
    }
    if summary.interrupted {
        ui::warn("Run interrupted");
    }
}
