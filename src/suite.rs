//! Declarative test suites
//!
//! A suite file describes the steps a per-resource test script would run:
//!
//! ```toml
//! name = "brokers"
//!
//! [[step]]
//! name = "create broker"
//! args = ["do", "brokers", "create", "--name", "Test {{run_id}}"]
//! has = [".id"]
//! capture = { broker_id = ".id" }
//! cleanup = { resource = "brokers" }
//! abort_on_failure = true
//!
//! [[step]]
//! name = "show broker"
//! args = ["view", "brokers", "show", "{{broker_id}}"]
//! equals = { ".id" = "{{broker_id}}" }
//! ```

use crate::assert::{text_of, Verdict};
use crate::config::HarnessConfig;
use crate::harness::Harness;
use crate::query::QueryPath;
use crate::util::ui;
use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// `{{name}}`, with optional spaces inside the braces
#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static VAR_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("constant regex pattern is valid"));

#[derive(Error, Debug)]
pub enum SuiteError {
    #[error("Failed to read suite {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse suite {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid step '{step}' in suite '{suite}': {reason}")]
    InvalidStep {
        suite: String,
        step: String,
        reason: String,
    },

    #[error("Invalid suite '{suite}': {reason}")]
    Invalid { suite: String, reason: String },
}

/// What the step expects from the exit code
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expect {
    #[default]
    Success,
    Failure,
    Any,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Suite {
    pub name: String,
    /// Variables (usually fixtures) that must exist for the suite to run
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    pub name: String,
    /// CLI arguments; exclusive with `request`
    #[serde(default)]
    pub args: Vec<String>,
    /// Direct API call; exclusive with `args`
    pub request: Option<RequestSpec>,
    /// Force `--json` even without JSON assertions
    #[serde(default)]
    pub json: bool,
    #[serde(default)]
    pub expect: Expect,
    #[serde(default)]
    pub is_array: bool,
    #[serde(default)]
    pub has: Vec<String>,
    #[serde(default)]
    pub equals: BTreeMap<String, Value>,
    /// Variable name -> query path
    #[serde(default)]
    pub capture: BTreeMap<String, String>,
    pub cleanup: Option<CleanupSpec>,
    /// Authorization or validation-policy refusals skip instead of failing
    #[serde(default)]
    pub tolerate_limited: bool,
    /// Stop the whole run when this step fails
    #[serde(default)]
    pub abort_on_failure: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestSpec {
    pub method: String,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleanupSpec {
    pub resource: String,
    /// Query path to the created ID
    #[serde(default = "default_id_path")]
    pub id: String,
}

fn default_id_path() -> String {
    ".id".to_string()
}

impl Step {
    fn has_json_checks(&self) -> bool {
        self.is_array
            || !self.has.is_empty()
            || !self.equals.is_empty()
            || !self.capture.is_empty()
            || self.cleanup.is_some()
    }

    fn wants_json(&self) -> bool {
        self.json || self.has_json_checks()
    }

    fn query_paths(&self) -> impl Iterator<Item = &str> {
        self.has
            .iter()
            .map(String::as_str)
            .chain(self.equals.keys().map(String::as_str))
            .chain(self.capture.values().map(String::as_str))
            .chain(self.cleanup.iter().map(|c| c.id.as_str()))
    }
}

impl Suite {
    /// Read and validate a suite file
    pub fn load(path: &Path) -> Result<Self, SuiteError> {
        let content = fs::read_to_string(path).map_err(|source| SuiteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse and validate suite text; `origin` is used in messages
    pub fn parse(content: &str, origin: &Path) -> Result<Self, SuiteError> {
        let suite: Suite = toml::from_str(content).map_err(|source| SuiteError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        suite.validate()?;
        Ok(suite)
    }

    pub fn validate(&self) -> Result<(), SuiteError> {
        if self.name.trim().is_empty() {
            return Err(SuiteError::Invalid {
                suite: self.name.clone(),
                reason: "name must not be empty".to_string(),
            });
        }
        if self.steps.is_empty() {
            return Err(SuiteError::Invalid {
                suite: self.name.clone(),
                reason: "no [[step]] entries".to_string(),
            });
        }

        for step in &self.steps {
            let invalid = |reason: String| SuiteError::InvalidStep {
                suite: self.name.clone(),
                step: step.name.clone(),
                reason,
            };

            match (step.args.is_empty(), step.request.is_some()) {
                (true, false) => return Err(invalid("needs either args or request".into())),
                (false, true) => return Err(invalid("args and request are exclusive".into())),
                _ => {}
            }
            if step.expect == Expect::Failure && step.has_json_checks() {
                return Err(invalid(
                    "JSON checks cannot be combined with expect = \"failure\"".into(),
                ));
            }
            if step.expect == Expect::Failure && step.tolerate_limited {
                return Err(invalid(
                    "tolerate_limited cannot be combined with expect = \"failure\"".into(),
                ));
            }
            for path in step.query_paths() {
                path.parse::<QueryPath>()
                    .map_err(|e| invalid(e.to_string()))?;
            }
            if let Some(name) = step.capture.keys().find(|name| !is_var_name(name)) {
                return Err(invalid(format!("invalid capture name '{}'", name)));
            }
            if let Some(ref cleanup) = step.cleanup {
                if cleanup.resource.trim().is_empty() {
                    return Err(invalid("cleanup resource must not be empty".into()));
                }
            }
        }
        Ok(())
    }
}

/// How a suite ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteOutcome {
    Completed,
    /// An `abort_on_failure` step failed; nothing after it ran
    Aborted,
}

/// Values available to `{{name}}` placeholders: built-ins, fixtures and
/// captures from earlier steps (of any suite in the run)
#[derive(Debug, Clone, Default)]
pub struct Vars {
    values: BTreeMap<String, String>,
}

impl Vars {
    /// Built-ins plus fixture overrides
    pub fn from_config(config: &HarnessConfig) -> Self {
        let mut vars = Vars::default();
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        vars.insert("run_id", &format!("{}-{}", secs, std::process::id()));
        for (name, value) in &config.fixtures {
            vars.insert(name, value);
        }
        vars
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_string(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Replace every `{{name}}`; the error is the first unknown name
    pub fn expand(&self, template: &str) -> Result<String, String> {
        let mut missing = None;
        let expanded = PLACEHOLDER.replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            match self.get(name) {
                Some(value) => value.to_string(),
                None => {
                    missing.get_or_insert_with(|| name.to_string());
                    caps[0].to_string()
                }
            }
        });
        match missing {
            Some(name) => Err(name),
            None => Ok(expanded.into_owned()),
        }
    }

    /// Expand placeholders inside every string of a JSON value
    pub fn expand_value(&self, value: &Value) -> Result<Value, String> {
        Ok(match value {
            Value::String(s) => Value::String(self.expand(s)?),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|v| self.expand_value(v))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), self.expand_value(v)?)))
                    .collect::<Result<_, String>>()?,
            ),
            other => other.clone(),
        })
    }
}

/// Run every step of `suite` on the harness
pub fn run_suite(h: &mut Harness, suite: &Suite, vars: &mut Vars) -> SuiteOutcome {
    h.describe(&suite.name);

    if let Some(missing) = suite.requires.iter().find(|name| vars.get(name).is_none()) {
        h.test(&format!("{} prerequisites", suite.name));
        h.skip(&format!("missing {}", missing));
        return SuiteOutcome::Completed;
    }

    for step in &suite.steps {
        h.test(&step.name);
        let passed = match run_step(h, step, vars) {
            StepResult::Skipped => continue,
            StepResult::Checked(passed) => passed,
        };
        if passed {
            h.pass();
        } else if step.abort_on_failure {
            ui::warn(&format!("'{}' failed; stopping further testing", step.name));
            return SuiteOutcome::Aborted;
        }
    }
    SuiteOutcome::Completed
}

enum StepResult {
    Skipped,
    Checked(bool),
}

fn run_step(h: &mut Harness, step: &Step, vars: &mut Vars) -> StepResult {
    let expanded = match step.request {
        Some(ref request) => expand_request(request, vars),
        None => step
            .args
            .iter()
            .map(|a| vars.expand(a))
            .collect::<Result<Vec<_>, _>>()
            .map(Call::Cli),
    };
    let invocation = match expanded {
        Ok(inv) => inv,
        Err(missing) => {
            h.skip(&format!("missing {}", missing));
            return StepResult::Skipped;
        }
    };

    match invocation {
        Call::Request(method, path, body) => {
            h.request(&method, &path, body.as_ref());
        }
        Call::Cli(args) if step.wants_json() => {
            h.invoke_json(&args);
        }
        Call::Cli(args) => {
            h.invoke(&args);
        }
    }

    if step.tolerate_limited && h.skip_if_limited() {
        return StepResult::Skipped;
    }

    let mut passed = match step.expect {
        Expect::Success => h.assert_success(),
        Expect::Failure => h.assert_failure(),
        Expect::Any => true,
    };
    if !passed || step.expect == Expect::Failure {
        return StepResult::Checked(passed);
    }

    if step.wants_json() {
        if let Some(Err(e)) = h.last().map(|inv| inv.json()) {
            h.record(Verdict::Fail(format!("output is not JSON: {}", e)));
            return StepResult::Checked(false);
        }
    }
    if step.is_array {
        passed &= h.assert_json_is_array();
    }
    for path in &step.has {
        passed &= h.assert_json_has(path);
    }
    for (path, expected) in &step.equals {
        let expected = match expected {
            Value::String(s) => vars.expand(s),
            other => Ok(text_of(other)),
        };
        passed &= match expected {
            Ok(expected) => h.assert_json_equals(path, &expected),
            Err(missing) => h.record(Verdict::Fail(format!(
                "cannot compare {}: missing {}",
                path, missing
            ))),
        };
    }
    for (name, path) in &step.capture {
        match h.json_value(path) {
            Some(value) => vars.insert(name, &value),
            None => {
                passed &= h.record(Verdict::Fail(format!(
                    "could not capture {} from {}",
                    name, path
                )));
            }
        }
    }
    if let Some(ref cleanup) = step.cleanup {
        match h.json_value(&cleanup.id) {
            Some(id) => {
                h.register_cleanup(&cleanup.resource, &id);
            }
            None => ui::warn(&format!(
                "No {} in output; nothing registered for cleanup",
                cleanup.id
            )),
        }
    }

    StepResult::Checked(passed)
}

enum Call {
    Cli(Vec<String>),
    Request(String, String, Option<Value>),
}

fn expand_request(request: &RequestSpec, vars: &Vars) -> Result<Call, String> {
    let path = vars.expand(&request.path)?;
    let body = request
        .body
        .as_ref()
        .map(|b| vars.expand_value(b))
        .transpose()?;
    Ok(Call::Request(request.method.clone(), path, body))
}

fn is_var_name(name: &str) -> bool {
    VAR_NAME.is_match(name)
}
