//! Invocation wrapper around the external CLI
//!
//! Non-zero exit codes are ordinary results here. Only a failure to spawn
//! the process at all is reported as an error.

use crate::config::HarnessConfig;
use crate::util::process::{format_args, has_flag};
use anyhow::{Context, Result};
use serde_json::Value;
use std::io::Read;
use std::process::{Child, Command, Output, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

/// How often a running child is checked for exit or interruption
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Outcome of one external CLI call
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Arguments passed after the program name
    pub args: Vec<String>,
    /// Exit code (0 = success, -1 = killed by signal or never ran)
    pub exit_code: i32,
    /// Standard output as string
    pub stdout: String,
    /// Standard error as string
    pub stderr: String,
}

/// Why stdout could not be used as a JSON document
#[derive(Error, Debug)]
pub enum JsonError {
    #[error("command failed with exit code {exit_code}: {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },

    #[error("command succeeded but produced no output")]
    EmptyOutput,

    #[error("command succeeded but returned malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl Invocation {
    /// Build an invocation result from raw parts
    pub fn new(args: Vec<String>, exit_code: i32, stdout: &str, stderr: &str) -> Self {
        Self {
            args,
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    /// Placeholder result for a process that could not be started
    pub fn not_started(args: Vec<String>, reason: &str) -> Self {
        Self::new(args, -1, "", reason)
    }

    /// Check if command succeeded (exit code 0)
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Combined output (stdout + stderr)
    pub fn output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }

    /// Check if combined output contains a substring
    pub fn output_contains(&self, needle: &str) -> bool {
        self.stdout.contains(needle) || self.stderr.contains(needle)
    }

    /// The argument list as a printable command line
    pub fn command_line(&self) -> String {
        format_args(&self.args)
    }

    /// Parse stdout as JSON, keeping "command failed" apart from
    /// "command succeeded with unusable output"
    pub fn json(&self) -> Result<Value, JsonError> {
        if !self.success() {
            return Err(JsonError::CommandFailed {
                exit_code: self.exit_code,
                stderr: self.stderr.trim().to_string(),
            });
        }
        let body = self.stdout.trim();
        if body.is_empty() {
            return Err(JsonError::EmptyOutput);
        }
        Ok(serde_json::from_str(body)?)
    }

    fn from_output(args: Vec<String>, output: Output) -> Self {
        Self {
            args,
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// Something that can run the external CLI
pub trait Invoke {
    /// Run the CLI with `args`, blocking until it exits
    fn invoke(&mut self, args: &[String]) -> Result<Invocation>;
}

/// Runs the real CLI as a subprocess
#[derive(Debug, Clone)]
pub struct CommandInvoker {
    program: String,
    base_url: Option<String>,
    token: Option<String>,
    env: Vec<(String, String)>,
    interrupt: Option<Arc<AtomicBool>>,
}

impl CommandInvoker {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            base_url: None,
            token: None,
            env: Vec::new(),
            interrupt: None,
        }
    }

    /// Invoker for the configured CLI, passing connection flags when set
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            program: config.bin.clone(),
            base_url: config.base_url.clone(),
            token: config.token.clone(),
            env: Vec::new(),
            interrupt: None,
        }
    }

    /// Extra environment variable for every spawned process
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Kill the running child as soon as `flag` is set
    pub fn interrupt_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Final argument list: caller args plus connection flags not already given
    fn full_args(&self, args: &[String]) -> Vec<String> {
        let mut full = args.to_vec();
        if let Some(ref url) = self.base_url {
            if !has_flag(args, "--base-url") {
                full.push("--base-url".to_string());
                full.push(url.clone());
            }
        }
        if let Some(ref token) = self.token {
            if !has_flag(args, "--token") {
                full.push("--token".to_string());
                full.push(token.clone());
            }
        }
        full
    }
}

impl Invoke for CommandInvoker {
    fn invoke(&mut self, args: &[String]) -> Result<Invocation> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.full_args(args));
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        let context = || format!("Failed to execute: {} {}", self.program, format_args(args));
        let output = match self.interrupt {
            Some(ref flag) => {
                let child = cmd
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .spawn()
                    .with_context(context)?;
                match wait_interruptible(child, flag).with_context(context)? {
                    Some(output) => output,
                    None => return Ok(Invocation::new(args.to_vec(), -1, "", "interrupted")),
                }
            }
            None => cmd.output().with_context(context)?,
        };

        // Report the caller's args so the token never reaches the console.
        Ok(Invocation::from_output(args.to_vec(), output))
    }
}

/// Wait for `child`, killing it once `flag` is set. `None` means the child
/// was killed; its output is abandoned since grandchildren may still hold
/// the pipes open.
fn wait_interruptible(mut child: Child, flag: &AtomicBool) -> std::io::Result<Option<Output>> {
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = loop {
        if flag.load(Ordering::SeqCst) {
            child.kill().ok();
            child.wait().ok();
            return Ok(None);
        }
        match child.try_wait()? {
            Some(status) => break status,
            None => thread::sleep(POLL_INTERVAL),
        }
    };

    let collect = |handle: Option<JoinHandle<Vec<u8>>>| {
        handle
            .and_then(|h| h.join().ok())
            .unwrap_or_default()
    };
    Ok(Some(Output {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    }))
}

/// Read a pipe to the end on its own thread so the child never blocks on a
/// full pipe buffer
fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf).ok();
        buf
    })
}

/// Append `--json` unless the caller already asked for it
pub fn with_json_flag(args: &[String]) -> Vec<String> {
    let mut args = args.to_vec();
    if !has_flag(&args, "--json") {
        args.push("--json".to_string());
    }
    args
}

/// Convert a slice of string-likes into owned args
pub fn to_args<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    args.iter().map(|a| a.as_ref().to_string()).collect()
}
