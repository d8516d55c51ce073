//! Integration test harness for the `xbe` command-line client
//!
//! Wraps CLI invocations, records non-aborting assertions against their
//! output, tracks created resources for LIFO cleanup and aggregates the
//! results into a summary and exit code.

pub mod assert;
pub mod cleanup;
pub mod config;
pub mod harness;
pub mod http;
pub mod invoke;
pub mod outcome;
pub mod paths;
pub mod query;
pub mod run;
pub mod suite;
pub mod util;

pub use harness::Harness;
pub use invoke::{Invocation, Invoke};
pub use run::{Summary, TestStatus};
