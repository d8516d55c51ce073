//! Check command - validate suite files
//!
//! xbe-harness check <suite>...

use anyhow::{bail, Result};
use std::path::PathBuf;
use xbe_harness::suite::Suite;
use xbe_harness::util::ui;

pub fn run(suites: &[PathBuf]) -> Result<()> {
    let mut invalid = 0;

    for path in suites {
        match Suite::load(path) {
            Ok(suite) => ui::success(&format!(
                "{} ({}, {} step(s))",
                path.display(),
                suite.name,
                suite.steps.len()
            )),
            Err(e) => {
                ui::error(&e.to_string());
                invalid += 1;
            }
        }
    }

    if invalid > 0 {
        bail!("{} of {} suite(s) invalid", invalid, suites.len());
    }
    Ok(())
}
