//! Run command - execute suites against the CLI
//!
//! xbe-harness run <suite>... [--bin <path>] [--verbose]

use anyhow::{bail, Result};
use std::path::PathBuf;
use xbe_harness::config::HarnessConfig;
use xbe_harness::harness::Harness;
use xbe_harness::suite::{self, Suite, SuiteOutcome, Vars};
use xbe_harness::util::{process, ui};

/// Run every suite in one harness and return the process exit code
pub fn run(suites: &[PathBuf], bin: Option<String>, verbose: bool) -> Result<i32> {
    let mut config = HarnessConfig::load()?;
    if let Some(bin) = bin {
        config.bin = bin;
    }

    // Parse everything before touching the service
    let suites = suites
        .iter()
        .map(|path| Suite::load(path))
        .collect::<Result<Vec<_>, _>>()?;

    if process::resolve_program(&config.bin).is_none() {
        bail!(
            "CLI binary '{}' not found.\nSet XBE_BIN or pass --bin <path>",
            config.bin
        );
    }

    ui::info(&format!(
        "Testing {} against {}",
        config.bin,
        config.base_url.as_deref().unwrap_or("its default service")
    ));

    let mut vars = Vars::from_config(&config);
    let mut harness = Harness::new(config).verbose(verbose);
    harness.install_signal_handler();

    for suite in &suites {
        if suite::run_suite(&mut harness, suite, &mut vars) == SuiteOutcome::Aborted {
            break;
        }
    }

    Ok(harness.run_tests().exit_code())
}
