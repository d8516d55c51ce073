//! Env command - show the resolved configuration
//!
//! xbe-harness env [--json]

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use xbe_harness::config::HarnessConfig;
use xbe_harness::paths;
use xbe_harness::util::{process, ui};

#[derive(Debug, Serialize)]
pub struct EnvReport {
    pub version: String,
    pub config_file: PathBuf,
    pub config_file_exists: bool,
    pub bin: String,
    /// Where `bin` resolves on PATH, if anywhere
    pub bin_path: Option<PathBuf>,
    pub base_url: Option<String>,
    /// Only whether a token is set; the value is never shown
    pub token_set: bool,
    pub confirm_flag: String,
    pub fixtures: BTreeMap<String, String>,
}

impl EnvReport {
    pub fn collect(config: &HarnessConfig) -> Self {
        let config_file = paths::config_file();
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            config_file_exists: config_file.exists(),
            config_file,
            bin: config.bin.clone(),
            bin_path: process::resolve_program(&config.bin),
            base_url: config.base_url.clone(),
            token_set: config.has_token(),
            confirm_flag: config.confirm_flag.clone(),
            fixtures: config.fixtures.clone(),
        }
    }
}

pub fn run(json: bool) -> Result<()> {
    let config = HarnessConfig::load()?;
    let report = EnvReport::collect(&config);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &EnvReport) {
    println!();
    println!("xbe-harness v{}", report.version);
    println!("{}", "═".repeat(50));
    println!();

    if report.config_file_exists {
        ui::success(&format!("Config file: {}", report.config_file.display()));
    } else {
        ui::dim(&format!("Config file: {} (not present)", report.config_file.display()));
    }

    match report.bin_path {
        Some(ref path) => ui::success(&format!("CLI: {} ({})", report.bin, path.display())),
        None => {
            ui::error(&format!("CLI: {} not found", report.bin));
            println!("    Set XBE_BIN or pass --bin <path> to `run`");
        }
    }

    match report.base_url {
        Some(ref url) => ui::success(&format!("Base URL: {}", url)),
        None => ui::warn("Base URL: not set (CLI default; direct API calls unavailable)"),
    }

    if report.token_set {
        ui::success("Token: set (hidden)");
    } else {
        ui::warn("Token: not set");
    }

    ui::dim(&format!("Confirm flag: {}", report.confirm_flag));

    if report.fixtures.is_empty() {
        ui::dim("Fixtures: none (set XBE_TEST_<NAME> to reuse existing records)");
    } else {
        ui::info("");
        ui::info("Fixtures");
        for (name, value) in &report.fixtures {
            ui::dim(&format!("{} = {}", name, value));
        }
    }
    println!();
}
