//! Configuration management for xbe-harness
//!
//! Resolved once at startup from ~/.xbe-harness/config.toml and the
//! process environment. Environment variables win over the file.

use crate::paths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Default name of the CLI under test
pub const DEFAULT_BIN: &str = "xbe";

/// Flag the CLI requires before it will delete anything
pub const DEFAULT_CONFIRM_FLAG: &str = "--confirm";

/// Prefix for pre-existing fixture ID overrides
pub const FIXTURE_PREFIX: &str = "XBE_TEST_";

/// Contents of ~/.xbe-harness/config.toml
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub cli: CliSection,
    #[serde(default)]
    pub api: ApiSection,
}

/// `[cli]` section
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CliSection {
    /// Path or name of the CLI binary
    pub bin: Option<String>,
    /// Delete confirmation flag
    pub confirm_flag: Option<String>,
}

/// `[api]` section
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ApiSection {
    pub base_url: Option<String>,
    pub token: Option<String>,
}

impl FileConfig {
    /// Load configuration from ~/.xbe-harness/config.toml
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_file())
    }

    /// Load configuration from an explicit path
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(FileConfig::default());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
    }
}

/// Process-wide harness configuration, read-only after startup
#[derive(Debug, Clone, Serialize)]
pub struct HarnessConfig {
    /// CLI binary to invoke
    pub bin: String,
    /// Base URL passed to the CLI and used for direct HTTP calls
    pub base_url: Option<String>,
    /// API token; never serialized
    #[serde(skip)]
    pub token: Option<String>,
    /// Flag appended to every cleanup delete
    pub confirm_flag: String,
    /// Pre-existing fixture IDs from XBE_TEST_* (keys lowercased, prefix stripped)
    pub fixtures: BTreeMap<String, String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            bin: DEFAULT_BIN.to_string(),
            base_url: None,
            token: None,
            confirm_flag: DEFAULT_CONFIRM_FLAG.to_string(),
            fixtures: BTreeMap::new(),
        }
    }
}

impl HarnessConfig {
    /// Load from the config file and the process environment
    pub fn load() -> Result<Self> {
        let file = FileConfig::load()?;
        Ok(Self::from_sources(file, std::env::vars()))
    }

    /// Merge defaults, file config and environment variables
    pub fn from_sources<I>(file: FileConfig, env: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = HarnessConfig::default();

        if let Some(bin) = non_empty(file.cli.bin) {
            config.bin = bin;
        }
        if let Some(flag) = non_empty(file.cli.confirm_flag) {
            config.confirm_flag = flag;
        }
        config.base_url = non_empty(file.api.base_url);
        config.token = non_empty(file.api.token);

        for (key, value) in env {
            let Some(value) = non_empty(Some(value)) else {
                continue;
            };
            match key.as_str() {
                "XBE_BIN" => config.bin = value,
                "XBE_BASE_URL" => config.base_url = Some(value),
                "XBE_TOKEN" => config.token = Some(value),
                "XBE_CONFIRM_FLAG" => config.confirm_flag = value,
                _ => {
                    if let Some(name) = key.strip_prefix(FIXTURE_PREFIX) {
                        if !name.is_empty() {
                            config.fixtures.insert(name.to_ascii_lowercase(), value);
                        }
                    }
                }
            }
        }

        config.base_url = config
            .base_url
            .map(|url| url.trim_end_matches('/').to_string());
        config
    }

    /// Look up a fixture override by name (e.g. `broker_id`)
    pub fn fixture(&self, name: &str) -> Option<&str> {
        self.fixtures.get(name).map(String::as_str)
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
