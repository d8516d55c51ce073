//! Directory structure helpers for xbe-harness
//!
//! ~/.xbe-harness/
//! └── config.toml     # Global config

use std::path::PathBuf;

/// Get the harness home directory (~/.xbe-harness).
/// Falls back to the current directory when no home directory is known.
pub fn harness_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".xbe-harness")
}

/// Get the config file path (~/.xbe-harness/config.toml)
pub fn config_file() -> PathBuf {
    harness_dir().join("config.toml")
}
