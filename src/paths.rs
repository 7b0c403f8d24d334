//! Centralized application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! # Directory Layout
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | App data | `~/Library/Application Support/kunna/` | `~/.local/share/kunna/` |
//! | Config | `~/Library/Application Support/kunna/` | `~/.config/kunna/` |
//!
//! # Environment Overrides
//!
//! - `KUNNA_DATA_DIR` overrides [`data_dir`]
//! - `KUNNA_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Holds the memory store, health log, meeting summaries and logs.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("KUNNA_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("kunna"))
        .unwrap_or_else(|| std::env::temp_dir().join("kunna-data"))
}

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("KUNNA_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("kunna"))
        .unwrap_or_else(|| std::env::temp_dir().join("kunna-config"))
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Key/value memory file (`data_dir()/memory.json`).
#[must_use]
pub fn memory_file() -> PathBuf {
    data_dir().join("memory.json")
}

/// Health log file (`data_dir()/health_log.jsonl`).
#[must_use]
pub fn health_log_file() -> PathBuf {
    data_dir().join("health_log.jsonl")
}

/// Meeting summaries directory (`data_dir()/meetings/`).
#[must_use]
pub fn meetings_dir() -> PathBuf {
    data_dir().join("meetings")
}

/// Default root for the file finder: the user's home directory.
#[must_use]
pub fn default_search_root() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}
