//! Persisted refresh preferences
//!
//! Two booleans the watcher owns across runs: whether auto-refresh is
//! on and whether zero-transaction blocks are filtered out. Stored as
//! TOML in the user config directory; absence or a parse failure falls
//! back to the defaults.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshPrefs {
    #[serde(default = "default_auto_refresh")]
    pub auto_refresh: bool,

    #[serde(default)]
    pub filter_tx_only: bool,
}

fn default_auto_refresh() -> bool {
    true
}

impl Default for RefreshPrefs {
    fn default() -> Self {
        Self {
            auto_refresh: true,
            filter_tx_only: false,
        }
    }
}

pub fn load() -> RefreshPrefs {
    let Some(path) = prefs_path() else {
        return RefreshPrefs::default();
    };
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return RefreshPrefs::default(),
    };
    toml::from_str::<RefreshPrefs>(&content).unwrap_or_default()
}

pub fn save(prefs: &RefreshPrefs) -> Result<()> {
    let path = prefs_path().context("No writable config directory")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }
    let content = toml::to_string(prefs).context("Failed to serialize preferences")?;
    fs::write(&path, content).context("Failed to write preferences")?;
    Ok(())
}

pub fn prefs_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("ANVIL_LENS_PREFS").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("anvil-lens").join("prefs.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("anvil-lens").join("prefs.toml"));
    }

    directories::ProjectDirs::from("io", "anvil-lens", "anvil-lens")
        .map(|dirs| dirs.config_dir().join("prefs.toml"))
}
