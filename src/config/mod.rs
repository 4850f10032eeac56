use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

/// The stock first dev-node account (anvil and hardhat both seed it).
pub const DEFAULT_DEV_ACCOUNT: &str = "0xf39fd6e51aad88f6dace687ef88bce6dafdc6707";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_rpc")]
    pub rpc: String,

    #[serde(default = "default_account")]
    pub account: String,

    #[serde(default = "default_window")]
    pub window: u64,

    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: default_rpc(),
            account: default_account(),
            window: default_window(),
            listen: default_listen(),
        }
    }
}

fn default_rpc() -> String {
    "http://localhost:8545".to_string()
}

fn default_account() -> String {
    DEFAULT_DEV_ACCOUNT.to_string()
}

fn default_window() -> u64 {
    5
}

fn default_listen() -> String {
    "127.0.0.1:3000".to_string()
}

pub fn load() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return Config::default(),
    };
    toml::from_str::<Config>(&content).unwrap_or_default()
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("ANVIL_LENS_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("anvil-lens").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("anvil-lens").join("config.toml"));
    }

    directories::ProjectDirs::from("io", "anvil-lens", "anvil-lens")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
