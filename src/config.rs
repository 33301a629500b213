use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  /// Remote JSON:API source; without it lookups never leave the local cache
  pub remote: Option<RemoteConfig>,
  /// Documents pushed into the local cache at startup
  #[serde(default)]
  pub seed: Vec<PathBuf>,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
  pub base_url: String,
  /// Per-request timeout in seconds
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
  30
}

impl RemoteConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// Default level, overridden by RUST_LOG
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Write logs to `rescache.log` in this directory instead of stderr
  pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
  "warn".to_string()
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      dir: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./rescache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/rescache/config.yaml
  ///
  /// Falls back to defaults when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    match explicit_path {
      Some(path) if !path.exists() => Err(eyre!("Config file not found: {}", path.display())),
      Some(path) => Self::load_from_path(path),
      None => match first_existing(Self::search_paths()) {
        Some(path) => Self::load_from_path(&path),
        None => Ok(Self::default()),
      },
    }
  }

  /// Implicit config locations, highest priority first.
  fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("rescache.yaml")];
    paths.extend(dirs::config_dir().map(|dir| dir.join("rescache").join("config.yaml")));
    paths
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  /// Get the remote API token from the environment, if set.
  ///
  /// Checks RESCACHE_API_TOKEN.
  pub fn get_api_token() -> Option<String> {
    std::env::var("RESCACHE_API_TOKEN")
      .ok()
      .filter(|token| !token.is_empty())
  }
}

fn first_existing(candidates: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
  candidates.into_iter().find(|path| path.exists())
}
