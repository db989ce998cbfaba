use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::DEFAULT_TTL_MS;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub http: HttpConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// How long a fetched response is served from memory, in milliseconds
  #[serde(default = "default_ttl_ms")]
  pub ttl_ms: u64,
  /// When false every request goes to the network
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Coalesce concurrent misses for the same request into one fetch
  #[serde(default)]
  pub single_flight: bool,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_ms: default_ttl_ms(),
      enabled: true,
      single_flight: false,
    }
  }
}

impl CacheConfig {
  pub fn ttl(&self) -> Result<Duration> {
    let millis = i64::try_from(self.ttl_ms)
      .map_err(|_| eyre!("cache.ttl_ms is too large: {}", self.ttl_ms))?;
    Duration::try_milliseconds(millis)
      .ok_or_else(|| eyre!("cache.ttl_ms is out of range: {}", self.ttl_ms))
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpConfig {
  /// Whole-request timeout in seconds (none by default)
  pub timeout_secs: Option<u64>,
  /// Custom User-Agent header
  pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// Default filter directive, overridden by RUST_LOG
  #[serde(default = "default_log_level")]
  pub level: String,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
    }
  }
}

fn default_ttl_ms() -> u64 {
  DEFAULT_TTL_MS as u64
}

fn default_true() -> bool {
  true
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./reqcache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/reqcache/config.yaml
  ///
  /// Falls back to defaults when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("reqcache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("reqcache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    // An empty file is a valid, all-defaults config
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }
}
