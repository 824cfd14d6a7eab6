use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::Policy;

const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  /// Per-resource cache overrides keyed by resource name (e.g. "imports.search")
  #[serde(default)]
  pub cache: BTreeMap<String, PolicyOverride>,
  /// Rows per page for paged listings
  #[serde(default = "default_page_size")]
  pub page_size: u32,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      api: ApiConfig::default(),
      cache: BTreeMap::new(),
      page_size: DEFAULT_PAGE_SIZE,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the API gateway
  #[serde(default = "default_api_url")]
  pub url: String,
  /// Request timeout in seconds
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: default_api_url(),
      timeout_secs: DEFAULT_TIMEOUT_SECS,
    }
  }
}

impl ApiConfig {
  pub fn with_url(url: impl Into<String>) -> Self {
    Self {
      url: url.into(),
      ..Self::default()
    }
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

/// Partial cache policy; unset fields keep the resource's built-in value.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub struct PolicyOverride {
  pub stale_secs: Option<u64>,
  pub gc_secs: Option<u64>,
  pub retry: Option<u32>,
}

impl PolicyOverride {
  pub fn apply(&self, policy: Policy) -> Policy {
    let mut policy = policy;
    if let Some(secs) = self.stale_secs {
      policy = policy.with_stale_time(Duration::from_secs(secs));
    }
    if let Some(secs) = self.gc_secs {
      policy = policy.with_gc_time(Duration::from_secs(secs));
    }
    if let Some(retry) = self.retry {
      policy = policy.with_retry(retry);
    }
    policy
  }
}

fn default_api_url() -> String {
  DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
  DEFAULT_TIMEOUT_SECS
}

fn default_page_size() -> u32 {
  DEFAULT_PAGE_SIZE
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./stockroom.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/stockroom/config.yaml
  ///
  /// Without a file the defaults apply. `STOCKROOM_API_URL` overrides
  /// `api.url` either way.
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

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    config
      .with_env_overrides(|name| std::env::var(name).ok())
      .validated()
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("stockroom.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("stockroom").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    // An empty file parses as null
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))
  }

  fn with_env_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
    if let Some(url) = var("STOCKROOM_API_URL").filter(|u| !u.is_empty()) {
      self.api.url = url;
    }
    self
  }

  fn validated(self) -> Result<Self> {
    if self.page_size == 0 {
      return Err(eyre!("page_size must be at least 1"));
    }
    url::Url::parse(&self.api.url).map_err(|e| eyre!("Invalid api.url {}: {}", self.api.url, e))?;
    Ok(self)
  }

  /// Get the login password from environment variables.
  ///
  /// Checks STOCKROOM_PASSWORD.
  pub fn get_password() -> Result<String> {
    std::env::var("STOCKROOM_PASSWORD")
      .map_err(|_| eyre!("Password not found. Set STOCKROOM_PASSWORD environment variable."))
  }
}
