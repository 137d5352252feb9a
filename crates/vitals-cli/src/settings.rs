//! Layered settings: an optional TOML file, then `VITALS_*` environment
//! variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use config::{Config, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;
use vitals_rest::RestConfig;

const ENV_PREFIX: &str = "VITALS";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
  /// Base URL of the hosted backend. Local-only when unset.
  #[serde(default)]
  pub remote_url:           Option<String>,
  #[serde(default)]
  pub remote_api_key:       Option<String>,
  #[serde(default = "default_timeout_secs")]
  pub request_timeout_secs: u64,
  #[serde(default)]
  pub use_summary_view:     bool,
  /// SQLite file for the local store. A leading `~/` is expanded.
  #[serde(default = "default_store_path")]
  pub store_path:           PathBuf,
}

fn default_timeout_secs() -> u64 { vitals_rest::DEFAULT_TIMEOUT.as_secs() }

fn default_store_path() -> PathBuf { PathBuf::from("vitals.db") }

impl Settings {
  /// Read `path` if it exists, then overlay the environment.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Self::build(
      Config::builder()
        .add_source(File::from(path.to_path_buf()).required(false))
        .add_source(Environment::with_prefix(ENV_PREFIX)),
    )
  }

  fn build(builder: config::ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
    builder.build()?.try_deserialize()
  }

  /// Remote connection settings, if both the URL and the key are present.
  pub fn remote(&self) -> Option<RestConfig> {
    let url = self.remote_url.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
    let key = self.remote_api_key.as_deref().map(str::trim).filter(|s| !s.is_empty())?;

    let mut config = RestConfig::new(url, key);
    config.timeout = Duration::from_secs(self.request_timeout_secs);
    config.use_summary_view = self.use_summary_view;
    Some(config)
  }

  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
