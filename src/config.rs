use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Base URL used when no config file or override is present.
pub const DEFAULT_API_URL: &str = "http://localhost:3001";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  /// Custom title for the header (defaults to the API host if not set)
  pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the blog REST service
  #[serde(default = "default_api_url")]
  pub url: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: default_api_url(),
    }
  }
}

fn default_api_url() -> String {
  DEFAULT_API_URL.to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./weblog.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/weblog/config.yaml
  ///
  /// Every setting has a default, so a missing file is not an error.
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
    let local = PathBuf::from("weblog.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("weblog").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the API url override from the environment, if set.
  ///
  /// WEBLOG_API_URL takes precedence over the config file but not over the
  /// command line.
  pub fn api_url_override() -> Option<String> {
    std::env::var("WEBLOG_API_URL").ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.api.url, DEFAULT_API_URL);
    assert!(config.title.is_none());
  }

  #[test]
  fn test_parse_full_config() {
    let config: Config = serde_yaml::from_str(
      "api:\n  url: https://blog.example.com\ntitle: We-Blog\n",
    )
    .unwrap();
    assert_eq!(config.api.url, "https://blog.example.com");
    assert_eq!(config.title.as_deref(), Some("We-Blog"));
  }

  #[test]
  fn test_missing_sections_fall_back_to_defaults() {
    let config: Config = serde_yaml::from_str("title: We-Blog\n").unwrap();
    assert_eq!(config.api.url, DEFAULT_API_URL);
  }
}
