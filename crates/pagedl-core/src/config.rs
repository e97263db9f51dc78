use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Retry cap for submission chains (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of submit attempts per page (including the first).
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 8 }
    }
}

/// Global configuration loaded from `~/.config/pagedl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedlConfig {
    /// Size in bytes of the fragments the CLI splits pages into.
    pub chunk_size: usize,
    /// Buffered lifecycle events per listener before it lags.
    pub event_capacity: usize,
    /// Where the filesystem host saves pages. Defaults to the XDG data dir.
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// Give up on a download with no terminal event after this many seconds.
    #[serde(default)]
    pub completion_timeout_secs: Option<u64>,
    /// Optional retry cap; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for PagedlConfig {
    fn default() -> Self {
        Self {
            chunk_size: 64 * 1024,
            event_capacity: 64,
            download_dir: None,
            completion_timeout_secs: None,
            retry: None,
        }
    }
}

impl PagedlConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
            .as_ref()
            .map(RetryPolicy::from)
            .unwrap_or_default()
    }

    pub fn completion_timeout(&self) -> Option<Duration> {
        self.completion_timeout_secs.map(Duration::from_secs)
    }

    /// Configured download dir, or `~/.local/share/pagedl/downloads`.
    pub fn download_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.download_dir {
            return Ok(dir.clone());
        }
        let xdg_dirs = xdg::BaseDirectories::with_prefix("pagedl")?;
        Ok(xdg_dirs.get_data_home().join("downloads"))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("pagedl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<PagedlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = PagedlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: PagedlConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = PagedlConfig::default();
        assert_eq!(cfg.chunk_size, 64 * 1024);
        assert_eq!(cfg.event_capacity, 64);
        assert!(cfg.completion_timeout().is_none());
        assert_eq!(cfg.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = PagedlConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: PagedlConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.chunk_size, cfg.chunk_size);
        assert_eq!(parsed.event_capacity, cfg.event_capacity);
        assert!(parsed.download_dir.is_none());
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            chunk_size = 1024
            event_capacity = 8
            download_dir = "/srv/pages"
            completion_timeout_secs = 120

            [retry]
            max_attempts = 3
        "#;
        let cfg: PagedlConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.chunk_size, 1024);
        assert_eq!(cfg.download_dir.as_deref(), Some(std::path::Path::new("/srv/pages")));
        assert_eq!(cfg.download_dir().unwrap(), PathBuf::from("/srv/pages"));
        assert_eq!(cfg.completion_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(cfg.retry_policy().max_attempts, 3);
    }
}
