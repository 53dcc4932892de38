use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::window::DEFAULT_CAPACITY;

pub const DEFAULT_CONFIG_FILE: &str = "wires.json";

fn default_version() -> u32 {
    1
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_feed_url() -> String {
    "http://127.0.0.1:4000".to_string()
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_timeout_ms() -> u64 {
    5_000
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WiresConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Backend serving the REST surface.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Backend serving the live event stream.
    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    #[serde(default = "default_capacity")]
    pub window_capacity: usize,

    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,

    // Initial contents of the local access-list views.
    #[serde(default)]
    pub blacklist: Vec<String>,
    #[serde(default)]
    pub whitelist: Vec<String>,
}

impl Default for WiresConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            base_url: default_base_url(),
            feed_url: default_feed_url(),
            window_capacity: default_capacity(),
            request_timeout_ms: default_timeout_ms(),
            blacklist: Vec::new(),
            whitelist: Vec::new(),
        }
    }
}

impl WiresConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Reads the config at `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: WiresConfig = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse {}", path.display()))?;
        if cfg.version != 1 {
            anyhow::bail!(
                "unsupported config version {} in {}",
                cfg.version,
                path.display()
            );
        }
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self).context("serialize config")?;
        write_atomic(path, &bytes).with_context(|| format!("write {}", path.display()))
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(url) = &overrides.base_url {
            self.base_url = url.clone();
        }
        if let Some(url) = &overrides.feed_url {
            self.feed_url = url.clone();
        }
        if let Some(capacity) = overrides.window_capacity {
            self.window_capacity = capacity;
        }
    }
}

/// Per-run settings taken from command-line flags.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub feed_url: Option<String>,
    pub window_capacity: Option<usize>,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).context("create parent directories")?;
    }
    let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
    fs::write(&tmp, bytes).with_context(|| format!("write temp file {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
