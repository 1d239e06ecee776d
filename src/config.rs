use std::path::PathBuf;
use std::time::Duration;

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::poller::POLL_INTERVAL;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_SITE_URL: &str = "http://localhost:8080";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub api_url: Option<String>,
    pub site_url: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub default_lang: Option<String>,
    pub open_browser: Option<bool>,
}

impl Config {
    /// Load config from ~/.config/sumtube/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    pub fn site_url(&self) -> &str {
        self.site_url.as_deref().unwrap_or(DEFAULT_SITE_URL)
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval_ms.map(Duration::from_millis).unwrap_or(POLL_INTERVAL)
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("sumtube")
        .join("config.toml")
}
