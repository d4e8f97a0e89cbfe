use crate::poller::{PollError, PollPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_INSTALL_PATH: &str = "/api/detection_engine/rules/prepackaged";
pub const DEFAULT_STATUS_PATH: &str = "/api/detection_engine/rules/prepackaged/_status";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub poll: PollConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub url: String,
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_install_path")]
    pub install_path: String,
    #[serde(default = "default_status_path")]
    pub status_path: String,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_install_path() -> String {
    DEFAULT_INSTALL_PATH.to_string()
}

fn default_status_path() -> String {
    DEFAULT_STATUS_PATH.to_string()
}

impl ApiConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: default_timeout(),
            username: None,
            password: None,
            install_path: default_install_path(),
            status_path: default_status_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(with = "humantime_serde", default = "default_interval")]
    pub interval: Duration,
}

fn default_max_attempts() -> u32 {
    100
}

fn default_interval() -> Duration {
    Duration::from_millis(300)
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval: default_interval(),
        }
    }
}

impl PollConfig {
    pub fn policy(&self) -> Result<PollPolicy, PollError> {
        PollPolicy::new(self.max_attempts, self.interval)
    }
}
