//! Client configuration loaded from `compute-horde.toml`.
//!
//! [`ClientConfig`] carries everything [`ComputeHordeClient`](crate::ComputeHordeClient)
//! needs. Fields missing from the file fall back to defaults, and the
//! `COMPUTE_HORDE_*` environment variables take precedence over the file.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_FACILITATOR_URL: &str = "https://facilitator.computehorde.io/api/v1/";
pub const DEFAULT_CONFIG_FILE: &str = "compute-horde.toml";

pub const ENV_FACILITATOR_TOKEN: &str = "COMPUTE_HORDE_FACILITATOR_TOKEN";
pub const ENV_FACILITATOR_URL: &str = "COMPUTE_HORDE_FACILITATOR_URL";
pub const ENV_VALIDATOR_HOTKEY: &str = "COMPUTE_HORDE_VALIDATOR_HOTKEY";

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the Facilitator API.
    #[serde(default = "default_facilitator_url")]
    pub facilitator_url: String,

    /// Facilitator API token, sent as `Authorization: Token <token>`.
    #[serde(default)]
    pub facilitator_token: String,

    /// Validator the jobs should go to. Chosen by the facilitator when unset.
    #[serde(default)]
    pub validator_hotkey: Option<String>,

    /// Delay between status refreshes while waiting for a job.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Seconds allowed for opening a connection to the facilitator.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Seconds allowed for a whole request, response body included.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_facilitator_url() -> String {
    DEFAULT_FACILITATOR_URL.to_string()
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            facilitator_url: default_facilitator_url(),
            facilitator_token: String::new(),
            validator_hotkey: None,
            poll_interval_ms: default_poll_interval_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ClientConfig {
    pub fn new(facilitator_token: impl Into<String>) -> Self {
        Self {
            facilitator_token: facilitator_token.into(),
            ..Default::default()
        }
    }

    pub fn with_facilitator_url(mut self, url: impl Into<String>) -> Self {
        self.facilitator_url = url.into();
        self
    }

    pub fn with_validator_hotkey(mut self, hotkey: impl Into<String>) -> Self {
        self.validator_hotkey = Some(hotkey.into());
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Load `compute-horde.toml` from the current directory, then apply the
    /// environment. Defaults are used when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        Self::load_from_with(path, |key| std::env::var(key).ok())
    }

    fn load_from_with(path: &Path, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str::<ClientConfig>(&contents)
                .with_context(|| format!("parsing {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env(lookup);
        Ok(config)
    }

    /// Environment variables take precedence over the file. Empty values are ignored.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v: &String| !v.is_empty());
        if let Some(token) = lookup(ENV_FACILITATOR_TOKEN) {
            self.facilitator_token = token;
        }
        if let Some(url) = lookup(ENV_FACILITATOR_URL) {
            self.facilitator_url = url;
        }
        if let Some(hotkey) = lookup(ENV_VALIDATOR_HOTKEY) {
            self.validator_hotkey = Some(hotkey);
        }
    }
}
