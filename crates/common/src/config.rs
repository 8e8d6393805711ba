//! Client configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::PollConfig;

pub const ENV_BASE_URL: &str = "CALLPROBE_BASE_URL";
pub const ENV_TOKEN: &str = "CALLPROBE_TOKEN";
pub const ENV_REQUEST_TIMEOUT: &str = "CALLPROBE_REQUEST_TIMEOUT_SECS";
pub const ENV_TWILIO_ACCOUNT_SID: &str = "TWILIO_ACCOUNT_SID";
pub const ENV_TWILIO_AUTH_TOKEN: &str = "TWILIO_AUTH_TOKEN";
pub const ENV_TWILIO_BASE_URL: &str = "TWILIO_BASE_URL";

/// Top-level client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Call-management API
    pub call_api: CallApiConfig,

    /// Twilio account used to look calls up
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twilio: Option<TwilioConfig>,

    /// Default polling parameters
    pub poll: PollConfig,
}

/// Call-management API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CallApiConfig {
    /// Base URL, endpoint paths are appended to it
    pub base_url: String,

    /// Value of the `xima-token` header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for CallApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            token: None,
            request_timeout_secs: 30,
        }
    }
}

/// Twilio REST API credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    #[serde(default = "default_twilio_base_url")]
    pub base_url: String,
}

pub fn default_twilio_base_url() -> String {
    "https://api.twilio.com".to_string()
}

impl ClientConfig {
    /// Load configuration from file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            debug!("Loaded configuration from {}", path.display());
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Overlay values from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary variable lookup
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_BASE_URL) {
            self.call_api.base_url = url;
        }
        if let Some(token) = get(ENV_TOKEN) {
            self.call_api.token = Some(token);
        }
        if let Some(secs) = get(ENV_REQUEST_TIMEOUT) {
            self.call_api.request_timeout_secs = secs.trim().parse().map_err(|_| {
                Error::Config(format!("{} must be a whole number of seconds, got {:?}", ENV_REQUEST_TIMEOUT, secs))
            })?;
        }

        match (get(ENV_TWILIO_ACCOUNT_SID), get(ENV_TWILIO_AUTH_TOKEN)) {
            (Some(account_sid), Some(auth_token)) => {
                let base_url = get(ENV_TWILIO_BASE_URL)
                    .or_else(|| self.twilio.as_ref().map(|t| t.base_url.clone()))
                    .unwrap_or_else(default_twilio_base_url);
                self.twilio = Some(TwilioConfig { account_sid, auth_token, base_url });
            }
            (None, None) => {
                if let (Some(twilio), Some(url)) = (self.twilio.as_mut(), get(ENV_TWILIO_BASE_URL)) {
                    twilio.base_url = url;
                }
            }
            _ => {
                return Err(Error::Config(format!(
                    "{} and {} must be set together",
                    ENV_TWILIO_ACCOUNT_SID, ENV_TWILIO_AUTH_TOKEN
                )));
            }
        }

        Ok(())
    }

    /// Check the configuration is usable. A missing token is fatal.
    pub fn validate(&self) -> Result<()> {
        match self.call_api.token.as_deref() {
            Some(token) if !token.trim().is_empty() => {}
            _ => {
                return Err(Error::Config(format!(
                    "call API token is not set (export {})",
                    ENV_TOKEN
                )));
            }
        }
        if self.call_api.base_url.trim().is_empty() {
            return Err(Error::Config("call API base URL is empty".to_string()));
        }
        if self.call_api.request_timeout_secs == 0 {
            return Err(Error::Config("request timeout must be at least one second".to_string()));
        }
        self.poll.validate()
    }

    /// The call API token; only meaningful after `validate` succeeded
    pub fn token(&self) -> Result<&str> {
        self.call_api
            .token
            .as_deref()
            .ok_or_else(|| Error::Config(format!("{} is not set", ENV_TOKEN)))
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.call_api.request_timeout_secs)
    }
}
