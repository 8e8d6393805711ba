//! Core types for callprobe

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default number of status checks before giving up on a call
pub const DEFAULT_MAX_ATTEMPTS: u32 = 24;

/// Default pause between status checks
pub const DEFAULT_INTERVAL_MS: u64 = 5_000;

/// Identifier for a call created through the call-management API.
///
/// Opaque to callprobe: it is never parsed, only passed back to the API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallHandle(String);

impl CallHandle {
    /// Wrap an identifier, rejecting blank ones
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidArgument("call handle must not be empty".to_string()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CallHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Call status as reported by the remote system
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallStatus {
    Pending,
    Ringing,
    Connected,
    Completed,
    Failed,
    Canceled,
}

impl CallStatus {
    /// Statuses after which no further transitions are expected
    pub const TERMINAL: [CallStatus; 3] =
        [CallStatus::Completed, CallStatus::Failed, CallStatus::Canceled];

    pub fn is_terminal(&self) -> bool {
        Self::TERMINAL.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Pending => "PENDING",
            CallStatus::Ringing => "RINGING",
            CallStatus::Connected => "CONNECTED",
            CallStatus::Completed => "COMPLETED",
            CallStatus::Failed => "FAILED",
            CallStatus::Canceled => "CANCELED",
        }
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CallStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(CallStatus::Pending),
            "RINGING" => Ok(CallStatus::Ringing),
            "CONNECTED" => Ok(CallStatus::Connected),
            "COMPLETED" => Ok(CallStatus::Completed),
            "FAILED" => Ok(CallStatus::Failed),
            "CANCELED" | "CANCELLED" => Ok(CallStatus::Canceled),
            other => Err(Error::InvalidResponseFormat(format!("unknown call status: {}", other))),
        }
    }
}

/// Polling parameters supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Maximum number of status fetches, at least 1
    pub max_attempts: u32,

    /// Pause between fetches in milliseconds
    pub interval_ms: u64,

    /// Statuses that end polling
    pub terminal_states: BTreeSet<CallStatus>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval_ms: DEFAULT_INTERVAL_MS,
            terminal_states: CallStatus::TERMINAL.into_iter().collect(),
        }
    }
}

impl PollConfig {
    pub fn new(max_attempts: u32, interval_ms: u64) -> Self {
        Self {
            max_attempts,
            interval_ms,
            ..Default::default()
        }
    }

    pub fn with_terminal_states(mut self, states: impl IntoIterator<Item = CallStatus>) -> Self {
        self.terminal_states = states.into_iter().collect();
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn is_terminal(&self, status: CallStatus) -> bool {
        self.terminal_states.contains(&status)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts < 1 {
            return Err(Error::InvalidArgument("max_attempts must be at least 1".to_string()));
        }
        if self.terminal_states.is_empty() {
            return Err(Error::InvalidArgument(
                "terminal_states must name at least one status".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a poll that observed a terminal status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResult {
    pub final_status: CallStatus,
    pub attempts_used: u32,
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_handle_rejects_blank() {
        assert!(CallHandle::new("").is_err());
        assert!(CallHandle::new("   ").is_err());
        assert_eq!(CallHandle::new("abc123").unwrap().as_str(), "abc123");
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("completed".parse::<CallStatus>().unwrap(), CallStatus::Completed);
        assert_eq!("Ringing".parse::<CallStatus>().unwrap(), CallStatus::Ringing);
        assert_eq!("cancelled".parse::<CallStatus>().unwrap(), CallStatus::Canceled);
        assert!("busy".parse::<CallStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_upper_case() {
        let json = serde_json::to_string(&CallStatus::Connected).unwrap();
        assert_eq!(json, "\"CONNECTED\"");
    }

    #[test]
    fn test_default_poll_config() {
        let config = PollConfig::default();
        assert_eq!(config.max_attempts, 24);
        assert_eq!(config.interval(), Duration::from_secs(5));
        assert!(config.is_terminal(CallStatus::Completed));
        assert!(config.is_terminal(CallStatus::Canceled));
        assert!(!config.is_terminal(CallStatus::Connected));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_poll_config_validation() {
        assert!(PollConfig::new(0, 0).validate().is_err());

        let empty = PollConfig::new(3, 0).with_terminal_states(Vec::<CallStatus>::new());
        assert!(empty.validate().is_err());

        let narrow = PollConfig::new(1, 0).with_terminal_states([CallStatus::Completed]);
        assert!(narrow.validate().is_ok());
        assert!(!narrow.is_terminal(CallStatus::Failed));
    }
}
