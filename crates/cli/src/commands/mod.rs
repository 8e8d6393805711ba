//! CLI Commands

pub mod call;
pub mod twilio;
pub mod verify;

use clap::Args;
use serde::Serialize;

use callprobe_client::WorkflowResult;
use callprobe_common::{CallStatus, PollConfig, PollResult};

use crate::output::TableDisplay;

/// Polling flags shared by `call poll`, `twilio poll` and `verify`
#[derive(Args, Debug, Clone, Default)]
pub struct PollArgs {
    /// Maximum number of status checks
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Milliseconds between status checks
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Statuses that end polling (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub terminal: Vec<CallStatus>,
}

impl PollArgs {
    /// Apply the flags on top of the configured defaults
    pub fn resolve(&self, defaults: &PollConfig) -> PollConfig {
        let mut config = defaults.clone();
        if let Some(max_attempts) = self.max_attempts {
            config.max_attempts = max_attempts;
        }
        if let Some(interval_ms) = self.interval_ms {
            config.interval_ms = interval_ms;
        }
        if !self.terminal.is_empty() {
            config = config.with_terminal_states(self.terminal.iter().copied());
        }
        config
    }
}

/// Poll result display wrapper for serialization
#[derive(Serialize)]
pub struct PollDisplay {
    pub handle: String,
    #[serde(flatten)]
    pub result: PollResult,
}

impl TableDisplay for PollDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Call", "Status", "Attempts", "Elapsed"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.handle.clone(),
            self.result.final_status.to_string(),
            self.result.attempts_used.to_string(),
            format!("{}ms", self.result.elapsed_ms),
        ]
    }
}

impl TableDisplay for WorkflowResult {
    fn headers() -> Vec<&'static str> {
        vec!["Call", "Status", "Verified", "Attempts", "Create", "Digits", "Poll", "Total"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.handle.to_string(),
            self.result.final_status.to_string(),
            if self.succeeded { "yes" } else { "no" }.to_string(),
            self.result.attempts_used.to_string(),
            format!("{}ms", self.timings.create_ms),
            format!("{}ms", self.timings.digits_ms),
            format!("{}ms", self.timings.poll_ms),
            format!("{}ms", self.timings.total_ms),
        ]
    }
}
