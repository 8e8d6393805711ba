//! Twilio lookup commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use callprobe_client::{poll, CallerIdCheck, TwilioCall, TwilioClient};
use callprobe_common::{CallHandle, PollConfig};

use super::{PollArgs, PollDisplay};
use crate::output::{print_error, print_item, print_success, OutputFormat, TableDisplay};

#[derive(Subcommand)]
pub enum TwilioCommands {
    /// Show a Twilio call record
    Call {
        /// Twilio call SID
        sid: String,
    },

    /// Wait for a Twilio call to reach a terminal status
    Poll {
        /// Twilio call SID
        sid: String,

        #[command(flatten)]
        poll: PollArgs,
    },

    /// Check the caller id presented on a call
    CallerId {
        /// Twilio call SID
        sid: String,

        /// Expected caller id
        expected: String,
    },
}

/// Twilio call display wrapper for serialization
#[derive(Serialize)]
pub struct TwilioCallDisplay {
    pub sid: String,
    pub status: String,
    pub from: String,
    pub to: String,
    pub direction: String,
    pub duration_secs: Option<u64>,
}

impl From<TwilioCall> for TwilioCallDisplay {
    fn from(call: TwilioCall) -> Self {
        let status = call
            .call_status()
            .map(|s| format!("{} ({})", s, call.status))
            .unwrap_or_else(|_| call.status.clone());
        Self {
            duration_secs: call.duration_secs(),
            sid: call.sid,
            status,
            from: call.from.unwrap_or_default(),
            to: call.to.unwrap_or_default(),
            direction: call.direction.unwrap_or_default(),
        }
    }
}

impl TableDisplay for TwilioCallDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["SID", "Status", "From", "To", "Direction", "Duration"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.sid.clone(),
            self.status.clone(),
            self.from.clone(),
            self.to.clone(),
            self.direction.clone(),
            self.duration_secs.map(|d| format!("{}s", d)).unwrap_or_else(|| "-".to_string()),
        ]
    }
}

impl TableDisplay for CallerIdCheck {
    fn headers() -> Vec<&'static str> {
        vec!["Expected", "Observed", "Match"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.expected.clone(),
            self.observed.clone().unwrap_or_else(|| "-".to_string()),
            if self.matches { "yes" } else { "no" }.to_string(),
        ]
    }
}

/// Returns false when a caller-id check did not match
pub async fn execute(
    cmd: TwilioCommands,
    client: TwilioClient,
    poll_defaults: &PollConfig,
    format: OutputFormat,
) -> Result<bool> {
    match cmd {
        TwilioCommands::Call { sid } => {
            let call = client.fetch_call(&sid).await?;
            print_item(&TwilioCallDisplay::from(call), format);
        }

        TwilioCommands::Poll { sid, poll: args } => {
            let handle = CallHandle::new(sid)?;
            let config = args.resolve(poll_defaults);
            let result = poll(&client, &handle, &config).await?;
            print_item(
                &PollDisplay {
                    handle: handle.to_string(),
                    result,
                },
                format,
            );
        }

        TwilioCommands::CallerId { sid, expected } => {
            let check = client.verify_caller_id(&sid, &expected).await?;
            if check.matches {
                print_success(&format!("Call {} presented {}", sid, expected));
            } else {
                print_error(&format!("Call {} did not present {}", sid, expected));
            }
            print_item(&check, format);
            return Ok(check.matches);
        }
    }

    Ok(true)
}
