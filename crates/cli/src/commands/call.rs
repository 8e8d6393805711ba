//! Call-management API commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use callprobe_client::{poll, CallClient, CreateCallRequest};
use callprobe_common::{CallHandle, CallStatus, PollConfig};

use super::{PollArgs, PollDisplay};
use crate::output::{print_item, print_list, print_message, print_success, OutputFormat, TableDisplay};

#[derive(Subcommand)]
pub enum CallCommands {
    /// Place one or more calls
    Create {
        /// Number to dial
        number: String,

        /// Number of calls to place
        #[arg(long, default_value = "1")]
        count: u32,

        /// Status the API waits for before answering
        #[arg(long, default_value = "CONNECTED")]
        wait_on: CallStatus,

        /// Seconds the API waits for --wait-on
        #[arg(long, default_value = "120")]
        timeout: u64,
    },

    /// Press DTMF digits on a call
    Digits {
        /// Call handle
        handle: String,

        /// Digits to press (0-9, *, #, A-D, w/W/, for pauses)
        digits: String,
    },

    /// Hang up a call
    Drop {
        /// Call handle
        handle: String,
    },

    /// Show the number calls are placed from
    InboundNumber,

    /// Show the current status of a call
    Status {
        /// Call handle
        handle: String,
    },

    /// Wait for a call to reach a terminal status
    Poll {
        /// Call handle
        handle: String,

        #[command(flatten)]
        poll: PollArgs,
    },
}

/// Created call display wrapper for serialization
#[derive(Serialize)]
pub struct CallDisplay {
    pub handle: String,
    pub number: String,
}

impl TableDisplay for CallDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Call", "Number"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.handle.clone(), self.number.clone()]
    }
}

pub async fn execute(
    cmd: CallCommands,
    client: CallClient,
    poll_defaults: &PollConfig,
    format: OutputFormat,
) -> Result<()> {
    match cmd {
        CallCommands::Create { number, count, wait_on, timeout } => {
            let request = CreateCallRequest::new(&number)
                .count(count)
                .wait_on(wait_on)
                .timeout_secs(timeout);
            let handles = client.create_calls(&request).await?;
            print_success(&format!("{} call(s) placed to {}", handles.len(), number));

            let displays: Vec<CallDisplay> = handles
                .into_iter()
                .map(|handle| CallDisplay {
                    handle: handle.to_string(),
                    number: number.clone(),
                })
                .collect();
            print_list(&displays, format);
        }

        CallCommands::Digits { handle, digits } => {
            let handle = CallHandle::new(handle)?;
            client.send_digits(&handle, &digits).await?;
            print_success(&format!("Pressed {} on call {}", digits, handle));
        }

        CallCommands::Drop { handle } => {
            let handle = CallHandle::new(handle)?;
            client.drop_call(&handle).await?;
            print_success(&format!("Call {} dropped", handle));
        }

        CallCommands::InboundNumber => {
            let number = client.get_outbound_number().await?;
            print_message(&number, format);
        }

        CallCommands::Status { handle } => {
            let handle = CallHandle::new(handle)?;
            let status = client.get_call_status(&handle).await?;
            print_message(&format!("{}: {}", handle, status), format);
        }

        CallCommands::Poll { handle, poll: args } => {
            let handle = CallHandle::new(handle)?;
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
    }

    Ok(())
}
