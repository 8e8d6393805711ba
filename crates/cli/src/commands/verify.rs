//! Call verification workflow command

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use tracing::{info, warn};

use callprobe_client::{
    run_call_verification_workflow, CallClient, CallStatusSource, RunLedger, TwilioClient, WorkflowResult,
};
use callprobe_common::PollConfig;

use super::PollArgs;
use crate::output::{print_error, print_list, print_success, print_warning, OutputFormat};

#[derive(Args)]
pub struct VerifyArgs {
    /// Number to dial
    pub number: String,

    /// DTMF digits that route the call
    pub digits: String,

    /// Label recorded with each run
    #[arg(short, long)]
    pub label: Option<String>,

    /// Number of sequential runs
    #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: u32,

    /// Poll call status through Twilio instead of the call API
    #[arg(long)]
    pub via_twilio: bool,

    #[command(flatten)]
    pub poll: PollArgs,

    /// Directory for call-results.json
    #[arg(short, long, default_value = "test-results")]
    pub output: PathBuf,
}

/// Run the workflow `args.repeat` times; returns true when every run verified
pub async fn execute(
    args: VerifyArgs,
    client: CallClient,
    twilio: Option<TwilioClient>,
    poll_defaults: &PollConfig,
    format: OutputFormat,
) -> Result<bool> {
    let config = args.poll.resolve(poll_defaults);
    let source: &dyn CallStatusSource = match (&twilio, args.via_twilio) {
        (Some(twilio), true) => twilio,
        (None, true) => anyhow::bail!("--via-twilio needs TWILIO_ACCOUNT_SID and TWILIO_AUTH_TOKEN"),
        (_, false) => &client,
    };

    let label = args
        .label
        .clone()
        .unwrap_or_else(|| format!("{} via {}", args.number, args.digits));
    let mut ledger = RunLedger::new();
    let mut finished: Vec<WorkflowResult> = Vec::new();

    for run in 1..=args.repeat {
        info!("Run {}/{}: calling {}", run, args.repeat, args.number);
        let id = ledger.create(label.clone());
        let outcome =
            run_call_verification_workflow(&client, source, &args.number, &args.digits, &config).await;
        ledger.record(id, &outcome)?;

        match outcome {
            Ok(result) => {
                if result.succeeded {
                    print_success(&format!("Call {} completed", result.handle));
                } else {
                    print_warning(&format!("Call {} ended {}", result.handle, result.result.final_status));
                }
                finished.push(result);
            }
            Err(e) => {
                if e.is_poll_failure() {
                    warn!("Call did not settle: {}", e);
                }
                print_error(&format!("Run {} failed: {}", run, e));
            }
        }
    }

    print_list(&finished, format);

    let summary = ledger.summary();
    ledger.write_results(&args.output)?;
    info!(
        "Verification: {} passed, {} failed of {}",
        summary.passed, summary.failed, summary.total
    );

    Ok(summary.failed == 0 && summary.pending == 0)
}
