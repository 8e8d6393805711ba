//! Call verification workflow: create → route (DTMF) → poll → verify

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

use callprobe_common::{CallHandle, CallStatus, PollConfig, PollResult, Result};

use crate::calls::{validate_digits, CallClient};
use crate::poller::{poll, CallStatusSource};

/// Milliseconds spent in each stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowTimings {
    pub create_ms: u64,
    pub digits_ms: u64,
    pub poll_ms: u64,
    pub total_ms: u64,
}

/// Report for one workflow run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub handle: CallHandle,
    pub result: PollResult,
    /// True when the call ended `COMPLETED`
    pub succeeded: bool,
    pub timings: WorkflowTimings,
}

/// Create a call to `number`, route it with `digits`, then poll it to a terminal status.
///
/// Inputs are validated before any call is placed. Errors from every stage
/// propagate unchanged; a call that ends `FAILED` or `CANCELED` is a
/// successful run with `succeeded == false`.
pub async fn run_call_verification_workflow<S>(
    client: &CallClient,
    source: &S,
    number: &str,
    digits: &str,
    poll_config: &PollConfig,
) -> Result<WorkflowResult>
where
    S: CallStatusSource + ?Sized,
{
    poll_config.validate()?;
    validate_digits(digits)?;

    let started = Instant::now();

    let handle = client.create_call(number).await?;
    let create_ms = elapsed_ms(started);

    let stage = Instant::now();
    client.send_digits(&handle, digits).await?;
    let digits_ms = elapsed_ms(stage);

    let stage = Instant::now();
    let result = poll(source, &handle, poll_config).await?;
    let poll_ms = elapsed_ms(stage);

    let succeeded = result.final_status == CallStatus::Completed;
    info!(
        "Call {} to {} finished {} ({})",
        handle,
        number,
        result.final_status,
        if succeeded { "verified" } else { "not completed" }
    );

    Ok(WorkflowResult {
        handle,
        result,
        succeeded,
        timings: WorkflowTimings {
            create_ms,
            digits_ms,
            poll_ms,
            total_ms: elapsed_ms(started),
        },
    })
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}
