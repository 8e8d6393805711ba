//! Call-status poller
//!
//! Repeatedly fetches the status of a call until it reaches a terminal
//! status or the attempt budget runs out.
//!
//! ```text
//!            ┌──────────────┐ non-terminal / fetch error, budget left
//!            │   Running    │◄──────────────┐
//!            └──────┬───────┘───────────────┘
//!     terminal      │   non-terminal, last attempt   fetch error, last attempt
//!   ┌───────────────┼──────────────────────────────┐
//!   ▼               ▼                              ▼
//! TerminatedSuccess TerminatedTimeout        TerminatedError
//! (PollResult)      (PollTimeout)            (PollExhausted)
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use callprobe_common::{CallHandle, CallStatus, Error, PollConfig, PollResult, Result};

/// Anything that can report the current status of a call
#[async_trait]
pub trait CallStatusSource: Send + Sync {
    /// Fetch the current status. A failure is treated as transient by the poller.
    async fn fetch_status(&self, handle: &CallHandle) -> Result<CallStatus>;
}

/// Poller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollState {
    Running,
    TerminatedSuccess,
    TerminatedTimeout,
    TerminatedError,
}

impl PollState {
    pub fn is_terminated(&self) -> bool {
        !matches!(self, PollState::Running)
    }
}

/// What the poll loop does after an attempt
#[derive(Debug)]
pub enum PollStep {
    /// Sleep for the interval, then fetch again
    Retry,
    /// Polling is over
    Done(Result<PollResult>),
}

/// Bookkeeping for one poll of one call
#[derive(Debug)]
pub struct PollTracker {
    handle: CallHandle,
    config: PollConfig,
    state: PollState,
    attempts: u32,
    last_status: Option<CallStatus>,
    started: Instant,
}

impl PollTracker {
    pub fn new(handle: CallHandle, config: PollConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            handle,
            config,
            state: PollState::Running,
            attempts: 0,
            last_status: None,
            started: Instant::now(),
        })
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_status(&self) -> Option<CallStatus> {
        self.last_status
    }

    /// Record the outcome of one status fetch and decide what happens next
    pub fn observe(&mut self, fetched: Result<CallStatus>) -> PollStep {
        if self.state.is_terminated() {
            return PollStep::Done(Err(Error::InvalidArgument(format!(
                "poll of call {} already ended in {:?}",
                self.handle, self.state
            ))));
        }

        self.attempts += 1;
        let budget_spent = self.attempts >= self.config.max_attempts;

        match fetched {
            Ok(status) if self.config.is_terminal(status) => {
                self.last_status = Some(status);
                self.transition(PollState::TerminatedSuccess);
                PollStep::Done(Ok(PollResult {
                    final_status: status,
                    attempts_used: self.attempts,
                    elapsed_ms: self.started.elapsed().as_millis() as u64,
                }))
            }
            Ok(status) => {
                self.last_status = Some(status);
                debug!(
                    "Call {} is {} (attempt {}/{})",
                    self.handle, status, self.attempts, self.config.max_attempts
                );
                if budget_spent {
                    self.transition(PollState::TerminatedTimeout);
                    PollStep::Done(Err(Error::PollTimeout {
                        last_status: status,
                        max_attempts: self.config.max_attempts,
                    }))
                } else {
                    PollStep::Retry
                }
            }
            Err(e) => {
                warn!(
                    "Status fetch for call {} failed (attempt {}/{}): {}",
                    self.handle, self.attempts, self.config.max_attempts, e
                );
                if budget_spent {
                    self.transition(PollState::TerminatedError);
                    PollStep::Done(Err(Error::PollExhausted {
                        handle: self.handle.to_string(),
                        attempts: self.attempts,
                        last_error: e.to_string(),
                    }))
                } else {
                    PollStep::Retry
                }
            }
        }
    }

    fn transition(&mut self, next: PollState) {
        debug!("Poll of call {}: {:?} -> {:?}", self.handle, self.state, next);
        self.state = next;
    }
}

/// Poll `source` until the call reaches one of `config.terminal_states`.
///
/// Performs at most `config.max_attempts` fetches and sleeps
/// `config.interval_ms` between them, never after the last one.
pub async fn poll<S>(source: &S, handle: &CallHandle, config: &PollConfig) -> Result<PollResult>
where
    S: CallStatusSource + ?Sized,
{
    let mut tracker = PollTracker::new(handle.clone(), config.clone())?;
    let interval = config.interval();

    loop {
        let fetched = source.fetch_status(handle).await;
        match tracker.observe(fetched) {
            PollStep::Retry => {
                if !interval.is_zero() {
                    tokio::time::sleep(interval).await;
                }
            }
            PollStep::Done(outcome) => {
                if let Ok(result) = &outcome {
                    info!(
                        "Call {} reached {} after {} attempt(s) in {} ms",
                        handle, result.final_status, result.attempts_used, result.elapsed_ms
                    );
                }
                return outcome;
            }
        }
    }
}
