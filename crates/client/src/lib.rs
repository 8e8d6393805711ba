//! callprobe client library
//!
//! Clients for the call-management API and Twilio, a call-status poller and
//! the call verification workflow built from them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  run_call_verification_workflow(number, digits, poll_cfg)   │
//! │    ├── CallClient::create_call      POST /rest/calls/create │
//! │    ├── CallClient::send_digits      POST …/press-digits     │
//! │    └── poll(source, handle, cfg)                            │
//! │          └── CallStatusSource  (CallClient | TwilioClient)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  HttpClient::send                                           │
//! │    base URL + auth header + timeout + body normalization    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod calls;
pub mod http;
pub mod ledger;
pub mod poller;
pub mod twilio;
pub mod workflow;

pub use calls::{CallClient, CreateCallRequest};
pub use http::{AuthHeader, HttpClient, HttpRequest, ParsedResponse, RequestBody};
pub use ledger::{LedgerSummary, RunLedger, RunOutcome, RunRecord};
pub use poller::{poll, CallStatusSource, PollState};
pub use twilio::{CallerIdCheck, TwilioCall, TwilioClient};
pub use workflow::{run_call_verification_workflow, WorkflowResult, WorkflowTimings};
