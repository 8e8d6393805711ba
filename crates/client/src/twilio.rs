//! Twilio call lookup
//!
//! Reads call records from the Twilio REST API to observe call status and
//! verify the caller id an IVR presented.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use callprobe_common::{CallHandle, CallStatus, Error, Result, TwilioConfig};

use crate::http::{AuthHeader, HttpClient, HttpRequest};
use crate::poller::CallStatusSource;

/// Call resource as returned by `GET /2010-04-01/Accounts/{sid}/Calls/{sid}.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwilioCall {
    pub sid: String,
    pub status: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    /// Seconds, as a string; null until the call ends
    #[serde(default)]
    pub duration: Option<String>,
}

impl TwilioCall {
    pub fn call_status(&self) -> Result<CallStatus> {
        map_twilio_status(&self.status)
    }

    pub fn duration_secs(&self) -> Option<u64> {
        self.duration.as_deref().and_then(|d| d.trim().parse().ok())
    }
}

/// Map a Twilio call status onto callprobe's status set
pub fn map_twilio_status(status: &str) -> Result<CallStatus> {
    match status.trim().to_ascii_lowercase().as_str() {
        "queued" | "initiated" => Ok(CallStatus::Pending),
        "ringing" => Ok(CallStatus::Ringing),
        "in-progress" => Ok(CallStatus::Connected),
        "completed" => Ok(CallStatus::Completed),
        "busy" | "failed" | "no-answer" => Ok(CallStatus::Failed),
        "canceled" => Ok(CallStatus::Canceled),
        other => Err(Error::InvalidResponseFormat(format!("unknown Twilio call status: {}", other))),
    }
}

/// Result of comparing a call's caller id with the expected number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdCheck {
    pub expected: String,
    pub observed: Option<String>,
    pub matches: bool,
}

/// Digits of a phone number without a leading North American country code
pub fn normalize_number(number: &str) -> String {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    match digits.strip_prefix('1') {
        Some(rest) if digits.len() == 11 => rest.to_string(),
        _ => digits,
    }
}

/// Client for the Twilio Calls resource
#[derive(Debug, Clone)]
pub struct TwilioClient {
    http: HttpClient,
    account_sid: String,
}

impl TwilioClient {
    pub fn new(config: &TwilioConfig, timeout: Duration) -> Result<Self> {
        if config.account_sid.trim().is_empty() {
            return Err(Error::Config("Twilio account SID is empty".to_string()));
        }
        let auth = AuthHeader::basic(&config.account_sid, &config.auth_token);
        let http = HttpClient::new(&config.base_url, auth, timeout)?;
        Ok(Self {
            http,
            account_sid: config.account_sid.clone(),
        })
    }

    /// Fetch a call record by SID
    pub async fn fetch_call(&self, call_sid: &str) -> Result<TwilioCall> {
        if call_sid.trim().is_empty() {
            return Err(Error::InvalidArgument("call SID must not be empty".to_string()));
        }

        let request = HttpRequest::get("/2010-04-01/Accounts")
            .segment(self.account_sid.as_str())
            .segment("Calls")
            .segment(format!("{}.json", call_sid.trim()));
        let response = self.http.send(request).await?;
        let call: TwilioCall = serde_json::from_value(response.body)
            .map_err(|e| Error::InvalidResponseFormat(format!("unexpected Twilio call payload: {}", e)))?;

        debug!("Twilio call {} is {}", call.sid, call.status);
        Ok(call)
    }

    /// Check the caller id Twilio recorded for a call
    pub async fn verify_caller_id(&self, call_sid: &str, expected: &str) -> Result<CallerIdCheck> {
        let expected_digits = normalize_number(expected);
        if expected_digits.is_empty() {
            return Err(Error::InvalidArgument(format!("{:?} is not a phone number", expected)));
        }

        let call = self.fetch_call(call_sid).await?;
        let matches = call
            .from
            .as_deref()
            .map(|from| normalize_number(from) == expected_digits)
            .unwrap_or(false);

        Ok(CallerIdCheck {
            expected: expected.to_string(),
            observed: call.from,
            matches,
        })
    }
}

#[async_trait]
impl CallStatusSource for TwilioClient {
    async fn fetch_status(&self, handle: &CallHandle) -> Result<CallStatus> {
        self.fetch_call(handle.as_str()).await?.call_status()
    }
}
