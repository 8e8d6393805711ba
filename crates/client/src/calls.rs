//! Call-management API client
//!
//! Creates test calls, routes them with DTMF digits, drops them and looks up
//! the number calls are placed from.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

use callprobe_common::{CallHandle, CallStatus, ClientConfig, Error, Result};

use crate::http::{AuthHeader, HttpClient, HttpRequest, ParsedResponse};
use crate::poller::CallStatusSource;

/// Characters accepted by the press-digits endpoint: DTMF tones plus pauses
const DTMF_ALPHABET: &str = "0123456789*#ABCDabcdwW,";

/// Parameters for `POST /rest/calls/create`
#[derive(Debug, Clone)]
pub struct CreateCallRequest {
    /// Number to dial
    pub number: String,
    /// How many calls to place
    pub count: u32,
    /// Status the API waits for before answering
    pub wait_on: CallStatus,
    /// Seconds the API waits for `wait_on`
    pub timeout_secs: u64,
}

impl CreateCallRequest {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            count: 1,
            wait_on: CallStatus::Connected,
            timeout_secs: 120,
        }
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn wait_on(mut self, status: CallStatus) -> Self {
        self.wait_on = status;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.number.trim().is_empty() {
            return Err(Error::InvalidArgument("number must not be empty".to_string()));
        }
        if self.count == 0 {
            return Err(Error::InvalidArgument("count must be at least 1".to_string()));
        }
        Ok(())
    }

    fn form(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("number".to_string(), self.number.trim().to_string()),
            ("count".to_string(), self.count.to_string()),
            ("wait-on".to_string(), self.wait_on.to_string()),
            ("timeout".to_string(), self.timeout_secs.to_string()),
        ])
    }
}

/// Reject empty digit strings and characters outside the DTMF alphabet
pub fn validate_digits(digits: &str) -> Result<()> {
    if digits.is_empty() {
        return Err(Error::InvalidArgument("digits must not be empty".to_string()));
    }
    if let Some(bad) = digits.chars().find(|c| !DTMF_ALPHABET.contains(*c)) {
        return Err(Error::InvalidArgument(format!("'{}' is not a DTMF digit", bad)));
    }
    Ok(())
}

/// Client for the call-management REST API
#[derive(Debug, Clone)]
pub struct CallClient {
    http: HttpClient,
}

impl CallClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let http = HttpClient::new(base_url, AuthHeader::call_api(token), timeout)?;
        Ok(Self { http })
    }

    /// Build a client from validated configuration
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        Self::new(&config.call_api.base_url, config.token()?, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Place one call to `number` with default options and return its handle
    pub async fn create_call(&self, number: &str) -> Result<CallHandle> {
        self.create_call_with(&CreateCallRequest::new(number)).await
    }

    /// Place calls and return the handle of the first one
    pub async fn create_call_with(&self, request: &CreateCallRequest) -> Result<CallHandle> {
        let mut handles = self.create_calls(request).await?;
        // create_calls never returns an empty list
        Ok(handles.swap_remove(0))
    }

    /// Place `request.count` calls and return every handle
    pub async fn create_calls(&self, request: &CreateCallRequest) -> Result<Vec<CallHandle>> {
        request.validate()?;

        let response = self
            .http
            .send(HttpRequest::post("/rest/calls/create").form(request.form()))
            .await?;

        let handles = extract_call_ids(&response.body)?;
        info!("Created {} call(s) to {}: {:?}", handles.len(), request.number, handles);
        Ok(handles)
    }

    /// Press DTMF digits on an active call
    pub async fn send_digits(&self, handle: &CallHandle, digits: &str) -> Result<()> {
        validate_digits(digits)?;

        let request = HttpRequest::post("/rest/calls")
            .segment(handle.as_str())
            .segment("press-digits")
            .query("digits", digits);
        let response = self.http.send(request).await.map_err(|e| match e {
            Error::HttpError { status, .. } => Error::DigitInputError {
                handle: handle.to_string(),
                status,
            },
            other => other,
        })?;

        if response.status != 200 {
            return Err(Error::DigitInputError {
                handle: handle.to_string(),
                status: response.status,
            });
        }
        debug!("Sent digits {:?} to call {}", digits, handle);
        Ok(())
    }

    /// Hang up a call
    pub async fn drop_call(&self, handle: &CallHandle) -> Result<()> {
        let request = HttpRequest::post("/rest/calls").segment(handle.as_str()).segment("drop");
        let response = self.http.send(request).await.map_err(|e| match e {
            Error::HttpError { status, .. } => Error::CallDropError {
                handle: handle.to_string(),
                status,
            },
            other => other,
        })?;

        if response.status != 202 {
            return Err(Error::CallDropError {
                handle: handle.to_string(),
                status: response.status,
            });
        }
        info!("Dropped call {}", handle);
        Ok(())
    }

    /// Number the call generator dials out from
    pub async fn get_outbound_number(&self) -> Result<String> {
        let response = self.http.send(HttpRequest::get("/rest/calls/inbound-number")).await?;
        plain_string(&response)
    }

    /// Current status of a call, from `GET /rest/calls/{id}/status`
    pub async fn get_call_status(&self, handle: &CallHandle) -> Result<CallStatus> {
        let response = self
            .http
            .send(HttpRequest::get("/rest/calls").segment(handle.as_str()).segment("status"))
            .await?;

        match response.body.get("status").and_then(Value::as_str) {
            Some(status) => status.parse(),
            None => match response.text() {
                Some(text) => text.parse(),
                None => Err(Error::InvalidResponseFormat(format!(
                    "no status in response for call {}",
                    handle
                ))),
            },
        }
    }
}

#[async_trait]
impl CallStatusSource for CallClient {
    async fn fetch_status(&self, handle: &CallHandle) -> Result<CallStatus> {
        self.get_call_status(handle).await
    }
}

fn extract_call_ids(body: &Value) -> Result<Vec<CallHandle>> {
    let ids = body
        .get("callIds")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::CallCreationError("response has no callIds".to_string()))?;

    if ids.is_empty() {
        return Err(Error::CallCreationError("response returned no call ids".to_string()));
    }

    ids.iter()
        .map(|id| {
            let id = match id {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                other => {
                    return Err(Error::CallCreationError(format!("unexpected call id {}", other)));
                }
            };
            CallHandle::new(id).map_err(|_| Error::CallCreationError("response contained an empty call id".to_string()))
        })
        .collect()
}

fn plain_string(response: &ParsedResponse) -> Result<String> {
    let text = response.text().ok_or_else(|| {
        Error::InvalidResponseFormat(format!("expected a plain string, got {}", response.body))
    })?;

    let text = text.trim();
    if text.is_empty() {
        return Err(Error::InvalidResponseFormat("empty response body".to_string()));
    }
    Ok(text.to_string())
}
