//! HTTP request wrapper
//!
//! Every outbound call goes through [`HttpClient::send`], which appends the
//! request path onto the configured base URL, attaches the auth header,
//! enforces the request timeout and normalizes the response body into JSON.

use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::{Method, Url};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use callprobe_common::{Error, Result};

/// Header carrying the call-management API token
pub const AUTH_TOKEN_HEADER: &str = "xima-token";

/// Request timeout used when the caller does not pick one
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Credentials attached to every request
#[derive(Debug, Clone)]
pub enum AuthHeader {
    /// Static token sent in a named header
    Token { header: String, token: String },
    /// HTTP basic auth
    Basic { username: String, password: String },
}

impl AuthHeader {
    /// `xima-token: <token>`
    pub fn call_api(token: impl Into<String>) -> Self {
        AuthHeader::Token {
            header: AUTH_TOKEN_HEADER.to_string(),
            token: token.into(),
        }
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        AuthHeader::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    fn header_name(&self) -> Result<HeaderName> {
        match self {
            AuthHeader::Token { header, .. } => HeaderName::from_bytes(header.as_bytes())
                .map_err(|e| Error::InvalidArgument(format!("invalid auth header name: {}", e))),
            AuthHeader::Basic { .. } => Ok(AUTHORIZATION),
        }
    }

    fn to_header(&self) -> Result<(HeaderName, HeaderValue)> {
        let name = self.header_name()?;
        match self {
            AuthHeader::Token { token, .. } => {
                if token.trim().is_empty() {
                    return Err(Error::InvalidArgument("auth token must not be empty".to_string()));
                }
                let mut value = HeaderValue::from_str(token)
                    .map_err(|e| Error::InvalidArgument(format!("invalid auth token: {}", e)))?;
                value.set_sensitive(true);
                Ok((name, value))
            }
            AuthHeader::Basic { username, password } => {
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", username, password));
                let mut value = HeaderValue::from_str(&format!("Basic {}", encoded))
                    .map_err(|e| Error::InvalidArgument(format!("invalid basic credentials: {}", e)))?;
                value.set_sensitive(true);
                Ok((name, value))
            }
        }
    }
}

/// Request body
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// Flat key/value map, sent as multipart form data
    Form(BTreeMap<String, String>),
    /// Any JSON value
    Json(Value),
}

/// A request relative to the client's base URL
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Unencoded path segments, appended to the base URL's path
    pub path: Vec<String>,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    /// `endpoint` is a literal path such as `/rest/calls/create`; use
    /// [`segment`](Self::segment) for values that must be escaped.
    pub fn new(method: Method, endpoint: impl AsRef<str>) -> Self {
        Self {
            method,
            path: endpoint
                .as_ref()
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(endpoint: impl AsRef<str>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl AsRef<str>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    /// Append one path segment; `/`, `?`, `#` and `%` in it are percent-encoded
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.path.push(segment.into());
        self
    }

    /// Path as written, for logs and errors
    pub fn endpoint(&self) -> String {
        format!("/{}", self.path.join("/"))
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn form(mut self, fields: BTreeMap<String, String>) -> Self {
        self.body = Some(RequestBody::Form(fields));
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = Some(RequestBody::Json(value));
        self
    }
}

/// Successful response with its body normalized to JSON
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub status: u16,
    pub body: Value,
    /// Body was not JSON and was wrapped as `{"data": text, "status": code}`
    pub text_fallback: bool,
}

impl ParsedResponse {
    /// Plain-text payload: a JSON string, or the text of a wrapped non-JSON body
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            Value::String(s) => Some(s),
            Value::Object(map) if self.text_fallback => map.get("data").and_then(Value::as_str),
            _ => None,
        }
    }
}

/// Thin wrapper over `reqwest::Client` bound to one base URL and one set of credentials
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    base: Url,
    auth_header: HeaderName,
    default_headers: HeaderMap,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(base_url: &str, auth: AuthHeader, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::InvalidArgument("base URL must not be empty".to_string()));
        }
        if timeout.is_zero() {
            return Err(Error::InvalidArgument("request timeout must be positive".to_string()));
        }

        let base = Url::parse(&base_url)
            .map_err(|e| Error::InvalidArgument(format!("invalid base URL {:?}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidArgument(format!("base URL {:?} cannot carry a path", base_url)));
        }

        let (auth_header, value) = auth.to_header()?;
        let mut default_headers = HeaderMap::new();
        default_headers.insert(auth_header.clone(), value);

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            base,
            auth_header,
            default_headers,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Absolute URL for a request path, each segment percent-encoded
    pub fn url(&self, path: &[String]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidArgument(format!("base URL {:?} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(path);
        Ok(url)
    }

    /// Send a request and normalize the response.
    ///
    /// Fails with `RequestTimeout` when the timeout elapses, `HttpError` on a
    /// non-2xx status and `InvalidResponseFormat` when a JSON response does
    /// not parse.
    pub async fn send(&self, request: HttpRequest) -> Result<ParsedResponse> {
        let endpoint = request.endpoint();
        let HttpRequest { method, path, query, headers, body } = request;

        let mut merged = self.default_headers.clone();
        for (name, value) in headers.iter() {
            merged.insert(name.clone(), value.clone());
        }
        if !has_auth_header(&merged, &self.auth_header) {
            return Err(Error::InvalidArgument(format!(
                "request to {} carries no auth header",
                endpoint
            )));
        }

        let url = self.url(&path)?;
        debug!("{} {}", method, url);

        let mut builder = self.client.request(method, url).headers(merged);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        builder = match body {
            Some(RequestBody::Form(fields)) => {
                let form = fields
                    .into_iter()
                    .fold(Form::new(), |form, (key, value)| form.text(key, value));
                builder.multipart(form)
            }
            Some(RequestBody::Json(value)) => builder.json(&value),
            None => builder,
        };

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_transport_error(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            debug!("{} returned {}", endpoint, status);
            return Err(Error::HttpError {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let text = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(&endpoint, e))?;

        parse_body(content_type.as_deref(), status.as_u16(), &text)
    }

    fn map_transport_error(&self, endpoint: &str, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::RequestTimeout {
                endpoint: endpoint.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            Error::Transport(e)
        }
    }
}

fn has_auth_header(headers: &HeaderMap, name: &HeaderName) -> bool {
    headers.get(name).map(|value| !value.is_empty()).unwrap_or(false)
}

fn is_json_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || mime.ends_with("+json")
}

/// Normalize a response body.
///
/// JSON content types must parse. Any other body is parsed best-effort: an
/// object or array is returned as-is, everything else (including bare JSON
/// scalars such as a phone number) becomes `{"data": text, "status": code}`
/// with `text_fallback` set.
pub fn parse_body(content_type: Option<&str>, status: u16, text: &str) -> Result<ParsedResponse> {
    let parsed = |body, text_fallback| ParsedResponse { status, body, text_fallback };

    if content_type.map(is_json_content_type).unwrap_or(false) {
        if text.trim().is_empty() {
            return Ok(parsed(Value::Null, false));
        }
        return serde_json::from_str(text)
            .map(|body| parsed(body, false))
            .map_err(|e| Error::InvalidResponseFormat(format!("malformed JSON body: {}", e)));
    }

    match serde_json::from_str::<Value>(text) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Ok(parsed(value, false)),
        _ => Ok(parsed(json!({ "data": text, "status": status }), true)),
    }
}
