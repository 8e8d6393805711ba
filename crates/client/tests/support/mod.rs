//! In-process mock of the call-management and Twilio APIs

#![allow(dead_code)]

use axum::http::{HeaderMap, StatusCode};
use axum::Router;
use std::time::Duration;

use callprobe_client::CallClient;

pub const TOKEN: &str = "test-token";

/// Serve `app` on an ephemeral local port and return its base URL
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock server");
    let addr = listener.local_addr().expect("Failed to get local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock server failed");
    });
    format!("http://{}", addr)
}

pub fn call_client(base_url: &str) -> CallClient {
    CallClient::new(base_url, TOKEN, Duration::from_secs(5)).expect("Failed to build client")
}

/// Reject requests without the expected `xima-token`
pub fn check_token(headers: &HeaderMap) -> Result<(), StatusCode> {
    match headers.get("xima-token").and_then(|v| v.to_str().ok()) {
        Some(TOKEN) => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}
