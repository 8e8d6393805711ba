//! Call-management client and HTTP wrapper against a mock API

mod support;

use axum::extract::{Multipart, Path, Query};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use callprobe_client::{AuthHeader, CallClient, CreateCallRequest, HttpClient, HttpRequest};
use callprobe_common::{CallHandle, CallStatus, Error};

use support::{call_client, check_token, serve, TOKEN};

type Fields = Arc<Mutex<Vec<(String, String)>>>;

fn create_route(response: Value, fields: Fields) -> Router {
    Router::new().route(
        "/rest/calls/create",
        post(move |headers: HeaderMap, mut multipart: Multipart| {
            let response = response.clone();
            let fields = fields.clone();
            async move {
                check_token(&headers)?;
                while let Some(field) = multipart.next_field().await.unwrap() {
                    let name = field.name().unwrap_or_default().to_string();
                    let value = field.text().await.unwrap();
                    fields.lock().push((name, value));
                }
                Ok::<_, StatusCode>(Json(response))
            }
        }),
    )
}

fn handle(id: &str) -> CallHandle {
    CallHandle::new(id).unwrap()
}

#[tokio::test]
async fn test_create_call_returns_first_id() {
    let fields: Fields = Default::default();
    let base = serve(create_route(json!({ "callIds": ["abc123"] }), fields.clone())).await;

    let handle = call_client(&base).create_call("4352005133").await.unwrap();
    assert_eq!(handle.as_str(), "abc123");

    let fields: HashMap<_, _> = fields.lock().iter().cloned().collect();
    assert_eq!(fields["number"], "4352005133");
    assert_eq!(fields["count"], "1");
    assert_eq!(fields["wait-on"], "CONNECTED");
    assert_eq!(fields["timeout"], "120");
}

#[tokio::test]
async fn test_create_calls_returns_every_id() {
    let fields: Fields = Default::default();
    let base = serve(create_route(json!({ "callIds": ["a1", "a2", "a3"] }), fields.clone())).await;

    let request = CreateCallRequest::new("4352005133")
        .count(3)
        .wait_on(CallStatus::Ringing)
        .timeout_secs(30);
    let handles = call_client(&base).create_calls(&request).await.unwrap();
    assert_eq!(handles, vec![handle("a1"), handle("a2"), handle("a3")]);

    let fields: HashMap<_, _> = fields.lock().iter().cloned().collect();
    assert_eq!(fields["count"], "3");
    assert_eq!(fields["wait-on"], "RINGING");
}

#[tokio::test]
async fn test_create_call_without_ids_fails() {
    for response in [json!({ "callIds": [] }), json!({ "error": "no trunks" })] {
        let base = serve(create_route(response, Default::default())).await;
        let err = call_client(&base).create_call("4352005133").await.unwrap_err();
        assert!(matches!(err, Error::CallCreationError(_)), "got {:?}", err);
    }
}

#[tokio::test]
async fn test_create_call_rejects_bad_input_without_request() {
    let fields: Fields = Default::default();
    let base = serve(create_route(json!({ "callIds": ["abc123"] }), fields.clone())).await;

    let err = call_client(&base).create_call("  ").await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(fields.lock().is_empty());
}

#[tokio::test]
async fn test_wrong_token_is_http_error() {
    let base = serve(create_route(json!({ "callIds": ["abc123"] }), Default::default())).await;
    let client = CallClient::new(&base, "not-the-token", Duration::from_secs(5)).unwrap();

    match client.create_call("4352005133").await.unwrap_err() {
        Error::HttpError { status, status_text } => {
            assert_eq!(status, 401);
            assert_eq!(status_text, "Unauthorized");
        }
        other => panic!("expected HttpError, got {:?}", other),
    }
}

fn digits_route(status: StatusCode, seen: Arc<Mutex<Vec<(String, String)>>>) -> Router {
    Router::new().route(
        "/rest/calls/:id/press-digits",
        post(
            move |headers: HeaderMap, Path(id): Path<String>, Query(query): Query<HashMap<String, String>>| {
                let seen = seen.clone();
                async move {
                    check_token(&headers)?;
                    seen.lock().push((id, query.get("digits").cloned().unwrap_or_default()));
                    Ok::<_, StatusCode>(status)
                }
            },
        ),
    )
}

#[tokio::test]
async fn test_send_digits() {
    let seen: Arc<Mutex<Vec<(String, String)>>> = Default::default();
    let base = serve(digits_route(StatusCode::OK, seen.clone())).await;
    let client = call_client(&base);

    client.send_digits(&handle("abc123"), "0").await.unwrap();
    client.send_digits(&handle("abc123"), "1#").await.unwrap();

    let seen = seen.lock();
    assert_eq!(seen[0], ("abc123".to_string(), "0".to_string()));
    assert_eq!(seen[1], ("abc123".to_string(), "1#".to_string()));
}

#[tokio::test]
async fn test_send_digits_requires_200() {
    for status in [StatusCode::NO_CONTENT, StatusCode::INTERNAL_SERVER_ERROR] {
        let base = serve(digits_route(status, Default::default())).await;
        let err = call_client(&base).send_digits(&handle("abc123"), "5").await.unwrap_err();
        match err {
            Error::DigitInputError { handle, status: got } => {
                assert_eq!(handle, "abc123");
                assert_eq!(got, status.as_u16());
            }
            other => panic!("expected DigitInputError, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_send_digits_rejects_empty_digits() {
    let seen: Arc<Mutex<Vec<(String, String)>>> = Default::default();
    let base = serve(digits_route(StatusCode::OK, seen.clone())).await;

    let err = call_client(&base).send_digits(&handle("abc123"), "").await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(seen.lock().is_empty());
}

fn drop_route(status: StatusCode) -> Router {
    drop_route_recording(status, Default::default())
}

fn drop_route_recording(status: StatusCode, dropped: Arc<Mutex<Vec<String>>>) -> Router {
    Router::new().route(
        "/rest/calls/:id/drop",
        post(move |headers: HeaderMap, Path(id): Path<String>| {
            let dropped = dropped.clone();
            async move {
                check_token(&headers)?;
                dropped.lock().push(id);
                Ok::<_, StatusCode>(status)
            }
        }),
    )
}

#[tokio::test]
async fn test_drop_call() {
    let base = serve(drop_route(StatusCode::ACCEPTED)).await;
    call_client(&base).drop_call(&handle("abc123")).await.unwrap();
}

#[tokio::test]
async fn test_drop_call_requires_202() {
    for status in [StatusCode::OK, StatusCode::NOT_FOUND] {
        let base = serve(drop_route(status)).await;
        let err = call_client(&base).drop_call(&handle("abc123")).await.unwrap_err();
        assert!(
            matches!(err, Error::CallDropError { status: got, .. } if got == status.as_u16()),
            "got {:?}",
            err
        );
    }
}

#[tokio::test]
async fn test_handles_with_reserved_characters_stay_in_one_segment() {
    let dropped: Arc<Mutex<Vec<String>>> = Default::default();
    let base = serve(drop_route_recording(StatusCode::ACCEPTED, dropped.clone())).await;
    let client = call_client(&base);

    for id in ["abc#x", "abc?x=1", "abc/x", "50%"] {
        client.drop_call(&handle(id)).await.unwrap();
    }
    assert_eq!(*dropped.lock(), vec!["abc#x", "abc?x=1", "abc/x", "50%"]);
}

#[tokio::test]
async fn test_send_digits_escapes_handle() {
    let seen: Arc<Mutex<Vec<(String, String)>>> = Default::default();
    let base = serve(digits_route(StatusCode::OK, seen.clone())).await;

    call_client(&base).send_digits(&handle("abc#x"), "9#").await.unwrap();
    assert_eq!(seen.lock()[0], ("abc#x".to_string(), "9#".to_string()));
}

fn text_route(path: &str, content_type: &'static str, body: String) -> Router {
    Router::new().route(
        path,
        get(move |headers: HeaderMap| {
            let body = body.clone();
            async move {
                check_token(&headers)?;
                Ok::<_, StatusCode>(([(header::CONTENT_TYPE, content_type)], body))
            }
        }),
    )
}

#[tokio::test]
async fn test_outbound_number_is_plain_string() {
    let base = serve(text_route(
        "/rest/calls/inbound-number",
        "text/plain; charset=utf-8",
        "4352005133\n".to_string(),
    ))
    .await;
    let client = call_client(&base);

    let first = client.get_outbound_number().await.unwrap();
    let second = client.get_outbound_number().await.unwrap();
    assert_eq!(first, "4352005133");
    assert!(second.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn test_outbound_number_json_string() {
    let base = serve(text_route(
        "/rest/calls/inbound-number",
        "application/json",
        "\"+14352005133\"".to_string(),
    ))
    .await;
    assert_eq!(call_client(&base).get_outbound_number().await.unwrap(), "+14352005133");
}

#[tokio::test]
async fn test_outbound_number_rejects_structured_payload() {
    let base = serve(text_route(
        "/rest/calls/inbound-number",
        "application/json",
        r#"{"number":"4352005133"}"#.to_string(),
    ))
    .await;
    let err = call_client(&base).get_outbound_number().await.unwrap_err();
    assert!(matches!(err, Error::InvalidResponseFormat(_)));
}

#[tokio::test]
async fn test_outbound_number_rejects_json_object_with_data() {
    let base = serve(text_route(
        "/rest/calls/inbound-number",
        "application/json",
        r#"{"data":"not-a-number"}"#.to_string(),
    ))
    .await;
    let err = call_client(&base).get_outbound_number().await.unwrap_err();
    assert!(matches!(err, Error::InvalidResponseFormat(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_custom_auth_header_is_sent() {
    let app = Router::new().route(
        "/ping",
        get(|headers: HeaderMap| async move {
            match headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
                Some("key-1") => Ok("pong"),
                _ => Err(StatusCode::UNAUTHORIZED),
            }
        }),
    );
    let base = serve(app).await;

    let auth = AuthHeader::Token {
        header: "x-api-key".to_string(),
        token: "key-1".to_string(),
    };
    let http = HttpClient::new(&base, auth, Duration::from_secs(5)).unwrap();
    let response = http.send(HttpRequest::get("/ping")).await.unwrap();
    assert_eq!(response.text(), Some("pong"));
    assert!(response.text_fallback);
}

#[tokio::test]
async fn test_call_status_endpoint() {
    let base = serve(text_route(
        "/rest/calls/abc123/status",
        "application/json",
        r#"{"status":"RINGING"}"#.to_string(),
    ))
    .await;
    let status = call_client(&base).get_call_status(&handle("abc123")).await.unwrap();
    assert_eq!(status, CallStatus::Ringing);

    let base = serve(text_route("/rest/calls/abc123/status", "text/plain", "completed".to_string())).await;
    let status = call_client(&base).get_call_status(&handle("abc123")).await.unwrap();
    assert_eq!(status, CallStatus::Completed);
}

#[tokio::test]
async fn test_text_plain_json_body_is_parsed() {
    let original = json!({
        "callIds": ["abc123", "def456"],
        "meta": { "queue": "support", "agents": 3 }
    });
    let base = serve(text_route("/echo", "text/plain", serde_json::to_string(&original).unwrap())).await;

    let http = HttpClient::new(&base, AuthHeader::call_api(TOKEN), Duration::from_secs(5)).unwrap();
    let response = http.send(HttpRequest::get("/echo")).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, original);
}

#[tokio::test]
async fn test_json_body_is_sent() {
    let app = Router::new().route(
        "/rest/echo",
        post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            check_token(&headers)?;
            Ok::<_, StatusCode>(Json(json!({ "received": body })))
        }),
    );
    let base = serve(app).await;

    let http = HttpClient::new(&base, AuthHeader::call_api(TOKEN), Duration::from_secs(5)).unwrap();
    let response = http
        .send(HttpRequest::post("/rest/echo").json(json!({ "digits": "0" })))
        .await
        .unwrap();
    assert_eq!(response.body, json!({ "received": { "digits": "0" } }));
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let app = Router::new().route(
        "/rest/calls/inbound-number",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            "4352005133"
        }),
    );
    let base = serve(app).await;
    let client = CallClient::new(&base, TOKEN, Duration::from_millis(200)).unwrap();

    match client.get_outbound_number().await.unwrap_err() {
        Error::RequestTimeout { endpoint, timeout_ms } => {
            assert_eq!(endpoint, "/rest/calls/inbound-number");
            assert_eq!(timeout_ms, 200);
        }
        other => panic!("expected RequestTimeout, got {:?}", other),
    }
}
