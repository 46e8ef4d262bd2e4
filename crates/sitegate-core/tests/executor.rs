//! Integration tests for StepExecutor.
//!
//! Uses wiremock for HTTP mocking. Tests cover success, non-2xx status,
//! client-side timeout, network failure and body truncation.

use std::time::Duration;

use reqwest::Method;
use sitegate_core::executor::USER_AGENT_VALUE;
use sitegate_core::{StepExecutor, StepFailure};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn executor() -> StepExecutor {
    StepExecutor::new(200).expect("failed to create executor")
}

#[tokio::test]
async fn test_execute_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/projects/acme/seed-spec"))
        .and(header("user-agent", USER_AGENT_VALUE))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{\"ok\":true}")
                .insert_header("content-type", "application/json"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/api/projects/acme/seed-spec", mock_server.uri());
    let outcome = executor()
        .execute(Method::POST, &url, Duration::from_secs(5))
        .await;

    assert!(outcome.is_success());
    assert_eq!(outcome.status, Some(200));
    assert_eq!(outcome.content_type.as_deref(), Some("application/json"));
    assert_eq!(outcome.body, "{\"ok\":true}");
    assert!(outcome.error_text(200).is_none());
}

#[tokio::test]
async fn test_execute_server_error_keeps_status_and_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/projects/acme/publish"))
        .respond_with(ResponseTemplate::new(500).set_body_string("{\"error\":\"db down\"}"))
        .mount(&mock_server)
        .await;

    let url = format!("{}/api/projects/acme/publish", mock_server.uri());
    let outcome = executor()
        .execute(Method::POST, &url, Duration::from_secs(5))
        .await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.status, Some(500));
    assert_eq!(outcome.failure, Some(StepFailure::HttpStatus { status: 500 }));
    assert_eq!(
        outcome.error_text(200).as_deref(),
        Some("HTTP 500: {\"error\":\"db down\"}")
    );
}

#[tokio::test]
async fn test_execute_timeout_has_no_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let url = format!("{}/slow", mock_server.uri());
    let outcome = executor()
        .execute(Method::POST, &url, Duration::from_millis(200))
        .await;

    assert!(!outcome.is_success());
    assert!(outcome.status.is_none(), "timeout must not carry a status");
    assert_eq!(outcome.failure, Some(StepFailure::Timeout { after_ms: 200 }));
    assert!(outcome.elapsed_ms < 3000);
}

#[tokio::test]
async fn test_execute_network_failure() {
    // Nothing listens on port 1.
    let outcome = executor()
        .execute(Method::POST, "http://127.0.0.1:1/x", Duration::from_secs(5))
        .await;

    assert!(!outcome.is_success());
    assert!(outcome.status.is_none());
    assert!(matches!(outcome.failure, Some(StepFailure::Network { .. })));
}

#[tokio::test]
async fn test_response_prefix_truncated_but_body_kept() {
    let mock_server = MockServer::start().await;
    let body = "x".repeat(1000);

    Mock::given(method("POST"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(201).set_body_string(body.clone()))
        .mount(&mock_server)
        .await;

    let url = format!("{}/big", mock_server.uri());
    let outcome = executor()
        .execute(Method::POST, &url, Duration::from_secs(5))
        .await;

    assert!(outcome.is_success());
    assert_eq!(outcome.body.len(), 1000);
    let response = outcome.to_response(200);
    assert_eq!(response.body_prefix.len(), 200);
    assert_eq!(response.url, url);
}
