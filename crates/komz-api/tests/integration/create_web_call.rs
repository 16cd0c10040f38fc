//! Integration tests for the voice-call proxy endpoint.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use komz_client::mock::{MockChatProvider, MockVoiceProvider};
use serde_json::json;

use crate::common::{TestHarness, body_json, post_json, sample_call};

#[tokio::test]
async fn test_relays_upstream_response_verbatim() {
    let harness = TestHarness::new();

    let response = harness
        .send(post_json("/create-web-call", json!({"agent_id": "agent_custom"})))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, sample_call());
    assert_eq!(harness.voice.agents(), vec!["agent_custom".to_string()]);
}

#[tokio::test]
async fn test_empty_object_uses_default_agent() {
    let harness = TestHarness::new();

    let response = harness.send(post_json("/create-web-call", json!({}))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(harness.voice.agents(), vec!["agent_default".to_string()]);
}

#[tokio::test]
async fn test_missing_body_uses_default_agent() {
    // The browser widget posts a JSON content type with no body at all.
    let harness = TestHarness::new();
    let request = Request::builder()
        .method("POST")
        .uri("/create-web-call")
        .header("content-type", "application/json")
        .body(Body::empty())
        .unwrap();

    let response = harness.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(harness.voice.agents(), vec!["agent_default".to_string()]);
}

#[tokio::test]
async fn test_no_agent_available_is_400() {
    let harness = TestHarness::build(
        MockVoiceProvider::with_response(sample_call()),
        MockChatProvider::with_response("unused"),
        None,
        5,
    );

    let response = harness.send(post_json("/create-web-call", json!({}))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Agent ID is required"})
    );
    assert!(harness.voice.agents().is_empty());
}

#[tokio::test]
async fn test_blank_agent_falls_back_to_default() {
    let harness = TestHarness::new();

    let response = harness
        .send(post_json("/create-web-call", json!({"agent_id": ""})))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(harness.voice.agents(), vec!["agent_default".to_string()]);
}

#[tokio::test]
async fn test_upstream_failure_is_500_with_message() {
    let harness = TestHarness::build(
        MockVoiceProvider::failing("Invalid API key"),
        MockChatProvider::with_response("unused"),
        Some("agent_default".to_string()),
        5,
    );

    let response = harness.send(post_json("/create-web-call", json!({}))).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("Invalid API key"), "got: {message}");
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let harness = TestHarness::new();
    let request = Request::builder()
        .method("POST")
        .uri("/create-web-call")
        .header("content-type", "application/json")
        .body(Body::from("{\"agent_id\":"))
        .unwrap();

    let response = harness.send(request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(harness.voice.agents().is_empty());
}

#[tokio::test]
async fn test_not_rate_limited() {
    let harness = TestHarness::new();
    for _ in 0..10 {
        let response = harness.send(post_json("/create-web-call", json!({}))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
