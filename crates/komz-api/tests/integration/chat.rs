//! Integration tests for the rate-limited chat endpoint.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use komz_client::mock::{MockChatProvider, MockVoiceProvider};
use komz_core::Message;
use komz_core::chat::EMPTY_REPLY_FALLBACK;
use serde_json::json;

use crate::common::{TestHarness, body_json, post_json_as, sample_call};

fn chat_body(prompt: &str) -> serde_json::Value {
    json!({
        "history": [Message::welcome()],
        "prompt": prompt,
    })
}

fn harness_with(chat: MockChatProvider) -> TestHarness {
    TestHarness::build(
        MockVoiceProvider::with_response(sample_call()),
        chat,
        None,
        5,
    )
}

#[tokio::test]
async fn test_chat_returns_model_message() {
    let harness = TestHarness::new();

    let response = harness
        .send(post_json_as("/chat", "visitor", chat_body("Do you build chatbots?")))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-limit"], "5");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "4");

    let body = body_json(response).await;
    assert_eq!(body["message"]["role"], "model");
    assert_eq!(
        body["message"]["content"],
        "We'd love to help. What are you building?"
    );

    let calls = harness.chat.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].history_len, 1);
    assert_eq!(calls[0].prompt, "Do you build chatbots?");
}

#[tokio::test]
async fn test_prompt_is_sanitized_before_upstream() {
    let harness = TestHarness::new();

    let response = harness
        .send(post_json_as(
            "/chat",
            "visitor",
            chat_body("  <script>x</script>Pricing?  "),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(harness.chat.calls()[0].prompt, "xPricing?");
}

#[tokio::test]
async fn test_sixth_message_is_rejected() {
    let harness = TestHarness::new();

    for i in 0..5 {
        let response = harness
            .send(post_json_as("/chat", "visitor", chat_body("hello")))
            .await;
        assert_eq!(response.status(), StatusCode::OK, "message {i}");
    }

    let response = harness
        .send(post_json_as("/chat", "visitor", chat_body("hello")))
        .await;

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        "You've reached the message limit for this demo. Please try again in an hour."
    );
    assert!(body["retry_after_secs"].as_u64().unwrap() > 0);
    assert_eq!(harness.chat.call_count(), 5);
}

#[tokio::test]
async fn test_limit_is_per_client() {
    let harness = TestHarness::new();
    for _ in 0..5 {
        harness
            .send(post_json_as("/chat", "first", chat_body("hello")))
            .await;
    }

    let response = harness
        .send(post_json_as("/chat", "second", chat_body("hello")))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_upstream_failure_does_not_use_quota() {
    let harness = harness_with(MockChatProvider::failing("model overloaded"));

    let response = harness
        .send(post_json_as("/chat", "visitor", chat_body("hello")))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "5");
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("model overloaded"));
    assert_eq!(harness.limiter.remaining("id:visitor").unwrap(), 5);
}

#[tokio::test]
async fn test_empty_prompt_is_400_and_free() {
    let harness = TestHarness::new();

    let response = harness
        .send(post_json_as("/chat", "visitor", chat_body("  <br>  ")))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(harness.chat.call_count(), 0);
    assert_eq!(harness.limiter.remaining("id:visitor").unwrap(), 5);
}

#[tokio::test]
async fn test_empty_model_reply_gets_fallback_text() {
    let harness = harness_with(MockChatProvider::empty());

    let response = harness
        .send(post_json_as("/chat", "visitor", chat_body("hello")))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"]["content"], EMPTY_REPLY_FALLBACK);
}

#[tokio::test]
async fn test_missing_prompt_field_is_400() {
    let harness = TestHarness::new();

    let response = harness
        .send(post_json_as("/chat", "visitor", json!({"history": []})))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_quota_reflects_usage() {
    let harness = TestHarness::new();

    let before = harness
        .send(
            Request::builder()
                .uri("/chat/quota")
                .header("x-client-id", "visitor")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    let before = body_json(before).await;
    assert_eq!(before, json!({"limit": 5, "remaining": 5}));

    harness
        .send(post_json_as("/chat", "visitor", chat_body("hello")))
        .await;

    let after = harness
        .send(
            Request::builder()
                .uri("/chat/quota")
                .header("x-client-id", "visitor")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    let after = body_json(after).await;
    assert_eq!(after["remaining"], 4);
    assert!(after["resets_at"].is_string());
}
