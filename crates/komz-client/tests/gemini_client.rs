//! Gemini client against a local mock server.

#![allow(clippy::unwrap_used)]

use komz_client::{ChatProvider, Error, GeminiClient};
use komz_core::Message;
use komz_core::config::GeminiConfig;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/v1beta/models/gemini-test:generateContent";

fn client_for(server: &MockServer) -> GeminiClient {
    let config = GeminiConfig {
        base_url: server.uri(),
        api_key: Some("gm_key".to_string()),
        model: "gemini-test".to_string(),
        ..GeminiConfig::default()
    };
    GeminiClient::new(&config).unwrap()
}

fn reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test]
async fn test_generate_sends_history_and_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header("x-goog-api-key", "gm_key"))
        .and(body_partial_json(json!({
            "contents": [
                {"role": "model", "parts": [{"text": "Welcome!"}]},
                {"role": "user", "parts": [{"text": "Do you do cloud migration?"}]}
            ],
            "generationConfig": {"topK": 40}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply(
            "Yes, we plan and run cloud migrations. What platform are you on today?",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let history = vec![Message::model("Welcome!")];
    let text = client_for(&server)
        .generate(&history, "Do you do cloud migration?")
        .await
        .unwrap();

    assert_eq!(
        text.as_deref(),
        Some("Yes, we plan and run cloud migrations. What platform are you on today?")
    );
}

#[tokio::test]
async fn test_generate_without_candidates_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"promptFeedback": {"blockReason": "SAFETY"}})),
        )
        .mount(&server)
        .await;

    let text = client_for(&server).generate(&[], "hi").await.unwrap();
    assert!(text.is_none());
}

#[tokio::test]
async fn test_generate_maps_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).generate(&[], "hi").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "gemini returned HTTP 429: Resource has been exhausted"
    );
    assert!(matches!(err, Error::Upstream { status: 429, .. }));
}
