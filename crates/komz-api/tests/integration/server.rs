//! End-to-end tests over a real TCP listener.

use std::sync::Arc;
use std::time::Duration;

use komz_api::{AppState, Server};
use komz_client::mock::{MockChatProvider, MockVoiceProvider};
use komz_core::{GatewayConfig, MemoryStore, RateLimiter};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::common::sample_call;

async fn start() -> (String, Arc<RateLimiter>, oneshot::Sender<()>) {
    start_with(GatewayConfig::default()).await
}

async fn start_with(config: GatewayConfig) -> (String, Arc<RateLimiter>, oneshot::Sender<()>) {
    let limiter = Arc::new(RateLimiter::new(
        MemoryStore::new(),
        2,
        Duration::from_secs(3600),
    ));
    let state = AppState::new(
        Arc::new(MockVoiceProvider::with_response(sample_call())),
        Arc::new(MockChatProvider::with_response("Hello from the model")),
        limiter.clone(),
        Some("agent_default".to_string()),
    );
    let server = Server::with_state(config, state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        server
            .serve_on(listener, async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });

    (format!("http://{addr}"), limiter, tx)
}

#[tokio::test]
async fn test_health_over_tcp() {
    let (base, _limiter, shutdown) = start().await;

    let body: serde_json::Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["name"], "komz-api");
    let _ = shutdown.send(());
}

#[tokio::test]
async fn test_chat_is_keyed_by_peer_ip() {
    let (base, limiter, shutdown) = start().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/chat"))
        .json(&json!({"prompt": "hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    assert_eq!(limiter.remaining("ip:127.0.0.1").unwrap(), 1);
    let _ = shutdown.send(());
}

#[tokio::test]
async fn test_cors_preflight_allows_any_origin() {
    let (base, _limiter, shutdown) = start().await;
    let client = reqwest::Client::new();

    let response = client
        .request(reqwest::Method::OPTIONS, format!("{base}/create-web-call"))
        .header("origin", "https://komzconsulting.com")
        .header("access-control-request-method", "POST")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
    let _ = shutdown.send(());
}

#[tokio::test]
async fn test_cors_echoes_only_listed_origins() {
    let mut config = GatewayConfig::default();
    config.server.cors_origins = vec!["https://komzconsulting.com".to_string()];
    let (base, _limiter, shutdown) = start_with(config).await;
    let client = reqwest::Client::new();

    let listed = client
        .get(format!("{base}/health"))
        .header("origin", "https://komzconsulting.com")
        .send()
        .await
        .unwrap();
    assert_eq!(listed.status(), 200);
    assert_eq!(
        listed.headers()["access-control-allow-origin"],
        "https://komzconsulting.com"
    );

    let unlisted = client
        .get(format!("{base}/health"))
        .header("origin", "https://elsewhere.example")
        .send()
        .await
        .unwrap();
    assert!(
        !unlisted
            .headers()
            .contains_key("access-control-allow-origin")
    );

    let preflight = client
        .request(reqwest::Method::OPTIONS, format!("{base}/create-web-call"))
        .header("origin", "https://elsewhere.example")
        .header("access-control-request-method", "POST")
        .send()
        .await
        .unwrap();
    assert!(
        !preflight
            .headers()
            .contains_key("access-control-allow-origin")
    );
    let _ = shutdown.send(());
}
