//! Common test utilities and harness for gateway integration tests.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use komz_api::{AppState, router};
use komz_client::mock::{MockChatProvider, MockVoiceProvider};
use komz_core::{MemoryStore, RateLimiter};
use serde_json::{Value, json};
use tower::ServiceExt;

/// Test harness wiring mock providers into a router.
pub struct TestHarness {
    /// Mock voice provider
    pub voice: Arc<MockVoiceProvider>,
    /// Mock chat provider
    pub chat: Arc<MockChatProvider>,
    /// Shared limiter
    pub limiter: Arc<RateLimiter>,
    /// Router under test
    pub app: Router,
}

impl TestHarness {
    /// Harness with a fixed voice payload, a fixed chat reply, and a default agent.
    pub fn new() -> Self {
        Self::build(
            MockVoiceProvider::with_response(sample_call()),
            MockChatProvider::with_response("We'd love to help. What are you building?"),
            Some("agent_default".to_string()),
            5,
        )
    }

    /// Harness with custom parts.
    pub fn build(
        voice: MockVoiceProvider,
        chat: MockChatProvider,
        default_agent_id: Option<String>,
        limit: u32,
    ) -> Self {
        let voice = Arc::new(voice);
        let chat = Arc::new(chat);
        let limiter = Arc::new(RateLimiter::new(
            MemoryStore::new(),
            limit,
            Duration::from_secs(3600),
        ));
        let state = AppState::new(voice.clone(), chat.clone(), limiter.clone(), default_agent_id);
        let app = router(state, &[]);
        Self {
            voice,
            chat,
            limiter,
            app,
        }
    }

    /// Send one request through a clone of the router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Payload shaped like a real web-call response.
pub fn sample_call() -> Value {
    json!({
        "call_type": "web_call",
        "access_token": "eyJhbGciOiJIUzI1NiJ9.sample",
        "call_id": "call_0f1e2d3c",
        "agent_id": "agent_default",
        "call_status": "registered"
    })
}

/// JSON POST request.
pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// JSON POST request charged to `client`.
pub fn post_json_as(uri: &str, client: &str, body: Value) -> Request<Body> {
    let mut request = post_json(uri, body);
    request
        .headers_mut()
        .insert("x-client-id", client.parse().unwrap());
    request
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
