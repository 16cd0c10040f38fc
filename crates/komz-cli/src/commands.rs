//! Handlers for `serve`, `chat` and `call`.

use std::sync::Arc;

use komz_api::Server;
use komz_client::{GeminiClient, RetellClient, VoiceCallProvider, WebCallRequest};
use komz_core::{GatewayConfig, JsonFileStore, RateLimiter};
use tokio::io::BufReader;

use crate::Result;
use crate::chat::{ChatSession, run_repl};

/// Runs the gateway until Ctrl-C.
pub async fn serve(mut config: GatewayConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate()?;

    Server::new(config)?.serve().await?;
    Ok(())
}

/// Opens an interactive chat on stdin/stdout.
pub async fn chat(config: &GatewayConfig) -> Result<()> {
    let provider = Arc::new(GeminiClient::new(&config.gemini)?);
    let store = JsonFileStore::new(JsonFileStore::default_path().unwrap_or_else(|| {
        std::env::temp_dir().join("komz").join("rate_limit.json")
    }));
    tracing::debug!(path = %store.path().display(), "Chat quota store");

    let limiter = Arc::new(RateLimiter::new(
        store,
        config.rate_limit.max_messages,
        config.rate_limit.window(),
    ));

    let mut session = ChatSession::new(provider, limiter);
    let mut stdout = tokio::io::stdout();
    run_repl(&mut session, BufReader::new(tokio::io::stdin()), &mut stdout).await
}

/// Provisions one web call and prints the provider's JSON.
pub async fn call(config: &GatewayConfig, agent_id: Option<String>) -> Result<()> {
    let client = RetellClient::new(&config.retell)?;
    let call = create_call(&client, agent_id, config.retell.default_agent_id.as_deref()).await?;

    let pretty = serde_json::to_string_pretty(&call).map_err(komz_core::Error::from)?;
    println!("{pretty}");
    Ok(())
}

/// Resolves the agent and asks `provider` for a call.
pub async fn create_call(
    provider: &dyn VoiceCallProvider,
    agent_id: Option<String>,
    fallback: Option<&str>,
) -> Result<serde_json::Value> {
    let request = WebCallRequest { agent_id };
    let agent = request
        .resolve_agent(fallback)
        .ok_or(komz_client::Error::MissingAgentId)?;

    tracing::info!(agent_id = agent, "Creating web call");
    Ok(provider.create_web_call(agent).await?)
}
