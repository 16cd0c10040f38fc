//! Router assembly and the listener loop.

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use komz_core::GatewayConfig;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::RateLimitLayer;
use crate::{AppState, Result, routes};

/// Builds the gateway router.
///
/// `cors_origins` lists allowed origins; empty allows any origin.
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    let chat = Router::new()
        .route("/chat", post(routes::chat))
        .route_layer(RateLimitLayer::new(state.limiter.clone()));

    Router::new()
        .route("/create-web-call", post(routes::create_web_call))
        .route("/chat/quota", get(routes::quota))
        .route("/health", get(routes::health))
        .merge(chat)
        .with_state(state)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        if parsed.is_empty() {
            tracing::error!(
                configured = origins.len(),
                "No valid CORS origins; cross-origin requests will be refused"
            );
        }
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Komz demo gateway.
pub struct Server {
    config: GatewayConfig,
    state: AppState,
}

impl Server {
    /// Create a server with production provider clients.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        config.validate()?;
        let state = AppState::from_config(&config)?;
        Ok(Self { config, state })
    }

    /// Create a server around prepared state.
    pub fn with_state(config: GatewayConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// The router this server serves.
    pub fn router(&self) -> Router {
        router(self.state.clone(), &self.config.server.cors_origins)
    }

    /// Bind the configured address and serve until Ctrl-C.
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr).await?;
        self.serve_on(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener.local_addr()?;
        tracing::info!(addr = %local, "Komz gateway listening");

        let limiter = self.state.limiter.clone();
        let window = limiter.window();
        let purger = (!window.is_zero()).then(|| {
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(window);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    match limiter.purge_expired() {
                        Ok(0) => {}
                        Ok(removed) => {
                            tracing::debug!(removed, "Purged expired rate-limit entries")
                        }
                        Err(e) => tracing::warn!(error = %e, "Rate-limit purge failed"),
                    }
                }
            })
        });

        let app = self.router();
        let result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await;

        if let Some(purger) = purger {
            purger.abort();
        }
        tracing::info!("Komz gateway stopped");
        result.map_err(Into::into)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
