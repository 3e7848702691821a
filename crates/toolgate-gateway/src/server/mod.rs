//! Transport Gateway
//!
//! The single HTTP listener of SSE mode. Health and the OAuth callback are
//! live as soon as the listener binds; the MCP endpoints answer 503 until the
//! server phase reaches `Ready`.

mod error;
mod handlers;

pub use error::GatewayError;
pub use handlers::{AppState, CallbackQuery, MessageQuery, SESSION_ID_HEADER};

use axum::{
    http::{header::HeaderName, HeaderValue, Method},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use toolgate_core::{branding, SseConfig};

/// Gateway server configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Base path of the MCP endpoints
    pub path: String,
    /// Allowed CORS origins, `*` for any
    pub cors_origins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::from(&SseConfig::default())
    }
}

impl From<&SseConfig> for GatewayConfig {
    fn from(sse: &SseConfig) -> Self {
        Self {
            host: sse.host.clone(),
            port: sse.port,
            path: sse.path.clone(),
            cors_origins: sse.cors_origins.clone(),
        }
    }
}

impl GatewayConfig {
    /// `host:port` to bind
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn cors_layer(&self) -> CorsLayer {
        let layer = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
            .expose_headers([HeaderName::from_static(SESSION_ID_HEADER)]);

        if self.cors_origins.iter().any(|o| o == "*") {
            return layer.allow_origin(Any);
        }

        let origins: Vec<HeaderValue> = self
            .cors_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("[Gateway] Ignoring invalid CORS origin {:?}", origin);
                    None
                }
            })
            .collect();
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

/// HTTP gateway: router plus listener lifecycle
pub struct GatewayServer {
    config: GatewayConfig,
    state: AppState,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Build the Axum router
    pub fn build_router(&self) -> Router {
        Router::new()
            .route(branding::HEALTH_PATH, get(handlers::health))
            .route(branding::OAUTH_CALLBACK_PATH, get(handlers::oauth_callback))
            .route(
                &self.config.path,
                get(handlers::open_channel).post(handlers::post_message),
            )
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(self.config.cors_layer())
    }

    /// Bind the configured address
    pub async fn bind(&self) -> std::io::Result<TcpListener> {
        let listener = TcpListener::bind(self.config.addr()).await?;
        info!(
            "[Gateway] Listening on {} (MCP endpoint {})",
            listener.local_addr()?,
            self.config.path
        );
        Ok(listener)
    }

    /// Serve on `listener` until `shutdown` fires
    pub fn spawn(self, listener: TcpListener, shutdown: CancellationToken) -> JoinHandle<()> {
        let router = self.build_router();
        tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                info!("[Gateway] Listener shutting down");
            });
            if let Err(e) = server.await {
                error!("[Gateway] Server error: {}", e);
            }
        })
    }
}
