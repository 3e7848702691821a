//! Shared test utilities and fixtures for Toolgate integration tests.

/// Mock collaborators (presenter, token endpoint responders)
pub mod mocks;
pub use mocks::{CapturePresenter, EchoCodeResponder};

pub use harness::{SseEvent, SseEvents, TestGateway};

use std::sync::Arc;
use toolgate_core::{
    DelegatedLoginConfig, IdentityConfig, LoginCorrelation, ManualClock, ServiceCredentials,
    TrustModel,
};
use toolgate_gateway::{IdentityProvider, TokenBroker, UrlPresenter};
use zeroize::Zeroizing;

pub const TENANT: &str = "test-tenant";
pub const SERVICE_CLIENT: &str = "svc-client";
pub const LOGIN_CLIENT: &str = "login-client";

/// Install a test subscriber once; honours RUST_LOG
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Identity settings pointing at a mock authority
pub fn identity(
    authority: &str,
    trust_model: TrustModel,
    correlation: LoginCorrelation,
) -> IdentityConfig {
    IdentityConfig {
        authority: authority.to_string(),
        service: ServiceCredentials {
            tenant_id: TENANT.to_string(),
            client_id: SERVICE_CLIENT.to_string(),
            client_secret: Zeroizing::new("svc-secret".to_string()),
        },
        login: DelegatedLoginConfig {
            tenant_id: TENANT.to_string(),
            client_id: LOGIN_CLIENT.to_string(),
            redirect_uri: "http://localhost:44330/oauthcallback".to_string(),
        },
        trust_model,
        correlation,
    }
}

/// Path of the mock token endpoint for [`TENANT`]
pub fn token_path() -> String {
    format!("/{}/oauth2/v2.0/token", TENANT)
}

/// Broker wired to `provider` with a manual clock and capturing presenter
pub fn broker_with(
    identity: IdentityConfig,
    provider: Arc<dyn IdentityProvider>,
) -> (Arc<TokenBroker>, Arc<ManualClock>, Arc<CapturePresenter>) {
    let clock = Arc::new(ManualClock::default());
    let presenter = Arc::new(CapturePresenter::default());
    let broker = TokenBroker::new(
        identity,
        provider,
        presenter.clone() as Arc<dyn UrlPresenter>,
        clock.clone(),
    );
    (Arc::new(broker), clock, presenter)
}
