//! Gateway integration tests
//!
//! Full server bootstraps on ephemeral ports: HTTP endpoints, SSE sessions
//! driven through the MCP handshake, and the startup/shutdown phases.

mod sse_session;

use std::sync::Arc;
use tests::{identity, token_path, EchoCodeResponder, TestGateway};
use toolgate_core::{LoginCorrelation, ServerPhase, TrustModel};
use toolgate_gateway::HttpIdentityProvider;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer};

pub async fn authority() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(token_path()))
        .respond_with(EchoCodeResponder { expires_in: 3600 })
        .mount(&server)
        .await;
    server
}

/// Gateway under the service trust model, already `Ready`
pub async fn ready_gateway(authority: &MockServer) -> TestGateway {
    tests::init_test_tracing();
    let gateway = TestGateway::start(
        identity(&authority.uri(), TrustModel::ServiceCredential, LoginCorrelation::Fifo),
        Arc::new(HttpIdentityProvider::new()),
    )
    .await;
    gateway.wait_for_phase(ServerPhase::Ready).await;
    gateway
}
