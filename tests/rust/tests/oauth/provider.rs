//! HTTP identity provider against a mock token endpoint

use pretty_assertions::assert_eq;
use tests::mocks::form_fields;
use tests::{token_path, EchoCodeResponder};
use toolgate_gateway::{AuthError, HttpIdentityProvider, IdentityProvider};
use toolgate_gateway::oauth::{AuthorizationCodeRequest, ClientCredentialsRequest};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zeroize::Zeroizing;

fn client_credentials(server: &MockServer) -> ClientCredentialsRequest {
    ClientCredentialsRequest {
        token_endpoint: format!("{}{}", server.uri(), token_path()),
        client_id: "svc-client".to_string(),
        client_secret: Zeroizing::new("svc-secret".to_string()),
        scope: "svc-client/.default".to_string(),
    }
}

#[tokio::test]
async fn test_client_credentials_posts_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(token_path()))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(EchoCodeResponder { expires_in: 1800 })
        .expect(1)
        .mount(&server)
        .await;

    let provider = HttpIdentityProvider::new();
    let token = provider
        .exchange_client_credentials(&client_credentials(&server))
        .await
        .unwrap();

    assert_eq!(token.access_token, "service-token");
    assert_eq!(token.expires_in, Some(1800));

    let requests = server.received_requests().await.unwrap();
    let form = form_fields(&requests[0]);
    assert_eq!(form["client_id"], "svc-client");
    assert_eq!(form["client_secret"], "svc-secret");
    assert_eq!(form["scope"], "svc-client/.default");
    assert_eq!(
        requests[0]
            .headers
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("application/x-www-form-urlencoded")
    );
}

#[tokio::test]
async fn test_authorization_code_sends_verifier() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(token_path()))
        .respond_with(EchoCodeResponder { expires_in: 3600 })
        .mount(&server)
        .await;

    let request = AuthorizationCodeRequest {
        token_endpoint: format!("{}{}", server.uri(), token_path()),
        client_id: "login-client".to_string(),
        code: "abc".to_string(),
        redirect_uri: "http://localhost:44330/oauthcallback".to_string(),
        code_verifier: Zeroizing::new("verifier-123".to_string()),
        scope: "login-client/.default".to_string(),
    };
    let token = HttpIdentityProvider::new()
        .exchange_authorization_code(&request)
        .await
        .unwrap();
    assert_eq!(token.access_token, "token-abc");

    let requests = server.received_requests().await.unwrap();
    let form = form_fields(&requests[0]);
    assert_eq!(form["grant_type"], "authorization_code");
    assert_eq!(form["code_verifier"], "verifier-123");
    assert_eq!(form["redirect_uri"], "http://localhost:44330/oauthcallback");
}

#[tokio::test]
async fn test_rejected_status_keeps_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .mount(&server)
        .await;

    let err = HttpIdentityProvider::new()
        .exchange_client_credentials(&client_credentials(&server))
        .await
        .unwrap_err();

    match err {
        AuthError::Rejected { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid_client");
        }
        other => panic!("expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let err = HttpIdentityProvider::new()
        .exchange_client_credentials(&client_credentials(&server))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Malformed(_)), "got {:?}", err);
}
