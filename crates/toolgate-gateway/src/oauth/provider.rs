//! Identity provider boundary
//!
//! The broker only talks to the provider through [`IdentityProvider`]; the
//! HTTP implementation posts form-encoded grants to the token endpoint.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::token::{AuthorizationCodeRequest, ClientCredentialsRequest, TokenResponse};
use super::AuthError;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Trade an authorization code plus PKCE verifier for a token
    async fn exchange_authorization_code(
        &self,
        request: &AuthorizationCodeRequest,
    ) -> Result<TokenResponse, AuthError>;

    /// Client-credential grant for the service identity
    async fn exchange_client_credentials(
        &self,
        request: &ClientCredentialsRequest,
    ) -> Result<TokenResponse, AuthError>;
}

/// reqwest-backed provider
pub struct HttpIdentityProvider {
    http_client: reqwest::Client,
}

impl HttpIdentityProvider {
    pub fn new() -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { http_client }
    }

    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    async fn post_form(
        &self,
        token_endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<TokenResponse, AuthError> {
        let response = self
            .http_client
            .post(token_endpoint)
            .form(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("[OAuth] Token endpoint returned HTTP {}", status);
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| AuthError::Malformed(e.to_string()))
    }
}

impl Default for HttpIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn exchange_authorization_code(
        &self,
        request: &AuthorizationCodeRequest,
    ) -> Result<TokenResponse, AuthError> {
        info!("[OAuth] Exchanging authorization code for tokens");
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", request.client_id.as_str()),
            ("code", request.code.as_str()),
            ("redirect_uri", request.redirect_uri.as_str()),
            ("code_verifier", request.code_verifier.as_str()),
            ("scope", request.scope.as_str()),
        ];
        let token = self.post_form(&request.token_endpoint, &params).await?;
        debug!("[OAuth] Authorization code exchange successful");
        Ok(token)
    }

    async fn exchange_client_credentials(
        &self,
        request: &ClientCredentialsRequest,
    ) -> Result<TokenResponse, AuthError> {
        info!(
            "[OAuth] Requesting client-credential token for client {}",
            request.client_id
        );
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", request.client_id.as_str()),
            ("client_secret", request.client_secret.as_str()),
            ("scope", request.scope.as_str()),
        ];
        let token = self.post_form(&request.token_endpoint, &params).await?;
        debug!("[OAuth] Client-credential exchange successful");
        Ok(token)
    }
}
