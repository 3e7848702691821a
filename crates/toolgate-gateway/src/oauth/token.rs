//! Token endpoint payloads

use serde::Deserialize;
use zeroize::Zeroizing;

/// Token response from the identity provider
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Missing in the payload deserializes as empty and is rejected by the broker
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds, as reported by the provider
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// `grant_type=client_credentials` request
#[derive(Debug, Clone)]
pub struct ClientCredentialsRequest {
    pub token_endpoint: String,
    pub client_id: String,
    pub client_secret: Zeroizing<String>,
    pub scope: String,
}

/// `grant_type=authorization_code` request
#[derive(Debug, Clone)]
pub struct AuthorizationCodeRequest {
    pub token_endpoint: String,
    pub client_id: String,
    pub code: String,
    pub redirect_uri: String,
    pub code_verifier: Zeroizing<String>,
    pub scope: String,
}
