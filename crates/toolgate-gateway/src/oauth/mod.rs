//! OAuth token broker
//!
//! Obtains and caches downstream access tokens under two trust models:
//! - service credentials via the client-credential grant
//! - delegated user login via authorization code + PKCE, completed by the
//!   gateway's browser callback

mod broker;
mod pending;
mod pkce;
mod presenter;
mod provider;
mod token;

pub use broker::TokenBroker;
pub use pending::{AuthorizationGrant, NoPendingLogin, PendingLogins};
pub use pkce::{generate_state, PkceChallenge, PKCE_METHOD};
pub use presenter::{BrowserPresenter, LogPresenter, UrlPresenter};
pub use provider::{HttpIdentityProvider, IdentityProvider};
pub use token::{AuthorizationCodeRequest, ClientCredentialsRequest, TokenResponse};

/// Credential acquisition failures
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token endpoint rejected the request: HTTP {status} - {body}")]
    Rejected { status: u16, body: String },

    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed token response: {0}")]
    Malformed(String),

    #[error("token response carried no access token")]
    EmptyToken,

    #[error("login abandoned before an authorization code arrived")]
    LoginAbandoned,

    #[error("invalid authorization endpoint: {0}")]
    InvalidAuthority(#[from] url::ParseError),
}
