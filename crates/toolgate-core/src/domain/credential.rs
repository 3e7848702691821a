//! Credential value objects
//!
//! Downstream calls authenticate with an access token obtained under one of
//! two trust models. Tokens are cached in memory only.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A cached token is only handed out while `now + margin < expires_at`.
///
/// Covers clock skew and the latency of the request that will carry it.
pub const CREDENTIAL_SAFETY_MARGIN_SECS: i64 = 60;

/// Delegated-user tokens are cached for a fixed hour, whatever lifetime the
/// provider reports.
pub const USER_CREDENTIAL_VALIDITY_SECS: i64 = 3600;

/// Service-credential lifetime assumed when the provider omits `expires_in`
pub const SERVICE_CREDENTIAL_DEFAULT_LIFETIME_SECS: i64 = 3600;

/// Authentication strategy used to obtain downstream access tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustModel {
    /// Client-credential exchange (tenant + client id + secret)
    ServiceCredential,
    /// Interactive login in the operator's browser (authorization code + PKCE)
    DelegatedUser,
}

impl TrustModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustModel::ServiceCredential => "service",
            TrustModel::DelegatedUser => "user",
        }
    }
}

impl fmt::Display for TrustModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrustModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "service" | "service_credential" | "client_credentials" => {
                Ok(TrustModel::ServiceCredential)
            }
            "user" | "delegated" | "delegated_user" => Ok(TrustModel::DelegatedUser),
            other => Err(format!("unknown trust model: {}", other)),
        }
    }
}

/// How an incoming authorization code is paired with a pending login
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginCorrelation {
    /// Oldest pending login takes the next code, regardless of which
    /// browser tab produced it
    #[default]
    Fifo,
    /// The `state` parameter echoed by the provider selects the login
    State,
}

impl FromStr for LoginCorrelation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(LoginCorrelation::Fifo),
            "state" => Ok(LoginCorrelation::State),
            other => Err(format!("unknown login correlation: {}", other)),
        }
    }
}

/// An access token together with its absolute expiry
#[derive(Clone, PartialEq, Eq)]
pub struct CachedCredential {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedCredential {
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    /// Create a credential valid for `lifetime` starting at `now`
    pub fn valid_for(access_token: impl Into<String>, now: DateTime<Utc>, lifetime: Duration) -> Self {
        Self::new(access_token, now + lifetime)
    }

    /// Whether the token may still be handed out at `now`
    pub fn is_reusable_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(CREDENTIAL_SAFETY_MARGIN_SECS) < self.expires_at
    }
}

impl fmt::Debug for CachedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.access_token.chars().take(8).collect();
        f.debug_struct("CachedCredential")
            .field("access_token", &format!("{}...", prefix))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
