//! Server configuration
//!
//! Everything is read from environment-style variables, all optional with
//! defaults. `from_lookup` takes any key lookup so tests never touch the
//! process environment.

use std::fmt;
use tracing::info;
use zeroize::Zeroizing;

use crate::branding;
use crate::domain::{LoginCorrelation, TransportKind, TrustModel};

pub const ENV_TRANSPORT_TYPE: &str = "MCP_TRANSPORT_TYPE";
pub const ENV_SSE_PORT: &str = "MCP_SSE_PORT";
pub const ENV_SSE_HOST: &str = "MCP_SSE_HOST";
pub const ENV_SSE_PATH: &str = "MCP_SSE_PATH";
pub const ENV_SSE_CORS_ORIGIN: &str = "MCP_SSE_CORS_ORIGIN";
pub const ENV_SERVICE_CLIENT_ID: &str = "MCP_STDIO_CLIENTID";
pub const ENV_SERVICE_TENANT_ID: &str = "MCP_STDIO_TENANTID";
pub const ENV_SERVICE_CLIENT_SECRET: &str = "MCP_STDIO_CLIENTSECRET";
pub const ENV_OAUTH_AUTHORITY: &str = "MCP_OAUTH_AUTHORITY";
pub const ENV_LOGIN_CLIENT_ID: &str = "MCP_LOGIN_CLIENTID";
pub const ENV_LOGIN_TENANT_ID: &str = "MCP_LOGIN_TENANTID";
pub const ENV_LOGIN_REDIRECT_URI: &str = "MCP_LOGIN_REDIRECT_URI";
pub const ENV_AUTH_MODE: &str = "MCP_AUTH_MODE";
pub const ENV_LOGIN_CORRELATION: &str = "MCP_LOGIN_CORRELATION";
pub const ENV_DOWNSTREAM_URL: &str = "MCP_DOWNSTREAM_URL";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// SSE listener configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Base path for channel-open (GET) and control-message (POST)
    pub path: String,
    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

impl Default for SseConfig {
    fn default() -> Self {
        Self {
            host: branding::DEFAULT_SSE_HOST.to_string(),
            port: branding::DEFAULT_SSE_PORT,
            path: branding::DEFAULT_SSE_PATH.to_string(),
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Identity for the client-credential exchange
#[derive(Clone, Default)]
pub struct ServiceCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: Zeroizing<String>,
}

impl fmt::Debug for ServiceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &if self.client_secret.is_empty() { "<empty>" } else { "<redacted>" },
            )
            .finish()
    }
}

impl ServiceCredentials {
    pub fn scope(&self) -> String {
        branding::default_scope(&self.client_id)
    }
}

/// Identity for the interactive authorization-code login
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelegatedLoginConfig {
    pub tenant_id: String,
    pub client_id: String,
    /// Where the provider sends the operator's browser with the code
    pub redirect_uri: String,
}

impl DelegatedLoginConfig {
    pub fn scope(&self) -> String {
        branding::default_scope(&self.client_id)
    }
}

/// Identity provider settings for both trust models
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Provider base URL, e.g. `https://login.microsoftonline.com`
    pub authority: String,
    pub service: ServiceCredentials,
    pub login: DelegatedLoginConfig,
    /// Trust model used for the startup credential and tool calls
    pub trust_model: TrustModel,
    pub correlation: LoginCorrelation,
}

impl IdentityConfig {
    pub fn token_endpoint(&self, tenant_id: &str) -> String {
        branding::token_endpoint(&self.authority, tenant_id)
    }

    pub fn authorize_endpoint(&self, tenant_id: &str) -> String {
        branding::authorize_endpoint(&self.authority, tenant_id)
    }
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Name advertised to MCP clients
    pub name: String,
    /// Version advertised to MCP clients
    pub version: String,
    pub transport: TransportKind,
    pub sse: SseConfig,
    pub identity: IdentityConfig,
    /// Endpoint the generic downstream tool forwards to, if any
    pub downstream_url: Option<String>,
}

impl ServerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let transport = get(ENV_TRANSPORT_TYPE)
            .map(|v| TransportKind::from_env_value(&v))
            .unwrap_or(TransportKind::Sse);

        let port = match get(ENV_SSE_PORT) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: ENV_SSE_PORT,
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => branding::DEFAULT_SSE_PORT,
        };

        let mut path = get(ENV_SSE_PATH).unwrap_or_else(|| branding::DEFAULT_SSE_PATH.to_string());
        if !path.starts_with('/') {
            path.insert(0, '/');
        }

        let cors_origins = get(ENV_SSE_CORS_ORIGIN)
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| vec!["*".to_string()]);

        let sse = SseConfig {
            host: get(ENV_SSE_HOST).unwrap_or_else(|| branding::DEFAULT_SSE_HOST.to_string()),
            port,
            path,
            cors_origins,
        };

        let service = ServiceCredentials {
            tenant_id: get(ENV_SERVICE_TENANT_ID).unwrap_or_default(),
            client_id: get(ENV_SERVICE_CLIENT_ID).unwrap_or_default(),
            client_secret: Zeroizing::new(get(ENV_SERVICE_CLIENT_SECRET).unwrap_or_default()),
        };

        let login = DelegatedLoginConfig {
            tenant_id: get(ENV_LOGIN_TENANT_ID).unwrap_or_else(|| service.tenant_id.clone()),
            client_id: get(ENV_LOGIN_CLIENT_ID).unwrap_or_else(|| service.client_id.clone()),
            redirect_uri: get(ENV_LOGIN_REDIRECT_URI)
                .unwrap_or_else(|| branding::default_redirect_uri(port)),
        };

        // stdio has no callback endpoint, so it cannot finish a browser login
        let trust_model = match get(ENV_AUTH_MODE) {
            Some(raw) => raw.parse::<TrustModel>().map_err(|reason| ConfigError::InvalidValue {
                key: ENV_AUTH_MODE,
                value: raw.clone(),
                reason,
            })?,
            None => match transport {
                TransportKind::Stdio => TrustModel::ServiceCredential,
                TransportKind::Sse => TrustModel::DelegatedUser,
            },
        };

        let correlation = match get(ENV_LOGIN_CORRELATION) {
            Some(raw) => raw
                .parse::<LoginCorrelation>()
                .map_err(|reason| ConfigError::InvalidValue {
                    key: ENV_LOGIN_CORRELATION,
                    value: raw.clone(),
                    reason,
                })?,
            None => LoginCorrelation::default(),
        };

        let identity = IdentityConfig {
            authority: get(ENV_OAUTH_AUTHORITY)
                .unwrap_or_else(|| branding::DEFAULT_OAUTH_AUTHORITY.to_string()),
            service,
            login,
            trust_model,
            correlation,
        };

        let config = Self {
            name: branding::SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            transport,
            sse,
            identity,
            downstream_url: get(ENV_DOWNSTREAM_URL),
        };

        info!(
            transport = %config.transport,
            trust_model = %config.identity.trust_model,
            correlation = ?config.identity.correlation,
            "[Config] Configuration loaded"
        );

        Ok(config)
    }
}
