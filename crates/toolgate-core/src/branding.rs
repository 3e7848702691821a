//! Centralized branding constants
//!
//! All product naming and default endpoint values come from this module.

/// Server name advertised to MCP clients
pub const SERVER_NAME: &str = "toolgate";

/// Human-readable product name (HTML pages, log banners)
pub const DISPLAY_NAME: &str = "Toolgate";

/// Log file prefix (files look like `toolgate.2026-01-22.log`)
pub const LOG_PREFIX: &str = "toolgate";

/// App identifier used for the local data directory
pub const APP_IDENTIFIER: &str = "toolgate";

/// Default SSE listen port
pub const DEFAULT_SSE_PORT: u16 = 44330;

/// Default SSE listen host
pub const DEFAULT_SSE_HOST: &str = "0.0.0.0";

/// Default base path for the channel-open and control-message endpoints
pub const DEFAULT_SSE_PATH: &str = "/mcp";

/// Default identity provider authority
pub const DEFAULT_OAUTH_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Path of the browser redirect endpoint
pub const OAUTH_CALLBACK_PATH: &str = "/oauthcallback";

/// Path of the liveness endpoint
pub const HEALTH_PATH: &str = "/health";

/// Redirect URI for the delegated login when none is configured
///
/// The identity provider redirects the operator's browser here, so it must
/// name an address the browser can reach (`localhost`), not the bind host.
pub fn default_redirect_uri(port: u16) -> String {
    format!("http://localhost:{}{}", port, OAUTH_CALLBACK_PATH)
}

/// Token endpoint for a tenant (`<authority>/<tenant>/oauth2/v2.0/token`)
pub fn token_endpoint(authority: &str, tenant_id: &str) -> String {
    format!(
        "{}/{}/oauth2/v2.0/token",
        authority.trim_end_matches('/'),
        tenant_id
    )
}

/// Authorization endpoint for a tenant (`<authority>/<tenant>/oauth2/v2.0/authorize`)
pub fn authorize_endpoint(authority: &str, tenant_id: &str) -> String {
    format!(
        "{}/{}/oauth2/v2.0/authorize",
        authority.trim_end_matches('/'),
        tenant_id
    )
}

/// Default scope for a client (`<client_id>/.default`)
pub fn default_scope(client_id: &str) -> String {
    format!("{}/.default", client_id)
}
