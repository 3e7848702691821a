//! Toolgate Gateway
//!
//! MCP server plumbing that provides:
//! - Stdio and SSE transports behind one channel contract
//! - A session registry multiplexing many SSE clients on one listener
//! - An OAuth token broker for service and delegated-user credentials
//! - Phased startup that only accepts MCP traffic once a credential exists

pub mod bootstrap;
pub mod mcp;
pub mod oauth;
pub mod server;
pub mod session;

pub use bootstrap::{Bootstrap, StartupError};
pub use mcp::{
    BuiltinToolSet, ProtocolEngine, RmcpEngine, ToolContext, ToolError, ToolServerHandler,
    ToolSet,
};
pub use oauth::{
    AuthError, AuthorizationGrant, BrowserPresenter, HttpIdentityProvider, IdentityProvider,
    NoPendingLogin, PendingLogins, PkceChallenge, TokenBroker, TokenResponse, UrlPresenter,
};
pub use server::{AppState, GatewayConfig, GatewayError, GatewayServer};
pub use session::{
    byte_stream_channel, stdio_channel, ChannelCloser, ChannelError, ChannelIo,
    Session, SessionRegistry, SseChannel,
};
