//! Gateway HTTP errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use toolgate_core::SessionId;

use crate::session::ChannelError;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Missing sessionId parameter")]
    MissingSessionId,

    /// Normal race: the client disconnected before its POST arrived
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Invalid JSON-RPC message: {0}")]
    InvalidMessage(String),

    #[error("Internal server error")]
    Delivery(#[source] ChannelError),

    #[error("Server is starting, try again shortly")]
    NotReady,

    #[error("Missing ?code{}", .0.as_deref().map(|d| format!(" ({})", d)).unwrap_or_default())]
    MissingCode(Option<String>),

    #[error("No pending login is waiting for an authorization code")]
    NoPendingLogin,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MissingSessionId
            | GatewayError::InvalidMessage(_)
            | GatewayError::MissingCode(_) => StatusCode::BAD_REQUEST,
            GatewayError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Delivery(_) | GatewayError::NoPendingLogin => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            GatewayError::Delivery(source) => {
                error!("[Gateway] Message delivery failed: {}", source)
            }
            other => debug!("[Gateway] {} ({})", other, status),
        }
        (status, self.to_string()).into_response()
    }
}
