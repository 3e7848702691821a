//! HTTP handlers
//!
//! - `GET <base>` opens an SSE channel
//! - `POST <base>?sessionId=<id>` delivers one client message to that channel
//! - `GET /health` liveness
//! - `GET /oauthcallback` receives the authorization code from the browser

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
};
use futures::Stream;
use rmcp::model::{ClientJsonRpcMessage, ServerJsonRpcMessage};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use toolgate_core::{branding, ServerPhase, SessionId};

use super::error::GatewayError;
use crate::mcp::ProtocolEngine;
use crate::oauth::TokenBroker;
use crate::session::{
    ChannelCloser, ChannelError, SessionRegistry, SseChannel, DEFAULT_CHANNEL_BUFFER,
};

/// Response header carrying the session id of a new channel
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub registry: SessionRegistry,
    pub engine: Arc<dyn ProtocolEngine>,
    pub broker: Arc<TokenBroker>,
    /// Base path clients POST to, advertised in the `endpoint` event
    pub base_path: String,
    pub phase: watch::Receiver<ServerPhase>,
}

impl AppState {
    fn is_ready(&self) -> bool {
        *self.phase.borrow() == ServerPhase::Ready
    }
}

/// Liveness only, no internal checks
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Open an SSE channel for one client
pub async fn open_channel(State(state): State<AppState>) -> Result<Response, GatewayError> {
    if !state.is_ready() {
        return Err(GatewayError::NotReady);
    }

    let (handle, io, outbound_rx) = SseChannel::open(DEFAULT_CHANNEL_BUFFER);
    let closer = handle.closer().clone();
    let session_id = state.registry.register(handle);
    let endpoint = format!("{}?sessionId={}", state.base_path, session_id);

    info!("[SSE] Channel opened for session {}", session_id);

    let engine = state.engine.clone();
    let serve_id = session_id.clone();
    tokio::spawn(async move {
        if let Err(e) = engine.serve(io, serve_id.clone()).await {
            debug!("[SSE] Engine stopped serving session {}: {:#}", serve_id, e);
        }
    });

    let stream = event_stream(endpoint, outbound_rx, closer);
    let sse = Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    );

    Ok(([(SESSION_ID_HEADER, session_id.to_string())], sse).into_response())
}

/// Closes the channel when the response stream is dropped
struct CloseOnDrop(ChannelCloser);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        if self.0.close() {
            debug!("[SSE] Client stream dropped, channel closed");
        }
    }
}

fn event_stream(
    endpoint: String,
    mut outbound: mpsc::Receiver<ServerJsonRpcMessage>,
    closer: ChannelCloser,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let guard = CloseOnDrop(closer.clone());
    async_stream::stream! {
        let _guard = guard;
        yield Ok(Event::default().event("endpoint").data(endpoint));

        loop {
            let message = tokio::select! {
                _ = closer.closed() => None,
                message = outbound.recv() => message,
            };
            let message = match message {
                Some(message) => message,
                None => break,
            };
            match serde_json::to_string(&message) {
                Ok(json) => yield Ok(Event::default().event("message").data(json)),
                Err(e) => warn!("[SSE] Dropping unserializable message: {}", e),
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Deliver one client message to the channel named by `sessionId`
pub async fn post_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, GatewayError> {
    if !state.is_ready() {
        return Err(GatewayError::NotReady);
    }

    let session_id = query
        .session_id
        .filter(|id| !id.is_empty())
        .map(SessionId::from)
        .ok_or(GatewayError::MissingSessionId)?;

    let session = state
        .registry
        .lookup(&session_id)
        .ok_or_else(|| GatewayError::SessionNotFound(session_id.clone()))?;

    let message: ClientJsonRpcMessage = serde_json::from_slice(&body)
        .map_err(|e| GatewayError::InvalidMessage(e.to_string()))?;

    // A channel closing under us is the same race as an unknown id
    session.deliver(message).await.map_err(|e| match e {
        ChannelError::Closed => GatewayError::SessionNotFound(session_id.clone()),
        other => GatewayError::Delivery(other),
    })?;

    debug!("[SSE] Message delivered to session {}", session_id);
    Ok((StatusCode::OK, "Accepted"))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Browser redirect target of the delegated login
pub async fn oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Html<String>, GatewayError> {
    let code = match query.code.filter(|code| !code.is_empty()) {
        Some(code) => code,
        None => {
            let detail = match (query.error, query.error_description) {
                (Some(error), Some(description)) => Some(format!("{}: {}", error, description)),
                (Some(error), None) => Some(error),
                (None, description) => description,
            };
            warn!("[OAuth] Callback without code: {:?}", detail);
            return Err(GatewayError::MissingCode(detail));
        }
    };

    state
        .broker
        .resolve_login(&code, query.state.as_deref())
        .map_err(|_| GatewayError::NoPendingLogin)?;

    info!("[OAuth] Callback accepted");
    Ok(Html(completion_page()))
}

fn completion_page() -> String {
    let app_name = branding::DISPLAY_NAME;
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{app_name} - Login Complete</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            min-height: 100vh;
            margin: 0;
            display: flex;
            align-items: center;
            justify-content: center;
            background: #14181f;
            color: #e6e6e6;
        }}
        .container {{ text-align: center; max-width: 400px; padding: 1rem; }}
        h1 {{ font-size: 1.5rem; font-weight: 600; margin-bottom: 0.75rem; color: #fff; }}
        p {{ color: #9aa4b2; line-height: 1.5; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Login complete</h1>
        <p>You can close this tab and return to {app_name}.</p>
    </div>
    <script>setTimeout(function(){{ window.close(); }}, 2000);</script>
</body>
</html>"##
    )
}
