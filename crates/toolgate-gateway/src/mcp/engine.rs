//! Protocol engine boundary
//!
//! The gateway hands every established channel to a [`ProtocolEngine`]
//! together with its session id. The engine drives the channel until it
//! closes; it never owns the channel's lifecycle beyond closing it when the
//! protocol session ends.

use anyhow::Context;
use async_trait::async_trait;
use rmcp::ServiceExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use toolgate_core::{SessionId, TrustModel};

use super::handler::ToolServerHandler;
use super::tools::{ToolContext, ToolSet};
use crate::oauth::TokenBroker;
use crate::session::ChannelIo;

#[async_trait]
pub trait ProtocolEngine: Send + Sync {
    /// Serve one channel until it closes
    async fn serve(&self, channel: ChannelIo, session_id: SessionId) -> anyhow::Result<()>;

    /// Stop every channel being served
    async fn close(&self);
}

/// rmcp-backed engine serving a [`ToolSet`]
pub struct RmcpEngine {
    tools: Arc<dyn ToolSet>,
    broker: Arc<TokenBroker>,
    trust_model: TrustModel,
    name: String,
    version: String,
    shutdown: CancellationToken,
}

impl RmcpEngine {
    pub fn new(
        tools: Arc<dyn ToolSet>,
        broker: Arc<TokenBroker>,
        trust_model: TrustModel,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            tools,
            broker,
            trust_model,
            name: name.into(),
            version: version.into(),
            shutdown: CancellationToken::new(),
        }
    }
}

#[async_trait]
impl ProtocolEngine for RmcpEngine {
    async fn serve(&self, channel: ChannelIo, session_id: SessionId) -> anyhow::Result<()> {
        let kind = channel.kind;
        let (outbound, inbound, closer) = channel.into_parts();

        let context = ToolContext::new(
            session_id.clone(),
            kind,
            self.trust_model,
            self.broker.clone(),
        );
        let handler =
            ToolServerHandler::new(self.tools.clone(), context, &self.name, &self.version);

        let ct = self.shutdown.child_token();
        {
            let ct = ct.clone();
            closer.on_close(move || ct.cancel());
        }

        info!(
            event = "server_connected",
            session = %session_id,
            transport = %kind,
            "[MCP] Client channel attached"
        );

        let result = match handler.serve_with_ct((outbound, inbound), ct).await {
            Ok(running) => running
                .waiting()
                .await
                .map(|reason| debug!("[MCP] Session {} finished: {:?}", session_id, reason))
                .context("MCP service task failed"),
            Err(e) => Err(anyhow::anyhow!("MCP initialization failed: {}", e)),
        };

        closer.close();

        match &result {
            Ok(()) => info!("[MCP] Session {} ended", session_id),
            Err(e) => error!(
                event = "server_error",
                session = %session_id,
                error = %e,
                "[MCP] Session failed"
            ),
        }
        result
    }

    async fn close(&self) {
        info!("[MCP] Closing protocol engine");
        self.shutdown.cancel();
    }
}
