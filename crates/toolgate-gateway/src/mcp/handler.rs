//! rmcp server handler
//!
//! One instance per channel. Tool failures come back as `is_error` results so
//! a broken tool never tears down the session.

use rmcp::{
    model::*, service::RequestContext, ErrorData as McpError, RoleServer, ServerHandler,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use super::tools::{ToolContext, ToolSet};

#[derive(Clone)]
pub struct ToolServerHandler {
    tools: Arc<dyn ToolSet>,
    context: ToolContext,
    name: String,
    version: String,
}

impl ToolServerHandler {
    pub fn new(
        tools: Arc<dyn ToolSet>,
        context: ToolContext,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            tools,
            context,
            name: name.into(),
            version: version.into(),
        }
    }
}

impl ServerHandler for ToolServerHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.name.clone(),
                version: self.version.clone(),
                ..Default::default()
            },
            instructions: Some(
                "Tools on this server call downstream APIs with a credential obtained by the server."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _params: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = self.tools.tools();
        debug!(
            session = %self.context.session_id,
            count = tools.len(),
            "list_tools"
        );
        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        params: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let started = Instant::now();
        let arguments = params.arguments.unwrap_or_default();

        let result = self.tools.call(&params.name, arguments, &self.context).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(result) => {
                let status = if result.is_error == Some(true) {
                    "error"
                } else {
                    "success"
                };
                info!(
                    event = "tool_invoked",
                    tool = %params.name,
                    session = %self.context.session_id,
                    duration_ms,
                    status,
                    "call_tool"
                );
                Ok(result)
            }
            Err(e) => {
                error!(
                    event = "tool_invoked",
                    tool = %params.name,
                    session = %self.context.session_id,
                    duration_ms,
                    status = "failed",
                    error = %e,
                    "call_tool"
                );
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
        }
    }
}
