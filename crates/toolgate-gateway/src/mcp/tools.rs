//! Tool collaborator
//!
//! The engine owns the MCP protocol; what the tools actually do lives behind
//! [`ToolSet`]. Tools that call downstream APIs get their bearer token from
//! [`ToolContext::access_token`], which re-enters the token broker.

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Content, JsonObject, Tool};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use toolgate_core::{SessionId, TransportKind, TrustModel};

use crate::oauth::{AuthError, TokenBroker};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("no credential available: {0}")]
    Credential(#[from] AuthError),

    #[error("downstream request failed: {0}")]
    Downstream(#[from] reqwest::Error),

    #[error("tool set initialization failed: {0}")]
    Initialization(String),
}

/// Per-call context handed to tools
#[derive(Clone)]
pub struct ToolContext {
    pub session_id: SessionId,
    pub transport: TransportKind,
    pub trust_model: TrustModel,
    broker: Arc<TokenBroker>,
}

impl ToolContext {
    pub fn new(
        session_id: SessionId,
        transport: TransportKind,
        trust_model: TrustModel,
        broker: Arc<TokenBroker>,
    ) -> Self {
        Self {
            session_id,
            transport,
            trust_model,
            broker,
        }
    }

    /// Bearer token for downstream calls, cached by the broker
    pub async fn access_token(&self) -> Result<String, AuthError> {
        self.broker.acquire(self.trust_model).await
    }
}

#[async_trait]
pub trait ToolSet: Send + Sync {
    /// Called once before any transport accepts clients
    async fn initialize(&self) -> Result<(), ToolError>;

    fn tools(&self) -> Vec<Tool>;

    async fn call(
        &self,
        name: &str,
        arguments: JsonObject,
        ctx: &ToolContext,
    ) -> Result<CallToolResult, ToolError>;
}

pub const SESSION_INFO_TOOL: &str = "session_info";
pub const DOWNSTREAM_REQUEST_TOOL: &str = "downstream_request";

/// Tools shipped with the server
///
/// `session_info` is always present. `downstream_request` forwards an
/// authenticated request to the configured downstream API and only exists
/// when a downstream URL is set.
pub struct BuiltinToolSet {
    downstream_url: Option<String>,
    http_client: reqwest::Client,
}

impl BuiltinToolSet {
    pub fn new(downstream_url: Option<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            downstream_url,
            http_client,
        }
    }

    fn session_info(&self, ctx: &ToolContext) -> CallToolResult {
        let info = json!({
            "sessionId": ctx.session_id.as_str(),
            "transport": ctx.transport.as_str(),
            "trustModel": ctx.trust_model.as_str(),
        });
        CallToolResult::success(vec![Content::text(info.to_string())])
    }

    async fn downstream_request(
        &self,
        base: &str,
        arguments: JsonObject,
        ctx: &ToolContext,
    ) -> Result<CallToolResult, ToolError> {
        let mut base =
            Url::parse(base).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        // Relative paths extend the base path instead of replacing its last segment
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let url = match arguments.get("path").and_then(Value::as_str) {
            Some(path) => base
                .join(path.trim_start_matches('/'))
                .map_err(|e| ToolError::InvalidArguments(format!("bad path: {}", e)))?,
            None => base,
        };

        let method = arguments
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("GET")
            .to_ascii_uppercase();

        let token = ctx.access_token().await?;

        let mut request = match method.as_str() {
            "GET" => self.http_client.get(url.clone()),
            "POST" => self.http_client.post(url.clone()),
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "unsupported method: {}",
                    other
                )))
            }
        }
        .bearer_auth(token);

        if let Some(Value::Object(query)) = arguments.get("query") {
            let pairs: Vec<(String, String)> = query
                .iter()
                .map(|(k, v)| match v {
                    Value::String(s) => (k.clone(), s.clone()),
                    other => (k.clone(), other.to_string()),
                })
                .collect();
            request = request.query(&pairs);
        }
        if let Some(body) = arguments.get("body") {
            request = request.json(body);
        }

        debug!("[Tools] {} {}", method, url);
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            Ok(CallToolResult::success(vec![Content::text(text)]))
        } else {
            Ok(CallToolResult::error(vec![Content::text(format!(
                "HTTP {}: {}",
                status.as_u16(),
                text
            ))]))
        }
    }
}

#[async_trait]
impl ToolSet for BuiltinToolSet {
    async fn initialize(&self) -> Result<(), ToolError> {
        if let Some(url) = &self.downstream_url {
            Url::parse(url).map_err(|e| {
                ToolError::Initialization(format!("invalid downstream URL {}: {}", url, e))
            })?;
        }
        let names: Vec<String> = self.tools().iter().map(|t| t.name.to_string()).collect();
        info!("[Tools] Registered tools: {:?}", names);
        Ok(())
    }

    fn tools(&self) -> Vec<Tool> {
        let mut tools = vec![Tool::new(
            SESSION_INFO_TOOL,
            "Describe the current session: id, transport and credential trust model",
            Arc::new(schema(json!({ "type": "object", "properties": {} }))),
        )];

        if self.downstream_url.is_some() {
            tools.push(Tool::new(
                DOWNSTREAM_REQUEST_TOOL,
                "Send an authenticated request to the downstream API and return its response body",
                Arc::new(schema(json!({
                    "type": "object",
                    "properties": {
                        "path": { "type": "string", "description": "Path relative to the downstream base URL" },
                        "method": { "type": "string", "enum": ["GET", "POST"] },
                        "query": { "type": "object", "description": "Query string parameters" },
                        "body": { "type": "object", "description": "JSON body for POST" }
                    }
                }))),
            ));
        }

        tools
    }

    async fn call(
        &self,
        name: &str,
        arguments: JsonObject,
        ctx: &ToolContext,
    ) -> Result<CallToolResult, ToolError> {
        match name {
            SESSION_INFO_TOOL => Ok(self.session_info(ctx)),
            DOWNSTREAM_REQUEST_TOOL => match &self.downstream_url {
                Some(base) => self.downstream_request(base, arguments, ctx).await,
                None => Err(ToolError::UnknownTool(name.to_string())),
            },
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

fn schema(value: Value) -> JsonObject {
    match value {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}
