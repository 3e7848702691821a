//! MCP protocol engine (rmcp-based)

mod engine;
mod handler;
mod tools;

pub use engine::{ProtocolEngine, RmcpEngine};
pub use handler::ToolServerHandler;
pub use tools::{
    BuiltinToolSet, ToolContext, ToolError, ToolSet, DOWNSTREAM_REQUEST_TOOL, SESSION_INFO_TOOL,
};
