//! Transport kinds

use serde::{Deserialize, Serialize};
use std::fmt;

/// How clients reach the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// One client over the process's stdin/stdout
    Stdio,
    /// Many clients over SSE push channels behind one HTTP listener
    Sse,
}

impl TransportKind {
    /// Parse the `MCP_TRANSPORT_TYPE` value: `sse` selects SSE, anything else stdio
    pub fn from_env_value(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("sse") {
            TransportKind::Sse
        } else {
            TransportKind::Stdio
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Stdio => "stdio",
            TransportKind::Sse => "sse",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
