//! Server lifecycle phases
//!
//! ```text
//! Idle -> HandlersInitializing -> TransportBinding -> TokenAcquiring -> Ready
//!   ^                                                                    |
//!   +---------------------------- shutdown -----------------------------+
//!
//! Failed is reachable from every phase except Failed itself.
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerPhase {
    Idle,
    HandlersInitializing,
    TransportBinding,
    TokenAcquiring,
    Ready,
    Failed,
}

impl ServerPhase {
    /// Whether `self -> next` is a legal transition
    pub fn can_transition_to(self, next: ServerPhase) -> bool {
        use ServerPhase::*;
        match (self, next) {
            (Failed, _) => false,
            (_, Failed) => true,
            (Idle, HandlersInitializing)
            | (HandlersInitializing, TransportBinding)
            | (TransportBinding, TokenAcquiring)
            | (TokenAcquiring, Ready)
            | (Ready, Idle) => true,
            // Interrupt before readiness takes the same shutdown path
            (HandlersInitializing | TransportBinding | TokenAcquiring, Idle) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ServerPhase::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServerPhase::Idle => "idle",
            ServerPhase::HandlersInitializing => "handlers_initializing",
            ServerPhase::TransportBinding => "transport_binding",
            ServerPhase::TokenAcquiring => "token_acquiring",
            ServerPhase::Ready => "ready",
            ServerPhase::Failed => "failed",
        }
    }
}

impl Default for ServerPhase {
    fn default() -> Self {
        ServerPhase::Idle
    }
}

impl fmt::Display for ServerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected phase change
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal phase transition: {from} -> {to}")]
pub struct PhaseTransitionError {
    pub from: ServerPhase,
    pub to: ServerPhase,
}
