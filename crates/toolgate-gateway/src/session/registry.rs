//! Session registry
//!
//! Maps session ids to live SSE channels. An entry exists exactly as long as
//! its channel is open: closing the channel, from whichever side, removes it.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rmcp::model::ClientJsonRpcMessage;
use std::sync::Arc;
use tracing::{debug, info};

use toolgate_core::SessionId;

use super::channel::{ChannelError, SseChannel};

/// A registered channel
pub struct Session {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    channel: SseChannel,
}

impl Session {
    pub async fn deliver(&self, message: ClientJsonRpcMessage) -> Result<(), ChannelError> {
        self.channel.deliver(message).await
    }

    pub fn close(&self) -> bool {
        self.channel.close()
    }

    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }
}

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<SessionId, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel under a fresh id
    ///
    /// A channel that is already closed, or closes while this runs, leaves
    /// no entry behind.
    pub fn register(&self, channel: SseChannel) -> SessionId {
        let id = SessionId::generate();
        let closer = channel.closer().clone();
        let session = Arc::new(Session {
            id: id.clone(),
            created_at: Utc::now(),
            channel,
        });

        self.sessions.insert(id.clone(), session);

        let sessions = Arc::downgrade(&self.sessions);
        let removed_id = id.clone();
        closer.on_close(move || {
            if let Some(sessions) = sessions.upgrade() {
                if sessions.remove(&removed_id).is_some() {
                    debug!("[Registry] Session {} removed", removed_id);
                }
            }
        });

        info!(
            "[Registry] Session {} registered ({} active)",
            id,
            self.sessions.len()
        );
        id
    }

    pub fn lookup(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Close every channel and clear the map
    pub fn close_all(&self) -> usize {
        let sessions: Vec<Arc<Session>> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for session in &sessions {
            session.close();
        }
        self.sessions.clear();
        if !sessions.is_empty() {
            info!("[Registry] Closed {} sessions", sessions.len());
        }
        sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }
}
