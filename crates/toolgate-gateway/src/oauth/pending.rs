//! Pending delegated logins
//!
//! Each login attempt parks a one-shot sender here before its authorization
//! URL is shown. The callback endpoint resolves one entry per code it
//! receives: the oldest entry in FIFO mode, or the entry whose `state`
//! matches in state mode.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use toolgate_core::LoginCorrelation;

/// What a resolved login receives
pub struct AuthorizationGrant {
    pub code: String,
    /// Verifier of the login attempt this code was paired with
    pub verifier: Zeroizing<String>,
}

/// No pending login could take an authorization code
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no pending login waiting for an authorization code")]
pub struct NoPendingLogin;

struct PendingLogin {
    state: String,
    verifier: Zeroizing<String>,
    tx: oneshot::Sender<AuthorizationGrant>,
    started_at: DateTime<Utc>,
}

/// Queue of logins awaiting a code, in initiation order
pub struct PendingLogins {
    correlation: LoginCorrelation,
    queue: Mutex<VecDeque<PendingLogin>>,
}

impl PendingLogins {
    pub fn new(correlation: LoginCorrelation) -> Self {
        Self {
            correlation,
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Park a login attempt; the receiver resolves when a code is paired with it
    pub fn register(
        &self,
        state: impl Into<String>,
        verifier: Zeroizing<String>,
        started_at: DateTime<Utc>,
    ) -> oneshot::Receiver<AuthorizationGrant> {
        let (tx, rx) = oneshot::channel();
        let mut queue = self.queue.lock();
        queue.push_back(PendingLogin {
            state: state.into(),
            verifier,
            tx,
            started_at,
        });
        debug!("[OAuth] Login registered ({} pending)", queue.len());
        rx
    }

    /// Hand an authorization code to a pending login
    ///
    /// Logins whose waiter has gone away are discarded on the way. Returns
    /// how long the paired login had been waiting at `now`.
    pub fn resolve(
        &self,
        code: &str,
        state: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Duration, NoPendingLogin> {
        let mut queue = self.queue.lock();
        queue.retain(|login| !login.tx.is_closed());

        let index = match self.correlation {
            LoginCorrelation::Fifo => {
                if queue.is_empty() {
                    None
                } else {
                    Some(0)
                }
            }
            LoginCorrelation::State => {
                state.and_then(|state| queue.iter().position(|login| login.state == state))
            }
        };

        let login = match index.and_then(|i| queue.remove(i)) {
            Some(login) => login,
            None => {
                warn!(
                    "[OAuth] Authorization code arrived with no matching login ({:?} mode)",
                    self.correlation
                );
                return Err(NoPendingLogin);
            }
        };
        drop(queue);

        let waited = now.signed_duration_since(login.started_at);
        info!(
            "[OAuth] Authorization code paired with pending login (waited {}s)",
            waited.num_seconds()
        );

        let grant = AuthorizationGrant {
            code: code.to_string(),
            verifier: login.verifier,
        };
        // A waiter can still disappear between the retain above and here
        login.tx.send(grant).map_err(|_| NoPendingLogin)?;
        Ok(waited)
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
