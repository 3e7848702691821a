//! Server bootstrap
//!
//! Runs the startup phases in order:
//!
//! ```text
//! Idle -> HandlersInitializing -> TransportBinding -> TokenAcquiring -> Ready
//! ```
//!
//! In SSE mode the listener is bound during `TransportBinding` so the OAuth
//! callback can complete a delegated login while the token is acquired; the
//! MCP endpoints stay gated until `Ready`. In stdio mode the channel is only
//! handed to the engine once `Ready`.

use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use toolgate_core::{PhaseTransitionError, ServerConfig, ServerPhase, SessionId, TransportKind};

use crate::mcp::{ProtocolEngine, ToolError, ToolSet};
use crate::oauth::{AuthError, TokenBroker};
use crate::server::{AppState, GatewayConfig, GatewayServer};
use crate::session::{byte_stream_channel, stdio_channel, ChannelIo, SessionRegistry};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("tool handlers failed to initialize: {0}")]
    Handlers(#[from] ToolError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no credential available: {0}")]
    Credential(#[from] AuthError),

    #[error(transparent)]
    Phase(#[from] PhaseTransitionError),
}

pub struct Bootstrap {
    config: ServerConfig,
    broker: Arc<TokenBroker>,
    tools: Arc<dyn ToolSet>,
    engine: Arc<dyn ProtocolEngine>,
    registry: SessionRegistry,
    phase: watch::Sender<ServerPhase>,
    listener: Option<TcpListener>,
    stdio: Option<ChannelIo>,
}

impl Bootstrap {
    pub fn new(
        config: ServerConfig,
        broker: Arc<TokenBroker>,
        tools: Arc<dyn ToolSet>,
        engine: Arc<dyn ProtocolEngine>,
    ) -> Self {
        let (phase, _) = watch::channel(ServerPhase::Idle);
        Self {
            config,
            broker,
            tools,
            engine,
            registry: SessionRegistry::new(),
            phase,
            listener: None,
            stdio: None,
        }
    }

    /// Serve SSE on an already bound listener instead of binding the configured address
    pub fn with_listener(mut self, listener: TcpListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Use this byte stream pair instead of the process's stdin/stdout
    pub fn with_stdio<R, W>(mut self, reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        self.stdio = Some(byte_stream_channel(reader, writer));
        self
    }

    pub fn registry(&self) -> SessionRegistry {
        self.registry.clone()
    }

    pub fn phase(&self) -> ServerPhase {
        *self.phase.borrow()
    }

    /// Watch phase changes
    pub fn subscribe(&self) -> watch::Receiver<ServerPhase> {
        self.phase.subscribe()
    }

    fn transition(&self, next: ServerPhase) -> Result<(), PhaseTransitionError> {
        let current = self.phase();
        if !current.can_transition_to(next) {
            return Err(PhaseTransitionError {
                from: current,
                to: next,
            });
        }
        self.phase.send_replace(next);
        info!("[Bootstrap] {} -> {}", current, next);
        Ok(())
    }

    fn fail(&self, error: StartupError) -> StartupError {
        if !self.phase().is_terminal() {
            self.phase.send_replace(ServerPhase::Failed);
        }
        error!(event = "server_error", error = %error, "[Bootstrap] Startup failed");
        error
    }

    /// Start the server and run until `shutdown` resolves
    ///
    /// In stdio mode the server also stops when the input stream ends.
    pub async fn run<F>(mut self, shutdown: F) -> Result<(), StartupError>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        let transport = self.config.transport;
        let trust_model = self.config.identity.trust_model;

        info!(
            transport = %transport,
            trust_model = %trust_model,
            "[Bootstrap] Starting {} v{}",
            self.config.name,
            self.config.version
        );

        // HandlersInitializing
        self.transition(ServerPhase::HandlersInitializing)?;
        if let Err(e) = self.tools.initialize().await {
            return Err(self.fail(e.into()));
        }

        // TransportBinding
        self.transition(ServerPhase::TransportBinding)?;
        let listener_shutdown = CancellationToken::new();
        let mut stdio = None;
        let mut server_task = None;

        match transport {
            TransportKind::Stdio => {
                stdio = Some(self.stdio.take().unwrap_or_else(stdio_channel));
            }
            TransportKind::Sse => {
                let gateway = GatewayServer::new(
                    GatewayConfig::from(&self.config.sse),
                    AppState {
                        registry: self.registry.clone(),
                        engine: self.engine.clone(),
                        broker: self.broker.clone(),
                        base_path: self.config.sse.path.clone(),
                        phase: self.phase.subscribe(),
                    },
                );
                let listener = match self.listener.take() {
                    Some(listener) => listener,
                    None => match gateway.bind().await {
                        Ok(listener) => listener,
                        Err(source) => {
                            let addr = gateway.config().addr();
                            return Err(self.fail(StartupError::Bind { addr, source }));
                        }
                    },
                };
                server_task = Some(gateway.spawn(listener, listener_shutdown.clone()));
            }
        }

        // TokenAcquiring
        self.transition(ServerPhase::TokenAcquiring)?;
        let acquired = tokio::select! {
            result = self.broker.acquire(trust_model) => Some(result),
            _ = &mut shutdown => None,
        };
        match acquired {
            Some(Ok(_)) => info!("[Bootstrap] Credential acquired ({})", trust_model),
            Some(Err(e)) => {
                listener_shutdown.cancel();
                if let Some(task) = server_task {
                    let _ = task.await;
                }
                return Err(self.fail(e.into()));
            }
            None => {
                info!("[Bootstrap] Interrupted during startup");
                self.shutdown(listener_shutdown, server_task).await;
                return Ok(());
            }
        }

        // Ready
        self.transition(ServerPhase::Ready)?;
        info!(
            event = "server_started",
            transport = %transport,
            "[Bootstrap] Server ready"
        );

        match stdio {
            Some(channel) => {
                let session_id = SessionId::generate();
                let engine = self.engine.clone();
                let mut serving = tokio::spawn(async move { engine.serve(channel, session_id).await });
                tokio::select! {
                    _ = &mut shutdown => info!("[Bootstrap] Shutdown requested"),
                    result = &mut serving => match result {
                        Ok(Ok(())) => info!("[Bootstrap] Stdio channel closed"),
                        Ok(Err(e)) => warn!("[Bootstrap] Stdio session ended with error: {}", e),
                        Err(e) => warn!("[Bootstrap] Stdio session task failed: {}", e),
                    },
                }
            }
            None => {
                shutdown.await;
                info!("[Bootstrap] Shutdown requested");
            }
        }

        self.shutdown(listener_shutdown, server_task).await;
        Ok(())
    }

    async fn shutdown(
        &mut self,
        listener_shutdown: CancellationToken,
        server_task: Option<tokio::task::JoinHandle<()>>,
    ) {
        self.engine.close().await;
        let closed = self.registry.close_all();
        listener_shutdown.cancel();
        if let Some(task) = server_task {
            let _ = task.await;
        }
        // Errors here only mean the phase was already moved to Failed
        let _ = self.transition(ServerPhase::Idle);
        info!(
            event = "server_shutdown",
            sessions_closed = closed,
            "[Bootstrap] Server stopped"
        );
    }
}
