//! Toolgate server binary
//!
//! Reads configuration from the environment (and `.env`), then runs the
//! bootstrap until Ctrl-C, SIGTERM, or end of stdin in stdio mode.

mod logging;

use anyhow::Context;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

use toolgate_core::{branding, ServerConfig, SystemClock};
use toolgate_gateway::{
    Bootstrap, BrowserPresenter, BuiltinToolSet, HttpIdentityProvider, RmcpEngine, TokenBroker,
    ToolSet,
};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _log_guard = logging::init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("[{}] {:#}", branding::DISPLAY_NAME, e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("invalid configuration")?;

    let broker = Arc::new(TokenBroker::new(
        config.identity.clone(),
        Arc::new(HttpIdentityProvider::new()),
        Arc::new(BrowserPresenter),
        Arc::new(SystemClock),
    ));
    let tools: Arc<dyn ToolSet> = Arc::new(BuiltinToolSet::new(config.downstream_url.clone()));
    let engine = Arc::new(RmcpEngine::new(
        tools.clone(),
        broker.clone(),
        config.identity.trust_model,
        &config.name,
        &config.version,
    ));

    Bootstrap::new(config, broker, tools, engine)
        .run(shutdown_signal())
        .await?;

    info!("[{}] Exiting", branding::DISPLAY_NAME);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
