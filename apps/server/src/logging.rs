//! Tracing setup
//!
//! - Console: compact, on stderr (stdout carries the protocol in stdio mode)
//! - File: daily rotation in ~/.local/share/toolgate/logs/ (Linux)
//!   or %LOCALAPPDATA%/toolgate/logs/ (Windows)

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use toolgate_core::branding;

const DEFAULT_FILTER: &str =
    "info,toolgate_core=debug,toolgate_gateway=debug,toolgate_server=debug,rmcp=info";

pub fn logs_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(branding::APP_IDENTIFIER)
        .join("logs")
}

/// Initialize console and file logging
///
/// The returned guard flushes the file writer and must live until exit.
/// Without a writable log directory only the console layer is installed.
pub fn init_tracing() -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .compact()
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true);

    let logs_dir = logs_dir();
    let file_appender = std::fs::create_dir_all(&logs_dir)
        .map_err(|e| e.to_string())
        .and_then(|_| {
            // Files look like toolgate.2026-01-22.log
            RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(branding::LOG_PREFIX)
                .filename_suffix("log")
                .build(&logs_dir)
                .map_err(|e| e.to_string())
        });

    match file_appender {
        Ok(appender) => {
            let (non_blocking_file, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        Err(e) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .init();
            tracing::warn!(
                "File logging disabled, cannot write to {}: {}",
                logs_dir.display(),
                e
            );
            None
        }
    }
}
