//! Scan Bridge - local HTTP bridge for a serial AAMVA license scanner and
//! HTML receipt printing.
//!
//! The browser-side POS calls this process on localhost: `GET /scanner/scan`
//! triggers a single framed exchange with the scanner and returns decoded
//! license fields, `POST /print/receipt` renders a receipt and hands it to
//! the OS print path.

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod aamva;
mod commands;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod locator;
pub mod magstripe;
pub mod print;
pub mod receipt_renderer;
pub mod scanner;
pub mod serial;
pub mod server;
pub mod session;
pub mod transport;

pub use config::BridgeConfig;
pub use error::{PrintError, ScanError};
pub use scanner::Scanner;

pub async fn run() -> anyhow::Result<()> {
    // Initialize structured logging (console + rolling file)
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,scan_bridge_lib=debug"));

    let log_dir = diagnostics::get_log_dir();
    diagnostics::prune_old_logs(&log_dir);
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&log_dir, diagnostics::LOG_FILE_PREFIX);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    // Flushes on drop; the bridge runs until process exit.
    std::mem::forget(_guard);

    info!("Starting Scan Bridge v{}", env!("CARGO_PKG_VERSION"));

    let config = BridgeConfig::from_env();
    server::serve(config).await?;
    Ok(())
}
