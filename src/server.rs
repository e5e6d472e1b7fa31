//! HTTP surface of the bridge.
//!
//! Routes:
//! - `GET  /scanner/scan`    trigger a license scan
//! - `GET  /scanner/status`  last scan attempt summary
//! - `GET  /scanner/ports`   serial ports visible to the bridge
//! - `POST /print/receipt`   render and print a receipt
//! - `POST /print/preview`   render a receipt as HTML only
//! - `GET  /status`          liveness and version

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::commands;
use crate::config::BridgeConfig;
use crate::print::{ReceiptPrinter, SystemOpener};
use crate::scanner::Scanner;

/// Shared state behind every handler.
pub struct AppState {
    pub scanner: Arc<Scanner>,
    pub printer: Arc<ReceiptPrinter>,
    /// Present when scans are serialized; one exchange at a time.
    pub scan_lock: Option<Arc<tokio::sync::Mutex<()>>>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(scanner: Scanner, printer: ReceiptPrinter, serialize_scans: bool) -> Self {
        Self {
            scanner: Arc::new(scanner),
            printer: Arc::new(printer),
            scan_lock: serialize_scans.then(|| Arc::new(tokio::sync::Mutex::new(()))),
            started_at: Utc::now(),
        }
    }

    /// State wired to the real serial stack and OS print path.
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(
            Scanner::system(config.scanner.clone()),
            ReceiptPrinter::new(config.receipts_dir.clone(), Arc::new(SystemOpener)),
            config.serialize_scans,
        )
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/scanner/scan", get(commands::scanner::scanner_scan))
        .route("/scanner/status", get(commands::scanner::scanner_status))
        .route("/scanner/ports", get(commands::scanner::scanner_list_ports))
        .route("/print/receipt", post(commands::print::print_receipt))
        .route("/print/preview", post(commands::print::print_preview))
        .route("/status", get(commands::runtime::app_status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `config.listen_addr` and serve until the process exits.
pub async fn serve(config: BridgeConfig) -> std::io::Result<()> {
    let state = Arc::new(AppState::from_config(&config));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(
        addr = %config.listen_addr,
        receipts_dir = %config.receipts_dir.display(),
        port_override = ?config.scanner.port_override,
        "Scan bridge listening"
    );
    info!("Scanner endpoint: http://{}/scanner/scan", config.listen_addr);
    info!("Receipt endpoint: http://{}/print/receipt", config.listen_addr);

    axum::serve(listener, app).await
}
