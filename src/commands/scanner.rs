use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use super::{error_body, task_error, ApiError};
use crate::scanner::ScannerStatus;
use crate::serial::{self, PortInfo};
use crate::server::AppState;

/// GET /scanner/scan
///
/// Success carries `licenseData`. A record with neither name nor license
/// number comes back as a warning with the raw payload for troubleshooting.
pub async fn scanner_scan(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    // The guard moves into the blocking task so the port stays reserved
    // even if the caller disconnects mid-exchange.
    let guard = match &state.scan_lock {
        Some(lock) => Some(lock.clone().lock_owned().await),
        None => None,
    };

    let scanner = state.scanner.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        scanner.scan_detailed()
    })
        .await
        .map_err(task_error)?
        .map_err(|e| error_body(StatusCode::INTERNAL_SERVER_ERROR, e.kind(), e.to_string()))?;

    if outcome.record.lacks_identity() {
        return Ok(Json(json!({
            "status": "warning",
            "message": "Scan returned no name or license number",
            "licenseData": outcome.record,
            "rawResponse": outcome.raw,
            "unrecognizedTags": outcome.unrecognized_tags,
        })));
    }

    Ok(Json(json!({
        "status": "success",
        "licenseData": outcome.record,
    })))
}

/// GET /scanner/status
pub async fn scanner_status(State(state): State<Arc<AppState>>) -> Json<ScannerStatus> {
    Json(state.scanner.status())
}

/// GET /scanner/ports
pub async fn scanner_list_ports() -> Result<Json<Vec<PortInfo>>, ApiError> {
    tokio::task::spawn_blocking(serial::list_ports)
        .await
        .map_err(task_error)?
        .map(Json)
        .map_err(|e| error_body(StatusCode::INTERNAL_SERVER_ERROR, e.kind(), e.to_string()))
}
