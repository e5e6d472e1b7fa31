use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::diagnostics;
use crate::server::AppState;

/// GET /status
pub async fn app_status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let about = diagnostics::get_about_info();
    Json(json!({
        "status": "ok",
        "version": about["version"],
        "platform": about["platform"],
        "about": about,
        "receiptsDir": state.printer.receipts_dir().display().to_string(),
        "startedAt": state.started_at,
        "uptimeSecs": (Utc::now() - state.started_at).num_seconds(),
        "time": Utc::now().to_rfc3339(),
    }))
}
