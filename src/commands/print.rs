use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use super::{error_body, task_error, ApiError};
use crate::error::PrintError;
use crate::receipt_renderer::ReceiptData;
use crate::server::AppState;

fn receipt_body(payload: Result<Json<ReceiptData>, JsonRejection>) -> Result<ReceiptData, ApiError> {
    payload
        .map(|Json(receipt)| receipt)
        .map_err(|e| error_body(StatusCode::BAD_REQUEST, "InvalidReceipt", e.body_text()))
}

fn print_error(e: PrintError) -> ApiError {
    match e {
        PrintError::InvalidReceipt(msg) => error_body(StatusCode::BAD_REQUEST, "InvalidReceipt", msg),
        other => error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "PrintError",
            format!("Print failed: {other}"),
        ),
    }
}

/// POST /print/receipt
pub async fn print_receipt(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ReceiptData>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let receipt = receipt_body(payload)?;
    let printer = state.printer.clone();

    let outcome = tokio::task::spawn_blocking(move || printer.print(&receipt))
        .await
        .map_err(task_error)?
        .map_err(print_error)?;

    Ok(Json(json!({
        "status": "success",
        "message": outcome.message(),
        "printed": outcome.printed,
        "requested": outcome.requested,
        "files": outcome.files,
    })))
}

/// POST /print/preview
pub async fn print_preview(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ReceiptData>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = receipt_body(payload)?;
    let html = state.printer.preview(&receipt).map_err(print_error)?;
    Ok(([(header::CONTENT_TYPE, "text/html; charset=utf-8")], html))
}
