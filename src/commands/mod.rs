//! HTTP handlers, grouped by concern.

pub mod print;
pub mod runtime;
pub mod scanner;

use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

pub(crate) type ApiError = (StatusCode, Json<Value>);

pub(crate) fn error_body(status: StatusCode, kind: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(json!({
            "status": "error",
            "kind": kind,
            "message": message.into(),
        })),
    )
}

pub(crate) fn task_error(e: tokio::task::JoinError) -> ApiError {
    error_body(
        StatusCode::INTERNAL_SERVER_ERROR,
        "TaskError",
        format!("Task error: {e}"),
    )
}
