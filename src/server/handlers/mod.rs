//! HTTP handlers for the server.

pub mod events;
pub mod history;
pub mod settings;
pub mod shows;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;

use crate::error::LabelError;
use crate::layout::LabelRequest;

use super::state::{AppState, PrintOutcome};

/// Print on a blocking thread; jobs are serialized by the state's print lock.
async fn print(state: Arc<AppState>, request: LabelRequest) -> Result<PrintOutcome, LabelError> {
    tokio::task::spawn_blocking(move || state.print_blocking(&request))
        .await
        .map_err(|e| LabelError::Transport(format!("Task error: {}", e)))?
}

/// 400 response for a request that cannot become a label.
fn rejected(error: &LabelError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "status": "rejected", "reason": error.to_string() })),
    )
        .into_response()
}

/// Response for a failed print. The win itself was still recorded.
fn print_failed(error: &LabelError) -> Response {
    tracing::error!(error = %error, "print failed");
    Json(json!({ "status": "print_failed", "reason": error.to_string() })).into_response()
}
