//! Win events, reprints and previews.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::job;
use crate::layout::LabelRequest;
use crate::render::to_png;

use super::super::state::{AppState, Decision, PrintOutcome, Win, WinKind};
use super::{print, print_failed, rejected};

/// A win reported by the event source.
#[derive(Debug, Deserialize)]
pub struct EventForm {
    #[serde(rename = "type")]
    pub kind: Option<WinKind>,
    pub name: Option<String>,
    pub item: Option<String>,
    pub price: Option<String>,
}

/// Label fields for reprints and previews.
#[derive(Debug, Deserialize)]
pub struct LabelForm {
    pub name: Option<String>,
    pub item: Option<String>,
    pub price: Option<String>,
}

impl LabelForm {
    fn to_request(&self) -> Result<LabelRequest, crate::LabelError> {
        LabelRequest::new(
            self.name.clone().unwrap_or_default(),
            self.item.clone().unwrap_or_default(),
            self.price.as_deref(),
        )
    }
}

/// Handle POST /event - record a win and print it if allowed.
pub async fn event(State(state): State<Arc<AppState>>, Json(form): Json<EventForm>) -> Response {
    let kind = form.kind.unwrap_or(WinKind::Sale);
    let request = match LabelRequest::new(
        form.name.unwrap_or_default(),
        form.item.unwrap_or_default(),
        form.price.as_deref(),
    ) {
        Ok(request) => request,
        Err(e) => return rejected(&e),
    };

    tracing::info!(
        kind = ?kind,
        name = %request.buyer,
        item = %request.item,
        price = request.price().unwrap_or("N/A"),
        "win event received"
    );

    let win = Win::new(kind, &request.buyer, &request.item, request.price());
    let (decision, snapshot) = {
        let mut desk = state.desk.lock().await;
        let decision = desk.accept(win);
        let snapshot = match decision {
            Decision::Duplicate | Decision::NoActiveShow => None,
            _ => state.snapshot(&desk),
        };
        (decision, snapshot)
    };
    state.persist(snapshot).await;

    match decision {
        Decision::Duplicate => {
            Json(json!({ "status": "duplicate", "reason": "Exact duplicate already exists" }))
                .into_response()
        }
        Decision::NoActiveShow => {
            tracing::warn!(name = %request.buyer, "no active show, win ignored");
            Json(json!({
                "status": "no_active_show",
                "reason": "No active show - create a new show to start printing",
            }))
            .into_response()
        }
        Decision::Excluded(reason) => {
            tracing::info!(item = %request.item, reason, "win not printed");
            Json(json!({ "status": "excluded", "reason": reason })).into_response()
        }
        Decision::Logged => {
            tracing::info!("printing paused, win logged but not printed");
            Json(json!({ "status": "ok", "printed": false })).into_response()
        }
        Decision::Print => match print(state, request).await {
            Ok(outcome) => Json(json!({
                "status": "ok",
                "printed": outcome == PrintOutcome::Printed,
            }))
            .into_response(),
            Err(e) => print_failed(&e),
        },
    }
}

/// Handle POST /reprint - print a label again without touching the history.
pub async fn reprint(State(state): State<Arc<AppState>>, Json(form): Json<LabelForm>) -> Response {
    let request = match form.to_request() {
        Ok(request) => request,
        Err(e) => return rejected(&e),
    };
    tracing::info!(name = %request.buyer, item = %request.item, "reprint requested");

    match print(state, request).await {
        Ok(outcome) => Json(json!({
            "status": "reprint sent",
            "printed": outcome == PrintOutcome::Printed,
        }))
        .into_response(),
        Err(e) => print_failed(&e),
    }
}

/// Handle GET /print-last - print the most recent win.
pub async fn print_last(State(state): State<Arc<AppState>>) -> Response {
    let last = state.desk.lock().await.history().back().cloned();
    let Some(win) = last else {
        return Json(json!({ "error": "none" })).into_response();
    };
    let request = match win.to_request() {
        Ok(request) => request,
        Err(e) => return rejected(&e),
    };

    match print(state, request).await {
        Ok(outcome) => Json(json!({
            "status": "printed",
            "printed": outcome == PrintOutcome::Printed,
        }))
        .into_response(),
        Err(e) => print_failed(&e),
    }
}

/// Handle GET /test-print - print a fixed sample label.
pub async fn test_print(State(state): State<Arc<AppState>>) -> Response {
    let request = match LabelRequest::new("Test User", "Test Print", None::<String>) {
        Ok(request) => request,
        Err(e) => return rejected(&e),
    };
    tracing::info!("test print requested");

    match print(state, request).await {
        Ok(_) => "OK".into_response(),
        Err(e) => print_failed(&e),
    }
}

/// Handle POST /preview - render the label as PNG.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Json(form): Json<LabelForm>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let request = form
        .to_request()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let png_bytes = tokio::task::spawn_blocking(move || {
        let (_, image) = job::render_request(&request, &state.config.label, &state.fonts)?;
        to_png(&image)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task error: {}", e)))?
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render preview: {}", e),
        )
    })?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png_bytes))
}
