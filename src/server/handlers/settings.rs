//! Print switches, exclusions and status.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::super::state::AppState;

async fn set_printing(state: &AppState, enabled: bool) -> Json<Value> {
    let snapshot = {
        let mut desk = state.desk.lock().await;
        desk.settings.printing_enabled = enabled;
        state.snapshot(&desk)
    };
    state.persist(snapshot).await;
    tracing::info!(enabled, "printing switched");
    Json(json!({ "printing": enabled }))
}

/// Handle POST /pause
pub async fn pause(State(state): State<Arc<AppState>>) -> Json<Value> {
    set_printing(&state, false).await
}

/// Handle POST /resume
pub async fn resume(State(state): State<Arc<AppState>>) -> Json<Value> {
    set_printing(&state, true).await
}

/// Handle GET /status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let desk = state.desk.lock().await;
    let shows: BTreeMap<&String, Value> = desk
        .shows
        .iter()
        .map(|(id, show)| {
            let summary = json!({
                "name": show.name,
                "created": show.created,
                "ended": show.ended,
                "wins": show.history.len(),
            });
            (id, summary)
        })
        .collect();
    Json(json!({
        "printing": desk.settings.printing_enabled,
        "print_giveaways": desk.settings.print_giveaways,
        "exclusions": desk.settings.exclusions,
        "wins": desk.history().len(),
        "current_show": desk.current_show,
        "has_active_show": desk.current().is_some(),
        "shows": shows,
        "extension_active": state.extension_active(),
        "last_extension_heartbeat": state.last_heartbeat(),
        "device": state.config.label.printer.name,
        "font": if state.fonts.buyer.is_builtin() { "builtin" } else { "truetype" },
    }))
}

/// Handle POST /heartbeat - the browser extension is still connected.
pub async fn heartbeat(State(state): State<Arc<AppState>>) -> Json<Value> {
    let timestamp = state.heartbeat();
    tracing::debug!(timestamp, "extension heartbeat");
    Json(json!({ "status": "ok", "timestamp": timestamp }))
}

#[derive(Debug, Deserialize)]
pub struct ExclusionsForm {
    #[serde(default)]
    pub exclusions: Vec<String>,
}

/// Handle GET /exclusions
pub async fn exclusions(State(state): State<Arc<AppState>>) -> Json<Value> {
    let desk = state.desk.lock().await;
    Json(json!({ "exclusions": desk.settings.exclusions }))
}

/// Handle POST /exclusions - replace the exclusion list.
pub async fn set_exclusions(
    State(state): State<Arc<AppState>>,
    Json(form): Json<ExclusionsForm>,
) -> Json<Value> {
    let exclusions = form.exclusions;
    let snapshot = {
        let mut desk = state.desk.lock().await;
        desk.settings.exclusions = exclusions.clone();
        state.snapshot(&desk)
    };
    state.persist(snapshot).await;
    tracing::info!(exclusions = ?exclusions, "exclusions updated");
    Json(json!({ "status": "exclusions saved", "exclusions": exclusions }))
}

#[derive(Debug, Deserialize)]
pub struct GiveawaysForm {
    pub print_giveaways: bool,
}

/// Handle POST /toggle-giveaways
pub async fn toggle_giveaways(
    State(state): State<Arc<AppState>>,
    Json(form): Json<GiveawaysForm>,
) -> Json<Value> {
    let snapshot = {
        let mut desk = state.desk.lock().await;
        desk.settings.print_giveaways = form.print_giveaways;
        state.snapshot(&desk)
    };
    state.persist(snapshot).await;
    Json(json!({
        "status": "giveaway setting updated",
        "print_giveaways": form.print_giveaways,
    }))
}
