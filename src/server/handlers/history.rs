//! Win history queries.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use super::super::state::{AppState, Win};

/// Handle GET /ping
pub async fn ping() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "time": chrono::Local::now().format("%H:%M:%S").to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct RecentWin {
    #[serde(flatten)]
    pub win: Win,
    /// Seconds since the win
    pub time_ago: i64,
}

/// Handle GET /recent-wins - wins of the running show, newest first.
pub async fn recent_wins(State(state): State<Arc<AppState>>) -> Json<Vec<RecentWin>> {
    let now = chrono::Utc::now().timestamp_millis();
    let desk = state.desk.lock().await;
    let wins = desk
        .history()
        .iter()
        .rev()
        .map(|win| RecentWin {
            win: win.clone(),
            time_ago: (now - win.timestamp) / 1000,
        })
        .collect();
    Json(wins)
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Handle GET /search?q=
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<Win>> {
    let desk = state.desk.lock().await;
    Json(desk.search(query.q.as_deref().unwrap_or("")))
}

/// Handle POST /reset - forget the wins of the running show.
pub async fn reset(State(state): State<Arc<AppState>>) -> Json<Value> {
    let snapshot = {
        let mut desk = state.desk.lock().await;
        desk.clear_history();
        state.snapshot(&desk)
    };
    state.persist(snapshot).await;
    tracing::info!("win history cleared");
    Json(json!({ "status": "reset complete" }))
}
