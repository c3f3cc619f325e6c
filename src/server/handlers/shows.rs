//! Show lifecycle: create, switch, end and delete.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateShowForm {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ShowIdForm {
    #[serde(rename = "showId", default)]
    pub show_id: String,
}

fn refused(reason: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": reason }))).into_response()
}

/// Handle POST /create-show
pub async fn create_show(
    State(state): State<Arc<AppState>>,
    Json(form): Json<CreateShowForm>,
) -> Response {
    let (created, snapshot) = {
        let mut desk = state.desk.lock().await;
        let created = desk
            .create_show(&form.name)
            .map(|id| (desk.shows.get(&id).cloned(), id));
        let snapshot = created.is_ok().then(|| state.snapshot(&desk)).flatten();
        (created, snapshot)
    };
    state.persist(snapshot).await;

    match created {
        Ok((show, id)) => {
            tracing::info!(show = %id, "show created");
            Json(json!({ "status": "show created", "showId": id, "show": show })).into_response()
        }
        Err(reason) => refused(reason),
    }
}

/// Handle POST /switch-show
pub async fn switch_show(
    State(state): State<Arc<AppState>>,
    Json(form): Json<ShowIdForm>,
) -> Response {
    let (switched, snapshot) = {
        let mut desk = state.desk.lock().await;
        let switched = desk.switch_show(&form.show_id);
        let snapshot = switched.is_ok().then(|| state.snapshot(&desk)).flatten();
        (switched, snapshot)
    };
    state.persist(snapshot).await;

    match switched {
        Ok(()) => {
            tracing::info!(show = %form.show_id, "show switched");
            Json(json!({ "status": "show switched", "current_show": form.show_id }))
                .into_response()
        }
        Err(reason) => refused(reason),
    }
}

/// Handle POST /end-show - stop recording wins until a show is picked.
pub async fn end_show(State(state): State<Arc<AppState>>) -> Response {
    let (ended, snapshot) = {
        let mut desk = state.desk.lock().await;
        let ended = desk.end_show();
        let snapshot = ended.is_ok().then(|| state.snapshot(&desk)).flatten();
        (ended, snapshot)
    };
    state.persist(snapshot).await;

    match ended {
        Ok(id) => {
            tracing::info!(show = %id, "show ended");
            Json(json!({ "status": "show ended", "showId": id })).into_response()
        }
        Err(reason) => refused(reason),
    }
}

/// Handle POST /delete-show
pub async fn delete_show(
    State(state): State<Arc<AppState>>,
    Json(form): Json<ShowIdForm>,
) -> Response {
    let (deleted, snapshot) = {
        let mut desk = state.desk.lock().await;
        let deleted = desk.delete_show(&form.show_id);
        let snapshot = deleted.is_ok().then(|| state.snapshot(&desk)).flatten();
        (deleted, snapshot)
    };
    state.persist(snapshot).await;

    match deleted {
        Ok(()) => {
            tracing::info!(show = %form.show_id, "show deleted");
            Json(json!({ "status": "show deleted", "showId": form.show_id })).into_response()
        }
        Err(reason) => refused(reason),
    }
}
