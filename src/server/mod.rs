//! # HTTP Server for Win Labels
//!
//! Receives win events from the auction feed, keeps a short history per
//! show and prints a label for each accepted win.
//!
//! ## Usage
//!
//! ```bash
//! miracle-label serve --listen 127.0.0.1:7777 --device /dev/usb/lp0
//! ```
//!
//! ## Routes
//!
//! | Route | Description |
//! |-------|-------------|
//! | `POST /event` | Record a win, print if allowed |
//! | `POST /reprint` | Print a label again |
//! | `GET /print-last` | Print the most recent win |
//! | `GET /test-print` | Print a sample label |
//! | `POST /preview` | Render a label as PNG |
//! | `POST /pause`, `POST /resume` | Switch printing off and on |
//! | `GET /status` | Current switches, shows and extension state |
//! | `POST /heartbeat` | Browser extension keep-alive |
//! | `POST /create-show`, `POST /switch-show` | Start or pick a show |
//! | `POST /end-show`, `POST /delete-show` | Finish or drop a show |
//! | `GET/POST /exclusions` | Item filters |
//! | `POST /toggle-giveaways` | Print giveaways or not |
//! | `GET /recent-wins`, `GET /search?q=` | History |
//! | `POST /reset` | Clear the running show's history |
//! | `GET /ping` | Liveness |

mod handlers;
mod state;

pub use state::{
    AppState, Connector, Decision, Desk, PrintOutcome, ServerConfig, Settings, Show, Snapshot,
    Win, WinKind, device_connector, show_id,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::LabelError;

/// Build the router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Wins
        .route("/event", post(handlers::events::event))
        .route("/reprint", post(handlers::events::reprint))
        .route("/print-last", get(handlers::events::print_last))
        .route("/test-print", get(handlers::events::test_print))
        .route("/preview", post(handlers::events::preview))
        // Shows
        .route("/create-show", post(handlers::shows::create_show))
        .route("/switch-show", post(handlers::shows::switch_show))
        .route("/end-show", post(handlers::shows::end_show))
        .route("/delete-show", post(handlers::shows::delete_show))
        // Switches
        .route("/pause", post(handlers::settings::pause))
        .route("/resume", post(handlers::settings::resume))
        .route("/status", get(handlers::settings::status))
        .route("/heartbeat", post(handlers::settings::heartbeat))
        .route(
            "/exclusions",
            get(handlers::settings::exclusions).post(handlers::settings::set_exclusions),
        )
        .route(
            "/toggle-giveaways",
            post(handlers::settings::toggle_giveaways),
        )
        // History
        .route("/ping", get(handlers::history::ping))
        .route("/recent-wins", get(handlers::history::recent_wins))
        .route("/search", get(handlers::history::search))
        .route("/reset", post(handlers::history::reset))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use miracle_label::config::LabelConfig;
/// use miracle_label::server::{serve, ServerConfig};
///
/// # async fn example() -> Result<(), miracle_label::LabelError> {
/// let config = ServerConfig {
///     listen_addr: "127.0.0.1:7777".to_string(),
///     label: LabelConfig::m221(),
///     state_path: None,
/// };
///
/// serve(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig) -> Result<(), LabelError> {
    let listen_addr = config.listen_addr.clone();
    let device = config.label.printer.name.clone();
    let app_state = Arc::new(AppState::new(config));
    let app = router(app_state);

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .map_err(|e| LabelError::Transport(format!("Failed to bind to {}: {}", listen_addr, e)))?;

    tracing::info!(listen = %listen_addr, device = %device, "label server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| LabelError::Transport(format!("Server error: {}", e)))?;

    Ok(())
}
