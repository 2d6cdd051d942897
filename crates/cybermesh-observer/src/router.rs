//! Axum router construction for the observer server.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, operator, ws};

/// Build the complete Axum router for the observer server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws` -- `WebSocket` grid stream
/// - `GET /api/state`, `/api/mesh`, `/api/passes` -- snapshot reads
/// - `/api/operator/*` -- runtime control
///
/// CORS allows any origin so a dashboard served elsewhere can connect.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws", get(ws::ws_stream))
        // REST API
        .route("/api/state", get(handlers::get_state))
        .route("/api/mesh", get(handlers::get_mesh))
        .route("/api/passes", get(handlers::list_passes))
        // Operator
        .route("/api/operator/pause", post(operator::pause))
        .route("/api/operator/resume", post(operator::resume))
        .route("/api/operator/speed", post(operator::set_speed))
        .route("/api/operator/status", get(operator::status))
        .route("/api/operator/reset", post(operator::reset))
        .route("/api/operator/inject", post(operator::inject))
        .route("/api/operator/stop", post(operator::stop))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
