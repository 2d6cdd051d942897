//! REST API endpoint handlers for the observer server.
//!
//! All handlers read from the in-memory [`ObserverSnapshot`] via the
//! shared [`AppState`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/state` | Life grid and counters |
//! | `GET` | `/api/mesh` | Per-cell mesh summaries (`?pending=true`) |
//! | `GET` | `/api/passes` | Recent pass edges, newest first (`?limit=N`) |
//!
//! [`ObserverSnapshot`]: crate::state::ObserverSnapshot

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse};

use crate::state::AppState;

/// Default number of passes returned by `GET /api/passes`.
const DEFAULT_PASS_LIMIT: usize = 100;

/// Upper bound on `limit` for `GET /api/passes`.
const MAX_PASS_LIMIT: usize = 1000;

/// Query parameters for the `GET /api/passes` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct PassesQuery {
    /// Maximum number of passes to return (default 100, max 1000).
    pub limit: Option<usize>,
}

/// Query parameters for the `GET /api/mesh` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct MeshQuery {
    /// Only return cells that currently hold a payload.
    #[serde(default)]
    pub pending: bool,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing server status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    let tick = snapshot.tick;
    let generation = snapshot.generation;
    let size = snapshot.size;
    let live_cells = snapshot.live_cells;
    let pending = snapshot.pending_payloads;
    drop(snapshot);

    let status = match &state.operator_state {
        None => "DETACHED",
        Some(op) if op.is_stop_requested() => "STOPPED",
        Some(op) if op.is_paused() => "PAUSED",
        Some(_) => "RUNNING",
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>CyberMesh Observer</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        a:hover {{ text-decoration: underline; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        .status {{ color: #3fb950; font-weight: bold; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>CyberMesh Observer</h1>
    <p class="subtitle">Conway Life grid with an embedding delta mesh</p>

    <p>Status: <span class="status">{status}</span></p>

    <div>
        <div class="metric">
            <div class="label">Tick</div>
            <div class="value">{tick}</div>
        </div>
        <div class="metric">
            <div class="label">Generation</div>
            <div class="value">{generation}</div>
        </div>
        <div class="metric">
            <div class="label">Grid</div>
            <div class="value">{size}x{size}</div>
        </div>
        <div class="metric">
            <div class="label">Live Cells</div>
            <div class="value">{live_cells}</div>
        </div>
        <div class="metric">
            <div class="label">Pending Payloads</div>
            <div class="value">{pending}</div>
        </div>
    </div>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li>GET <a href="/api/state">/api/state</a> -- Life grid and counters</li>
        <li>GET <a href="/api/mesh">/api/mesh</a> -- Mesh cell summaries (?pending=true)</li>
        <li>GET <a href="/api/passes">/api/passes</a> -- Recent payload passes (?limit=N)</li>
        <li>GET <a href="/api/operator/status">/api/operator/status</a> -- Run status</li>
        <li>POST /api/operator/{{pause,resume,speed,reset,inject,stop}}</li>
    </ul>

    <h2>WebSocket</h2>
    <ul>
        <li><code>ws://host:port/ws</code> -- full_state on connect, then one tick frame per tick.
        Send <code>start</code>, <code>stop</code> or <code>reset</code>.</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/state
// ---------------------------------------------------------------------------

/// Return the Life grid and its counters.
pub async fn get_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;

    Json(serde_json::json!({
        "epoch": snapshot.epoch,
        "tick": snapshot.tick,
        "generation": snapshot.generation,
        "size": snapshot.size,
        "grid": snapshot.grid,
        "live_cells": snapshot.live_cells,
        "pending_payloads": snapshot.pending_payloads,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/mesh
// ---------------------------------------------------------------------------

/// Return one summary per mesh cell, in index order.
pub async fn get_mesh(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MeshQuery>,
) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;

    let cells: Vec<_> = snapshot
        .cells
        .iter()
        .filter(|c| !params.pending || c.has_pending)
        .collect();

    Json(serde_json::json!({
        "tick": snapshot.tick,
        "size": snapshot.size,
        "dim": snapshot.dim,
        "pending_payloads": snapshot.pending_payloads,
        "count": cells.len(),
        "cells": cells,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/passes
// ---------------------------------------------------------------------------

/// Return the most recent pass edges, newest first.
///
/// # Query Parameters
///
/// - `limit`: Maximum number of passes to return (default 100, max 1000).
pub async fn list_passes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PassesQuery>,
) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;

    let limit = params
        .limit
        .unwrap_or(DEFAULT_PASS_LIMIT)
        .min(MAX_PASS_LIMIT);
    let passes: Vec<_> = snapshot.recent_passes.iter().take(limit).collect();

    Json(serde_json::json!({
        "count": passes.len(),
        "passes": passes,
    }))
}
