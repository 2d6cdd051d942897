//! Operator REST API handlers for runtime simulation control.
//!
//! Flags (pause, stop, speed) take effect on the tick loop's next check.
//! Reset and inject are queued and applied by the loop between ticks,
//! so they never interleave with a running tick.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/operator/pause` | Pause the tick loop |
//! | `POST` | `/api/operator/resume` | Resume the tick loop |
//! | `POST` | `/api/operator/speed` | Set tick interval (ms) |
//! | `GET` | `/api/operator/status` | Current simulation status |
//! | `POST` | `/api/operator/reset` | Re-seed the Life grid |
//! | `POST` | `/api/operator/inject` | Queue a payload injection |
//! | `POST` | `/api/operator/stop` | End the run, keep serving |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use cybermesh_core::operator::{
    InjectRequest, MIN_TICK_INTERVAL_MS, OperatorCommand, OperatorState, SimulationStatus,
};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/operator/speed`.
#[derive(Debug, serde::Deserialize)]
pub struct SetSpeedRequest {
    /// New tick interval in milliseconds (minimum 50).
    pub tick_interval_ms: u64,
}

/// Generic success response.
#[derive(Debug, serde::Serialize)]
struct OperatorResponse {
    /// Whether the operation succeeded.
    ok: bool,
    /// Human-readable message.
    message: String,
}

impl OperatorResponse {
    fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            ok: true,
            message: message.into(),
        })
    }
}

fn operator(state: &AppState) -> Result<&Arc<OperatorState>, ObserverError> {
    state
        .operator_state
        .as_ref()
        .ok_or(ObserverError::OperatorUnavailable)
}

// ---------------------------------------------------------------------------
// POST /api/operator/pause
// ---------------------------------------------------------------------------

/// Pause the simulation tick loop. Queued commands are still applied
/// while paused.
pub async fn pause(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.pause();
    Ok(OperatorResponse::ok("Simulation paused"))
}

// ---------------------------------------------------------------------------
// POST /api/operator/resume
// ---------------------------------------------------------------------------

/// Resume the simulation tick loop after a pause.
pub async fn resume(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.resume();
    Ok(OperatorResponse::ok("Simulation resumed"))
}

// ---------------------------------------------------------------------------
// POST /api/operator/speed
// ---------------------------------------------------------------------------

/// Change the tick interval at runtime.
///
/// The new interval takes effect at the end of the current tick.
pub async fn set_speed(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetSpeedRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let operator = operator(&state)?;

    operator.set_tick_interval_ms(body.tick_interval_ms).map_or_else(
        || {
            Err(ObserverError::InvalidRequest(format!(
                "tick_interval_ms must be at least {MIN_TICK_INTERVAL_MS}"
            )))
        },
        |prev| {
            Ok(Json(serde_json::json!({
                "ok": true,
                "message": format!("Tick interval changed from {}ms to {}ms", prev, body.tick_interval_ms),
                "previous_interval_ms": prev,
                "new_interval_ms": body.tick_interval_ms,
            })))
        },
    )
}

// ---------------------------------------------------------------------------
// GET /api/operator/status
// ---------------------------------------------------------------------------

/// Return the current simulation status including tick, counters,
/// pause state, speed, and run bounds.
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let operator = operator(&state)?;

    let (tick, generation, live_cells, pending_payloads) = {
        let snapshot = state.snapshot.read().await;
        (
            snapshot.tick,
            snapshot.generation,
            snapshot.live_cells,
            snapshot.pending_payloads,
        )
    };

    let status = SimulationStatus {
        tick,
        generation,
        live_cells,
        pending_payloads,
        paused: operator.is_paused(),
        stop_requested: operator.is_stop_requested(),
        tick_interval_ms: operator.tick_interval_ms(),
        elapsed_seconds: operator.elapsed_seconds(),
        max_ticks: operator.max_ticks(),
        max_real_time_seconds: operator.max_real_time_seconds(),
        end_reason: operator.end_reason().await,
        started_at: operator.started_at().to_rfc3339(),
    };

    Ok(Json(status))
}

// ---------------------------------------------------------------------------
// POST /api/operator/reset
// ---------------------------------------------------------------------------

/// Queue a Life reset. Connected clients receive a new `full_state`
/// frame once the loop applies it.
pub async fn reset(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?
        .queue_command(OperatorCommand::Reset)
        .await;
    Ok(OperatorResponse::ok("Reset queued"))
}

// ---------------------------------------------------------------------------
// POST /api/operator/inject
// ---------------------------------------------------------------------------

/// Queue a payload injection at `(x, y)`.
///
/// The vector, when given, must match the mesh dimension and be finite.
/// An injection into a cell that already holds a payload is rejected
/// by the tick loop and logged.
pub async fn inject(
    State(state): State<Arc<AppState>>,
    Json(body): Json<InjectRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let operator = operator(&state)?;

    let dim = state.snapshot.read().await.dim;
    if let Some(vector) = &body.vector {
        if vector.len() != dim {
            return Err(ObserverError::InvalidRequest(format!(
                "vector has {} components, the mesh expects {dim}",
                vector.len()
            )));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(ObserverError::InvalidRequest(
                "vector components must be finite".to_owned(),
            ));
        }
    }
    if body.magnitude.is_some_and(|m| !m.is_finite() || m <= 0.0) {
        return Err(ObserverError::InvalidRequest(
            "magnitude must be finite and positive".to_owned(),
        ));
    }

    let message = format!("Injection at ({}, {}) queued", body.x, body.y);
    operator
        .queue_command(OperatorCommand::Inject(body))
        .await;
    Ok(OperatorResponse::ok(message))
}

// ---------------------------------------------------------------------------
// POST /api/operator/stop
// ---------------------------------------------------------------------------

/// End the run after the current tick.
///
/// The HTTP server keeps running so the final state stays queryable.
pub async fn stop(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.request_stop();
    Ok(OperatorResponse::ok(
        "Stop requested -- simulation will end after current tick",
    ))
}
