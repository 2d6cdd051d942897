//! Shared application state for the observer server.
//!
//! [`AppState`] holds the broadcast channel for [`ServerMessage`] frames
//! and the [`ObserverSnapshot`] that REST endpoints and newly connected
//! `WebSocket` clients read from.

use std::sync::Arc;

use cybermesh_core::operator::OperatorState;
use cybermesh_core::tick::{Simulation, TickFrame};
use cybermesh_mesh::CellSummary;
use cybermesh_types::{CellDelta, GridSnapshot, PassEdge, PassEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use ts_rs::TS;

/// Capacity of the broadcast channel for server frames.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
const BROADCAST_CAPACITY: usize = 256;

/// A frame pushed to `WebSocket` clients, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ServerMessage {
    /// The whole Life grid. Sent on connect and after a reset.
    FullState {
        /// Resets applied so far.
        epoch: u64,
        /// Ticks completed.
        tick: u64,
        /// Grid edge length.
        size: usize,
        /// `size` rows of `size` cells, 1 for alive.
        grid: Vec<Vec<u8>>,
    },
    /// Everything one tick changed: Life deltas and mesh pass edges.
    Tick {
        /// Resets applied before this tick.
        epoch: u64,
        /// Ticks completed, including this one.
        tick: u64,
        /// Life generation after the step.
        generation: u64,
        /// Life cells that flipped.
        deltas: Vec<CellDelta>,
        /// Payload moves, in sender order.
        edges: Vec<PassEdge>,
    },
}

impl ServerMessage {
    /// A `full_state` frame for `grid` at `tick` within reset `epoch`.
    pub fn full_state(epoch: u64, tick: u64, grid: &GridSnapshot) -> Self {
        Self::FullState {
            epoch,
            tick,
            size: grid.size(),
            grid: grid.rows(),
        }
    }

    /// The `tick` frame for one completed tick.
    pub fn from_frame(frame: &TickFrame) -> Self {
        Self::Tick {
            epoch: frame.epoch,
            tick: frame.tick,
            generation: frame.generation,
            deltas: frame.deltas.clone(),
            edges: frame.passes.iter().map(PassEvent::to_edge).collect(),
        }
    }

    /// The tick this frame describes.
    pub const fn tick(&self) -> u64 {
        match self {
            Self::FullState { tick, .. } | Self::Tick { tick, .. } => *tick,
        }
    }

    /// The reset epoch this frame belongs to.
    pub const fn epoch(&self) -> u64 {
        match self {
            Self::FullState { epoch, .. } | Self::Tick { epoch, .. } => *epoch,
        }
    }
}

/// In-memory copy of the simulation served by REST endpoints.
///
/// Refreshed by the engine after every tick and every applied operator
/// command.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObserverSnapshot {
    /// Resets applied so far.
    pub epoch: u64,
    /// Ticks completed.
    pub tick: u64,
    /// Life generation.
    pub generation: u64,
    /// Grid edge length.
    pub size: usize,
    /// Embedding dimension of the mesh.
    pub dim: usize,
    /// Life grid rows, 1 for alive.
    pub grid: Vec<Vec<u8>>,
    /// Live Life cells.
    pub live_cells: usize,
    /// Payloads waiting in the mesh.
    pub pending_payloads: usize,
    /// One summary per mesh cell, in index order.
    pub cells: Vec<CellSummary>,
    /// Most recent pass edges, newest first.
    pub recent_passes: Vec<PassEdge>,
}

impl ObserverSnapshot {
    /// Copy the observable parts of `simulation`, keeping at most
    /// `pass_limit` recent passes.
    pub fn capture(simulation: &Simulation, pass_limit: usize) -> Self {
        let grid = simulation.snapshot();
        let mesh = simulation.mesh();
        Self {
            epoch: simulation.epoch(),
            tick: simulation.tick(),
            generation: simulation.life().generation(),
            size: grid.size(),
            dim: mesh.dim(),
            grid: grid.rows(),
            live_cells: grid.live_count(),
            pending_payloads: mesh.pending_count(),
            cells: mesh.cell_summaries(),
            recent_passes: simulation
                .recent_passes(pass_limit)
                .iter()
                .map(PassEvent::to_edge)
                .collect(),
        }
    }

    /// The `full_state` frame for this snapshot.
    pub fn full_state(&self) -> ServerMessage {
        ServerMessage::FullState {
            epoch: self.epoch,
            tick: self.tick,
            size: self.size,
            grid: self.grid.clone(),
        }
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Broadcast sender for server frames.
    pub tx: broadcast::Sender<ServerMessage>,
    /// The current simulation snapshot.
    pub snapshot: Arc<RwLock<ObserverSnapshot>>,
    /// Shared operator control state (present when a tick loop runs).
    pub operator_state: Option<Arc<OperatorState>>,
}

impl AppState {
    /// Create a new application state with an empty snapshot and no
    /// operator control.
    pub fn new() -> Self {
        Self::build(ObserverSnapshot::default(), None)
    }

    /// Create a new application state with operator control attached.
    pub fn with_operator(snapshot: ObserverSnapshot, operator: Arc<OperatorState>) -> Self {
        Self::build(snapshot, Some(operator))
    }

    fn build(snapshot: ObserverSnapshot, operator_state: Option<Arc<OperatorState>>) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            snapshot: Arc::new(RwLock::new(snapshot)),
            operator_state,
        }
    }

    /// Subscribe to the frame broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.tx.subscribe()
    }

    /// Publish a frame to all connected clients.
    ///
    /// Returns the number of receivers that got the message, 0 when no
    /// client is connected.
    pub fn broadcast(&self, message: ServerMessage) -> usize {
        self.tx.send(message).unwrap_or(0)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
