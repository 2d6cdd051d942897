//! Tick callback that feeds the observer.
//!
//! After each tick, this callback refreshes the [`ObserverSnapshot`] and
//! broadcasts the tick's frame to all connected `WebSocket` clients. The
//! snapshot is always written before the frame is sent, which is what
//! lets a joining client line its greeting up with the frame stream. A
//! refresh skipped while a reader holds the snapshot leaves it one epoch
//! or tick behind, which the `WebSocket` handler detects and resyncs.

use std::sync::Arc;

use cybermesh_core::runner::{AppliedCommand, TickCallback};
use cybermesh_core::tick::{Simulation, TickFrame};
use cybermesh_observer::state::{AppState, ObserverSnapshot, ServerMessage};
use tracing::debug;

/// Callback that bridges the tick loop to the observer.
pub struct ObserverCallback {
    state: Arc<AppState>,
    pass_limit: usize,
}

impl ObserverCallback {
    /// Create a callback backed by `state`, keeping up to `pass_limit`
    /// recent passes in the snapshot.
    pub const fn new(state: Arc<AppState>, pass_limit: usize) -> Self {
        Self { state, pass_limit }
    }

    /// Replace the snapshot. Uses `try_write` so the tick loop never
    /// waits on a REST reader; a skipped refresh is caught up next time.
    fn refresh(&self, simulation: &Simulation) {
        if let Ok(mut snap) = self.state.snapshot.try_write() {
            *snap = ObserverSnapshot::capture(simulation, self.pass_limit);
        } else {
            debug!(tick = simulation.tick(), "Snapshot busy, refresh skipped");
        }
    }
}

impl TickCallback for ObserverCallback {
    fn on_tick(&mut self, frame: &TickFrame, simulation: &Simulation) {
        self.refresh(simulation);
        let receivers = self.state.broadcast(ServerMessage::from_frame(frame));
        debug!(tick = frame.tick, receivers, "Tick frame sent");
    }

    fn on_command(&mut self, applied: &AppliedCommand, simulation: &Simulation) {
        self.refresh(simulation);
        if *applied == AppliedCommand::Reset {
            let frame = ServerMessage::full_state(
                simulation.epoch(),
                simulation.tick(),
                &simulation.snapshot(),
            );
            let receivers = self.state.broadcast(frame);
            debug!(
                epoch = simulation.epoch(),
                tick = simulation.tick(),
                receivers,
                "Full state sent after reset"
            );
        }
    }
}
