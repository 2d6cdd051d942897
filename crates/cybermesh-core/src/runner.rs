//! Simulation loop runner with operator controls.
//!
//! This module provides [`run_simulation`], the top-level async function
//! that drives the tick loop with support for:
//!
//! - **Bounded simulation**: stop after `max_ticks` or `max_real_time_seconds`
//! - **Pause/resume**: the loop idles, still applying queued commands
//! - **Variable tick speed**: tick interval adjustable at runtime
//! - **Operator commands**: Life reset and payload injection between ticks
//! - **Operator stop**: clean stop via REST or WebSocket
//!
//! The runner wraps [`Simulation::run_tick`] and adds the control plane
//! around it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::operator::{OperatorCommand, OperatorState, SimulationEndReason};
use crate::tick::{Simulation, TickError, TickFrame};

/// Norm of operator-injected random payloads when none is given.
const DEFAULT_INJECT_MAGNITUDE: f32 = 1.0;

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick execution failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },
}

/// Result of the simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// The last tick frame, if any tick completed.
    pub final_frame: Option<TickFrame>,
    /// Total number of ticks executed by this run.
    pub total_ticks: u64,
}

/// Callback invoked by the loop after simulation state changes.
///
/// Implementations use this to update the observer snapshot and
/// broadcast frames.
pub trait TickCallback: Send {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, frame: &TickFrame, simulation: &Simulation);

    /// Called after an operator command changed the simulation outside a
    /// tick.
    fn on_command(&mut self, _applied: &AppliedCommand, _simulation: &Simulation) {}
}

/// An operator command the loop applied successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppliedCommand {
    /// The Life grid was cleared and re-seeded.
    Reset,
    /// A payload now waits in the mesh.
    Injected {
        /// Flat index of the holding cell.
        cell: usize,
        /// Id of the new payload.
        payload_id: String,
    },
}

/// A no-op tick callback for testing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _frame: &TickFrame, _simulation: &Simulation) {}
}

/// Run the simulation loop until a termination condition is met.
///
/// # Errors
///
/// Returns [`RunnerError`] if a tick fails. Rejected operator commands
/// are logged and skipped, not returned.
pub async fn run_simulation(
    simulation: &mut Simulation,
    operator: &Arc<OperatorState>,
    callback: &mut dyn TickCallback,
) -> Result<SimulationResult, RunnerError> {
    let mut last_frame: Option<TickFrame> = None;
    let mut total_ticks: u64 = 0;

    info!(
        max_ticks = operator.max_ticks(),
        max_real_time_seconds = operator.max_real_time_seconds(),
        tick_interval_ms = operator.tick_interval_ms(),
        "Simulation starting"
    );

    loop {
        // --- Idle while paused, still serving commands ---
        if operator.is_paused() {
            info!(tick = simulation.tick(), "Simulation paused, waiting for resume...");
            while operator.is_paused() && !operator.is_stop_requested() {
                apply_commands(simulation, operator, callback).await;
                operator.wait_for_wake().await;
            }
            info!(tick = simulation.tick(), "Simulation resumed");
        }

        // --- Check stop request (before tick) ---
        if operator.is_stop_requested() {
            info!("Operator stop requested");
            let result =
                finish(operator, SimulationEndReason::OperatorStop, last_frame, total_ticks).await;
            return Ok(result);
        }

        // --- Check time limit (before tick) ---
        if operator.time_limit_reached() {
            info!(
                max_seconds = operator.max_real_time_seconds(),
                elapsed = operator.elapsed_seconds(),
                "Real-time limit reached"
            );
            let result = finish(
                operator,
                SimulationEndReason::MaxRealTimeReached,
                last_frame,
                total_ticks,
            )
            .await;
            return Ok(result);
        }

        apply_commands(simulation, operator, callback).await;

        // --- Execute tick ---
        let started = Instant::now();
        let frame = simulation.run_tick()?;
        total_ticks = total_ticks.saturating_add(1);

        callback.on_tick(&frame, simulation);

        // --- Check tick limit (after tick) ---
        if operator.tick_limit_reached(frame.tick) {
            info!(
                tick = frame.tick,
                max_ticks = operator.max_ticks(),
                "Tick limit reached"
            );
            let result = finish(
                operator,
                SimulationEndReason::MaxTicksReached,
                Some(frame),
                total_ticks,
            )
            .await;
            return Ok(result);
        }

        let tick = frame.tick;
        last_frame = Some(frame);

        // --- Sleep for the rest of the interval ---
        let interval = Duration::from_millis(operator.tick_interval_ms());
        let elapsed = started.elapsed();
        match interval.checked_sub(elapsed) {
            Some(remaining) if !remaining.is_zero() => tokio::time::sleep(remaining).await,
            _ if interval.is_zero() => tokio::task::yield_now().await,
            _ => {
                warn!(
                    tick,
                    elapsed_ms = elapsed.as_millis(),
                    target_ms = interval.as_millis(),
                    "Tick exceeded its interval"
                );
            }
        }
    }
}

/// Apply every queued operator command, notifying the callback after
/// each one that changed the simulation.
async fn apply_commands(
    simulation: &mut Simulation,
    operator: &OperatorState,
    callback: &mut dyn TickCallback,
) {
    for command in operator.drain_commands().await {
        match command {
            OperatorCommand::Reset => {
                simulation.reset();
                callback.on_command(&AppliedCommand::Reset, simulation);
            }
            OperatorCommand::Inject(request) => {
                let id = request
                    .payload_id
                    .unwrap_or_else(|| format!("op-{}", uuid::Uuid::now_v7()));
                let magnitude = request.magnitude.unwrap_or(DEFAULT_INJECT_MAGNITUDE);
                match simulation.inject(request.x, request.y, request.vector, magnitude, id.clone())
                {
                    Ok(cell) => {
                        info!(payload_id = %id, cell, "Operator injected payload");
                        let applied = AppliedCommand::Injected { cell, payload_id: id };
                        callback.on_command(&applied, simulation);
                    }
                    Err(e) => {
                        warn!(payload_id = %id, x = request.x, y = request.y, error = %e, "Rejected operator injection");
                    }
                }
            }
        }
    }
}

async fn finish(
    operator: &OperatorState,
    reason: SimulationEndReason,
    final_frame: Option<TickFrame>,
    total_ticks: u64,
) -> SimulationResult {
    operator.set_end_reason(reason.clone()).await;
    SimulationResult {
        end_reason: reason,
        final_frame,
        total_ticks,
    }
}

/// Log the simulation end sequence.
///
/// Called after [`run_simulation`] returns. The observer keeps serving
/// the final state afterwards.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_frame.as_ref().map(|f| f.tick),
        final_live_cells = result.final_frame.as_ref().map(|f| f.live_cells),
        "Simulation ended"
    );

    if result.final_frame.is_none() {
        warn!("Simulation ended with no ticks executed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{SimulationBoundsConfig, SimulationConfig, StimulusConfig};
    use crate::operator::InjectRequest;

    fn simulation() -> Simulation {
        let mut config = SimulationConfig::default();
        config.mesh.embedding_dim = 16;
        config.stimulus = StimulusConfig {
            enabled: false,
            ..StimulusConfig::default()
        };
        Simulation::from_config(&config).unwrap()
    }

    fn operator(max_ticks: u64) -> Arc<OperatorState> {
        let bounds = SimulationBoundsConfig {
            max_ticks,
            ..SimulationBoundsConfig::default()
        };
        Arc::new(OperatorState::new(0, &bounds))
    }

    #[derive(Default)]
    struct Recorder {
        ticks: Vec<u64>,
        commands: u64,
        passes: usize,
    }

    impl TickCallback for Recorder {
        fn on_tick(&mut self, frame: &TickFrame, _simulation: &Simulation) {
            self.ticks.push(frame.tick);
            self.passes = self.passes.saturating_add(frame.passes.len());
        }

        fn on_command(&mut self, _applied: &AppliedCommand, _simulation: &Simulation) {
            self.commands = self.commands.saturating_add(1);
        }
    }

    #[tokio::test]
    async fn bounded_by_max_ticks() {
        let mut sim = simulation();
        let operator = operator(5);
        let result = run_simulation(&mut sim, &operator, &mut NoOpCallback)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::MaxTicksReached);
        assert_eq!(result.total_ticks, 5);
        assert_eq!(result.final_frame.map(|f| f.tick), Some(5));
        assert_eq!(
            operator.end_reason().await,
            Some(SimulationEndReason::MaxTicksReached)
        );
    }

    #[tokio::test]
    async fn operator_stop_before_first_tick() {
        let mut sim = simulation();
        let operator = operator(0);
        operator.request_stop();
        let result = run_simulation(&mut sim, &operator, &mut NoOpCallback)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::OperatorStop);
        assert_eq!(result.total_ticks, 0);
        assert!(result.final_frame.is_none());
    }

    #[tokio::test]
    async fn callback_sees_every_tick_in_order() {
        let mut sim = simulation();
        let operator = operator(3);
        let mut recorder = Recorder::default();
        let _ = run_simulation(&mut sim, &operator, &mut recorder)
            .await
            .unwrap();
        assert_eq!(recorder.ticks, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn queued_commands_apply_before_the_tick() {
        let mut sim = simulation();
        let operator = operator(1);
        operator
            .queue_command(OperatorCommand::Inject(InjectRequest {
                x: 4,
                y: 4,
                payload_id: Some("queued".to_owned()),
                vector: None,
                magnitude: None,
            }))
            .await;
        operator.queue_command(OperatorCommand::Reset).await;

        let mut recorder = Recorder::default();
        let result = run_simulation(&mut sim, &operator, &mut recorder)
            .await
            .unwrap();
        assert_eq!(recorder.commands, 2);
        assert_eq!(recorder.passes, 1);
        let frame = result.final_frame.unwrap();
        assert_eq!(frame.passes[0].payload_id.as_str(), "queued");
        // Reset put the generation back to 0 before the tick ran.
        assert_eq!(frame.generation, 1);
    }

    #[tokio::test]
    async fn rejected_injection_is_skipped() {
        let mut sim = simulation();
        let operator = operator(1);
        for _ in 0..2 {
            operator
                .queue_command(OperatorCommand::Inject(InjectRequest {
                    x: 0,
                    y: 0,
                    payload_id: None,
                    vector: None,
                    magnitude: None,
                }))
                .await;
        }
        let mut recorder = Recorder::default();
        let result = run_simulation(&mut sim, &operator, &mut recorder).await;
        assert!(result.is_ok());
        assert_eq!(recorder.commands, 1);
        assert_eq!(recorder.passes, 1);
    }

    #[tokio::test]
    async fn paused_loop_resumes_and_finishes() {
        let mut sim = simulation();
        let operator = operator(2);
        operator.pause();

        let control = Arc::clone(&operator);
        let resumer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            control.resume();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            run_simulation(&mut sim, &operator, &mut NoOpCallback),
        )
        .await;
        let _ = resumer.await;
        let result = result.unwrap().unwrap();
        assert_eq!(result.end_reason, SimulationEndReason::MaxTicksReached);
        assert_eq!(result.total_ticks, 2);
    }

    #[tokio::test]
    async fn stop_while_paused_ends_the_run() {
        let mut sim = simulation();
        let operator = operator(0);
        operator.pause();

        let control = Arc::clone(&operator);
        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            control.request_stop();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            run_simulation(&mut sim, &operator, &mut NoOpCallback),
        )
        .await;
        let _ = stopper.await;
        let result = result.unwrap().unwrap();
        assert_eq!(result.end_reason, SimulationEndReason::OperatorStop);
        assert_eq!(result.total_ticks, 0);
    }

    #[tokio::test]
    async fn reset_while_paused_is_applied_immediately() {
        let mut sim = simulation();
        for _ in 0..2 {
            sim.run_tick().unwrap();
        }
        let operator = operator(0);
        operator.pause();
        operator.queue_command(OperatorCommand::Reset).await;

        let control = Arc::clone(&operator);
        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            control.request_stop();
        });

        let mut recorder = Recorder::default();
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            run_simulation(&mut sim, &operator, &mut recorder),
        )
        .await;
        let _ = stopper.await;
        assert!(result.is_ok());
        assert_eq!(recorder.commands, 1);
        assert!(recorder.ticks.is_empty());
        assert_eq!(sim.life().generation(), 0);
    }
}
