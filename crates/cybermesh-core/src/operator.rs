//! Operator control state for runtime simulation management.
//!
//! Shared between the tick loop and the observer's HTTP and WebSocket
//! handlers. The operator can pause, resume, change tick speed, queue a
//! Life reset or a payload injection, and request a clean stop, all
//! without stopping the process.
//!
//! # Architecture
//!
//! Flags and the tick interval are atomics so the tick loop reads them
//! without locking. Commands that mutate the simulation go through a
//! queue that the loop drains between ticks, so the simulation itself
//! is only ever touched by the loop.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};

use crate::config::SimulationBoundsConfig;

/// Smallest tick interval the operator may set, in milliseconds.
pub const MIN_TICK_INTERVAL_MS: u64 = 50;

/// Reason why the simulation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationEndReason {
    /// Reached the configured `max_ticks` limit.
    MaxTicksReached,
    /// Reached the configured `max_real_time_seconds` limit.
    MaxRealTimeReached,
    /// An operator issued a stop command.
    OperatorStop,
}

/// A payload injection requested by the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectRequest {
    /// Column of the target cell (wrapped onto the grid).
    pub x: usize,
    /// Row of the target cell (wrapped onto the grid).
    pub y: usize,
    /// Payload id. Generated when absent.
    #[serde(default)]
    pub payload_id: Option<String>,
    /// Explicit vector. Random when absent.
    #[serde(default)]
    pub vector: Option<Vec<f32>>,
    /// Norm of the random vector, ignored when `vector` is given.
    #[serde(default)]
    pub magnitude: Option<f32>,
}

/// A command applied by the tick loop before its next tick.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorCommand {
    /// Clear the Life grid and re-seed the configured pattern.
    Reset,
    /// Hold a new payload in the mesh.
    Inject(InjectRequest),
}

/// Shared operator control state.
///
/// Wrapped in an `Arc` and shared between the tick loop and the
/// observer handlers.
#[derive(Debug)]
pub struct OperatorState {
    /// Whether the simulation is currently paused.
    paused: AtomicBool,

    /// Wakes the tick loop on resume, stop, or a queued command.
    wake: Notify,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Current tick interval in milliseconds (runtime-adjustable).
    tick_interval_ms: AtomicU64,

    /// Wall-clock time when the simulation started.
    started_at: DateTime<Utc>,

    /// Maximum number of ticks (0 = unlimited).
    max_ticks: u64,

    /// Maximum wall-clock seconds (0 = unlimited).
    max_real_time_seconds: u64,

    /// Commands awaiting the tick loop.
    commands: Mutex<Vec<OperatorCommand>>,

    /// Reason the simulation ended, if it has.
    end_reason: Mutex<Option<SimulationEndReason>>,
}

impl OperatorState {
    /// Create a new operator state from configuration.
    pub fn new(tick_interval_ms: u64, bounds: &SimulationBoundsConfig) -> Self {
        Self {
            paused: AtomicBool::new(bounds.start_paused),
            wake: Notify::new(),
            stop_requested: AtomicBool::new(false),
            tick_interval_ms: AtomicU64::new(tick_interval_ms),
            started_at: Utc::now(),
            max_ticks: bounds.max_ticks,
            max_real_time_seconds: bounds.max_real_time_seconds,
            commands: Mutex::new(Vec::new()),
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Check whether the simulation is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause the simulation. The tick loop idles until resumed.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume the simulation and wake the tick loop.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.wake.notify_one();
    }

    /// Wait for the next resume, stop, or queued command.
    ///
    /// A wake-up issued while nobody is waiting is kept, so a signal sent
    /// between the loop's check and this call is not lost.
    pub async fn wait_for_wake(&self) {
        self.wake.notified().await;
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean simulation stop. Also wakes a paused loop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Record the reason the simulation ended.
    pub async fn set_end_reason(&self, reason: SimulationEndReason) {
        let mut guard = self.end_reason.lock().await;
        *guard = Some(reason);
    }

    /// Get the reason the simulation ended, if it has.
    pub async fn end_reason(&self) -> Option<SimulationEndReason> {
        self.end_reason.lock().await.clone()
    }

    // -----------------------------------------------------------------------
    // Tick Speed
    // -----------------------------------------------------------------------

    /// Get the current tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Acquire)
    }

    /// Set the tick interval in milliseconds.
    ///
    /// Returns the previous interval, or `None` if `ms` is below
    /// [`MIN_TICK_INTERVAL_MS`] and was rejected.
    pub fn set_tick_interval_ms(&self, ms: u64) -> Option<u64> {
        if ms < MIN_TICK_INTERVAL_MS {
            return None;
        }
        let prev = self.tick_interval_ms.swap(ms, Ordering::AcqRel);
        Some(prev)
    }

    // -----------------------------------------------------------------------
    // Boundaries
    // -----------------------------------------------------------------------

    /// Returns `true` if `max_ticks > 0` and `current_tick >= max_ticks`.
    pub const fn tick_limit_reached(&self, current_tick: u64) -> bool {
        self.max_ticks > 0 && current_tick >= self.max_ticks
    }

    /// Returns `true` if `max_real_time_seconds > 0` and at least that
    /// many seconds have passed since start.
    pub fn time_limit_reached(&self) -> bool {
        self.max_real_time_seconds > 0 && self.elapsed_seconds() >= self.max_real_time_seconds
    }

    /// Return the wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Return elapsed seconds since simulation start.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        // `num_seconds` can be negative if clocks are weird; treat as 0.
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    /// Get the configured max ticks.
    pub const fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Get the configured max real-time seconds.
    pub const fn max_real_time_seconds(&self) -> u64 {
        self.max_real_time_seconds
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Queue a command for the tick loop and wake it.
    pub async fn queue_command(&self, command: OperatorCommand) {
        self.commands.lock().await.push(command);
        self.wake.notify_one();
    }

    /// Drain all queued commands in arrival order.
    pub async fn drain_commands(&self) -> Vec<OperatorCommand> {
        let mut queue = self.commands.lock().await;
        std::mem::take(&mut *queue)
    }
}

/// JSON-serializable status of the simulation for the operator API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationStatus {
    /// Ticks completed.
    pub tick: u64,
    /// Current Life generation.
    pub generation: u64,
    /// Live Life cells.
    pub live_cells: usize,
    /// Payloads waiting in the mesh.
    pub pending_payloads: usize,
    /// Whether the simulation is paused.
    pub paused: bool,
    /// Whether a stop has been requested.
    pub stop_requested: bool,
    /// Current tick interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Elapsed wall-clock seconds since start.
    pub elapsed_seconds: u64,
    /// Configured maximum ticks (0 = unlimited).
    pub max_ticks: u64,
    /// Configured maximum real-time seconds (0 = unlimited).
    pub max_real_time_seconds: u64,
    /// The reason the simulation ended, if applicable.
    pub end_reason: Option<SimulationEndReason>,
    /// ISO 8601 timestamp of when the simulation started.
    pub started_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unbounded() -> SimulationBoundsConfig {
        SimulationBoundsConfig::default()
    }

    #[test]
    fn initial_state_is_running() {
        let state = OperatorState::new(500, &unbounded());
        assert!(!state.is_paused());
        assert!(!state.is_stop_requested());
    }

    #[test]
    fn start_paused_is_honored() {
        let bounds = SimulationBoundsConfig {
            start_paused: true,
            ..unbounded()
        };
        assert!(OperatorState::new(500, &bounds).is_paused());
    }

    #[test]
    fn pause_and_resume() {
        let state = OperatorState::new(500, &unbounded());
        state.pause();
        assert!(state.is_paused());
        state.resume();
        assert!(!state.is_paused());
    }

    #[test]
    fn set_tick_interval() {
        let state = OperatorState::new(500, &unbounded());
        assert_eq!(state.set_tick_interval_ms(250), Some(500));
        assert_eq!(state.tick_interval_ms(), 250);
    }

    #[test]
    fn reject_too_fast_interval() {
        let state = OperatorState::new(500, &unbounded());
        assert!(state.set_tick_interval_ms(MIN_TICK_INTERVAL_MS - 1).is_none());
        assert_eq!(state.tick_interval_ms(), 500);
    }

    #[test]
    fn zero_limits_mean_unlimited() {
        let state = OperatorState::new(500, &unbounded());
        assert!(!state.tick_limit_reached(1_000_000));
        assert!(!state.time_limit_reached());
    }

    #[test]
    fn tick_limit_reached() {
        let bounds = SimulationBoundsConfig {
            max_ticks: 10,
            ..unbounded()
        };
        let state = OperatorState::new(500, &bounds);
        assert!(!state.tick_limit_reached(9));
        assert!(state.tick_limit_reached(10));
    }

    #[tokio::test]
    async fn commands_drain_in_order() {
        let state = OperatorState::new(500, &unbounded());
        state.queue_command(OperatorCommand::Reset).await;
        state
            .queue_command(OperatorCommand::Inject(InjectRequest {
                x: 1,
                y: 2,
                payload_id: None,
                vector: None,
                magnitude: None,
            }))
            .await;
        let commands = state.drain_commands().await;
        assert_eq!(commands.len(), 2);
        assert_eq!(commands.first(), Some(&OperatorCommand::Reset));
        assert!(state.drain_commands().await.is_empty());
    }

    #[tokio::test]
    async fn stop_wakes_a_waiting_loop() {
        let state = std::sync::Arc::new(OperatorState::new(500, &unbounded()));
        state.pause();
        let waiter = {
            let state = std::sync::Arc::clone(&state);
            tokio::spawn(async move { state.wait_for_wake().await })
        };
        state.request_stop();
        let woke = tokio::time::timeout(std::time::Duration::from_secs(1), waiter).await;
        assert!(woke.is_ok());
    }

    #[test]
    fn inject_request_fields_are_optional() {
        let request: InjectRequest =
            serde_json::from_str(r#"{"x": 3, "y": 4}"#).unwrap_or(InjectRequest {
                x: 0,
                y: 0,
                payload_id: Some("fallback".to_owned()),
                vector: None,
                magnitude: None,
            });
        assert_eq!((request.x, request.y), (3, 4));
        assert!(request.payload_id.is_none());
    }
}
