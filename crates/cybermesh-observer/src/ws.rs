//! `WebSocket` handler for the live grid stream.
//!
//! Clients connect to `GET /ws` and first receive a `full_state` frame
//! built from the current snapshot. After that they receive one `tick`
//! frame per tick and a fresh `full_state` after every reset. A client
//! that applies the frames in order always holds the engine's grid.
//!
//! Every frame carries the reset epoch next to the tick. If a client
//! falls behind, or joins on a snapshot that missed a tick or a reset,
//! the mismatch shows up in those two numbers and the client is resynced
//! with a new `full_state` frame.
//!
//! Clients may send the text commands `start`, `stop` and `reset`.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use cybermesh_core::operator::OperatorCommand;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::error::ObserverError;
use crate::state::{AppState, ServerMessage};

/// A text command sent by a `WebSocket` client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    /// Resume the tick loop.
    Start,
    /// Pause the tick loop.
    Stop,
    /// Clear the Life grid and re-seed the configured pattern.
    Reset,
}

impl ClientCommand {
    /// Parse a command, ignoring case and surrounding whitespace.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

/// Forward a client command to the operator state.
///
/// # Errors
///
/// Returns [`ObserverError::OperatorUnavailable`] when no tick loop is
/// attached.
pub async fn apply_client_command(
    state: &AppState,
    command: ClientCommand,
) -> Result<(), ObserverError> {
    let operator = state
        .operator_state
        .as_ref()
        .ok_or(ObserverError::OperatorUnavailable)?;

    match command {
        ClientCommand::Start => operator.resume(),
        ClientCommand::Stop => operator.pause(),
        ClientCommand::Reset => operator.queue_command(OperatorCommand::Reset).await,
    }
    info!(?command, "WebSocket client command");
    Ok(())
}

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming frames.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_stream(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// What to do with a broadcast frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Send it; it continues the client's grid.
    Forward,
    /// Drop it; the client already holds a newer state.
    Skip,
    /// The client's grid cannot absorb it; send a fresh `full_state`.
    Resync,
}

/// The grid version a client holds: reset epoch and tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPoint {
    /// Resets applied to the held grid.
    pub epoch: u64,
    /// Ticks applied to the held grid.
    pub tick: u64,
}

impl SyncPoint {
    /// The version a client holds after applying `frame`.
    pub const fn of(frame: &ServerMessage) -> Self {
        Self {
            epoch: frame.epoch(),
            tick: frame.tick(),
        }
    }

    /// Decide what to do with `frame`. A `full_state` always replaces the
    /// grid; a `tick` frame applies only on top of the tick right before
    /// it within the same epoch.
    pub fn delivery(self, frame: &ServerMessage) -> Delivery {
        match frame {
            ServerMessage::FullState { .. } => Delivery::Forward,
            ServerMessage::Tick { epoch, tick, .. } => {
                if *epoch < self.epoch || (*epoch == self.epoch && *tick <= self.tick) {
                    Delivery::Skip
                } else if *epoch == self.epoch && self.tick.checked_add(1) == Some(*tick) {
                    Delivery::Forward
                } else {
                    Delivery::Resync
                }
            }
        }
    }
}

/// Send one frame. Returns `false` once the client is gone.
async fn send_frame(socket: &mut WebSocket, frame: &ServerMessage) -> bool {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize frame: {e}");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}

/// Handle the `WebSocket` lifecycle: greet with the full state, then
/// forward broadcast frames and apply client commands.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("WebSocket client connected");

    // Subscribe under the read lock so no frame falls between the
    // greeting and the first received frame.
    let (mut rx, greeting) = {
        let snapshot = state.snapshot.read().await;
        (state.subscribe(), snapshot.full_state())
    };
    let mut synced = SyncPoint::of(&greeting);
    if !send_frame(&mut socket, &greeting).await {
        debug!("WebSocket client disconnected (send failed)");
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                let frame = match result {
                    Ok(frame) => frame,
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "WebSocket client lagged, will resync");
                        continue;
                    }
                    Err(RecvError::Closed) => {
                        debug!("Broadcast channel closed, shutting down WebSocket");
                        return;
                    }
                };

                let mut action = synced.delivery(&frame);
                if action == Delivery::Resync {
                    let full = state.snapshot.read().await.full_state();
                    debug!(
                        from_epoch = synced.epoch,
                        from_tick = synced.tick,
                        to_epoch = full.epoch(),
                        to_tick = full.tick(),
                        "Resyncing WebSocket client"
                    );
                    synced = SyncPoint::of(&full);
                    if !send_frame(&mut socket, &full).await {
                        debug!("WebSocket client disconnected (send failed)");
                        return;
                    }
                    action = synced.delivery(&frame);
                }
                if action == Delivery::Forward {
                    synced = SyncPoint::of(&frame);
                    if !send_frame(&mut socket, &frame).await {
                        debug!("WebSocket client disconnected (send failed)");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Text(text))) => {
                        match ClientCommand::parse(text.as_str()) {
                            Some(command) => {
                                if let Err(e) = apply_client_command(&state, command).await {
                                    warn!(?command, error = %e, "WebSocket command ignored");
                                }
                            }
                            None => debug!(text = text.as_str(), "Unknown WebSocket command"),
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cybermesh_core::config::SimulationBoundsConfig;
    use cybermesh_core::operator::OperatorState;
    use cybermesh_types::GridSnapshot;

    use super::*;
    use crate::state::ObserverSnapshot;

    fn tick(epoch: u64, tick: u64) -> ServerMessage {
        ServerMessage::Tick {
            epoch,
            tick,
            generation: tick,
            deltas: Vec::new(),
            edges: Vec::new(),
        }
    }

    #[test]
    fn commands_parse_loosely() {
        assert_eq!(ClientCommand::parse("reset"), Some(ClientCommand::Reset));
        assert_eq!(ClientCommand::parse(" START\n"), Some(ClientCommand::Start));
        assert_eq!(ClientCommand::parse("Stop"), Some(ClientCommand::Stop));
        assert_eq!(ClientCommand::parse("faster"), None);
    }

    #[test]
    fn frames_follow_the_synced_tick() {
        let synced = SyncPoint { epoch: 0, tick: 5 };
        assert_eq!(synced.delivery(&tick(0, 4)), Delivery::Skip);
        assert_eq!(synced.delivery(&tick(0, 5)), Delivery::Skip);
        assert_eq!(synced.delivery(&tick(0, 6)), Delivery::Forward);
        assert_eq!(synced.delivery(&tick(0, 8)), Delivery::Resync);
        let full = ServerMessage::full_state(0, 2, &GridSnapshot::empty(2));
        assert_eq!(synced.delivery(&full), Delivery::Forward);
        assert_eq!(SyncPoint::of(&full), SyncPoint { epoch: 0, tick: 2 });
    }

    #[test]
    fn frames_from_another_epoch_never_forward() {
        // A greeting taken before a reset shares its tick with the frames
        // that follow the reset.
        let stale = SyncPoint { epoch: 0, tick: 3 };
        assert_eq!(stale.delivery(&tick(1, 4)), Delivery::Resync);
        assert_eq!(stale.delivery(&tick(1, 3)), Delivery::Resync);

        let current = SyncPoint { epoch: 2, tick: 3 };
        assert_eq!(current.delivery(&tick(1, 4)), Delivery::Skip);
        assert_eq!(current.delivery(&tick(2, 4)), Delivery::Forward);
    }

    #[tokio::test]
    async fn client_commands_drive_the_operator() {
        let operator = Arc::new(OperatorState::new(500, &SimulationBoundsConfig::default()));
        let state = AppState::with_operator(ObserverSnapshot::default(), Arc::clone(&operator));

        apply_client_command(&state, ClientCommand::Stop).await.unwrap();
        assert!(operator.is_paused());
        apply_client_command(&state, ClientCommand::Start).await.unwrap();
        assert!(!operator.is_paused());
        apply_client_command(&state, ClientCommand::Reset).await.unwrap();
        assert_eq!(operator.drain_commands().await, vec![OperatorCommand::Reset]);
    }

    #[tokio::test]
    async fn commands_need_an_operator() {
        let state = AppState::new();
        let result = apply_client_command(&state, ClientCommand::Reset).await;
        assert!(matches!(result, Err(ObserverError::OperatorUnavailable)));
    }
}
