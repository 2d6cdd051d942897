//! Observer startup helper for embedding in the engine binary.
//!
//! [`spawn_observer`] launches the observer HTTP + `WebSocket` server on
//! a background Tokio task so it runs alongside the tick loop.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the observer server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server address is unusable.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Spawn the observer HTTP server on a background Tokio task.
///
/// Returns a [`JoinHandle`] the caller can await to keep serving after
/// the simulation ends, or abort on shutdown. Bind and serve failures
/// inside the task are logged.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the configured address does not
/// parse. This is checked before the task is spawned.
pub fn spawn_observer(
    config: ServerConfig,
    state: Arc<AppState>,
) -> Result<JoinHandle<()>, StartupError> {
    let addr = config.socket_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = crate::server::start_server(&config, state).await {
            tracing::error!(error = %e, "Observer server exited with error");
        }
    });

    tracing::info!(%addr, "Observer server spawned on background task");

    Ok(handle)
}
