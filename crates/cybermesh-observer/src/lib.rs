//! Observer server for the CyberMesh simulation.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws`) that sends a `full_state` frame on
//!   connect and one `tick` frame per tick via [`tokio::sync::broadcast`].
//!   Clients may send the text commands `start`, `stop` and `reset`.
//! - **REST endpoints** for the Life grid, the mesh cells and the recent
//!   pass log
//! - **Operator REST endpoints** for runtime control (pause, resume,
//!   speed, status, reset, inject, stop)
//! - **Minimal HTML status page** (`GET /`)
//!
//! # Architecture
//!
//! The observer never touches the live simulation. The engine's tick
//! callback refreshes an [`ObserverSnapshot`] and publishes
//! [`ServerMessage`] frames; REST reads are served from the snapshot and
//! operator commands are queued on the shared
//! [`OperatorState`](cybermesh_core::operator::OperatorState) for the
//! tick loop to apply between ticks.

pub mod error;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::spawn_observer;
pub use state::{AppState, ObserverSnapshot, ServerMessage};
