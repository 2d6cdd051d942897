//! Shared value types for the CyberMesh simulation.
//!
//! This crate holds the immutable records that cross the boundary between
//! the two engines and their consumers. Nothing here owns simulation
//! storage; every type is a snapshot or an event produced by one tick.
//! Wire-facing types derive `ts-rs` bindings for the dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- [`PayloadId`], the caller-supplied token that traces a
//!   payload through the mesh.
//! - [`grid`] -- Grid coordinates, Life cell deltas, grid snapshots and
//!   the per-cell energy field.
//! - [`events`] -- [`PassEvent`] and its wire projection [`PassEdge`].

pub mod events;
pub mod grid;
pub mod ids;

pub use events::{PassEdge, PassEvent};
pub use grid::{CellCoord, CellDelta, EnergyField, GridSnapshot};
pub use ids::PayloadId;
