//! Life Engine for the CyberMesh simulation.
//!
//! Owns a square, toroidal grid of boolean cells and advances it one
//! generation at a time under Conway's B3/S23 rule. Each step reports the
//! cells whose state changed as a list of [`CellDelta`] values.
//!
//! # Modules
//!
//! - [`error`] -- [`LifeError`] for construction preconditions.
//! - [`grid`] -- [`LifeGrid`], the engine itself.
//! - [`patterns`] -- The [`Pattern`] catalogue used for seeding.
//! - [`rules`] -- The B3/S23 transition table.
//!
//! # Correctness
//!
//! Every next state in a step is computed from the same pre-step grid and
//! written into a separate buffer, which replaces the live grid only once
//! all cells are computed. A cell's next state never depends on another
//! cell's already-updated state.
//!
//! [`CellDelta`]: cybermesh_types::CellDelta

pub mod error;
pub mod grid;
pub mod patterns;
pub mod rules;

pub use error::LifeError;
pub use grid::LifeGrid;
pub use patterns::{PATTERNS, Pattern};
