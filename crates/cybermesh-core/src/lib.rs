//! Configuration, tick orchestration, and the run loop for the CyberMesh
//! simulation.
//!
//! This crate wires the Life engine and the delta mesh into one tick:
//! Life steps, its state becomes the energy field, and the mesh routes
//! its payloads under that field.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `cybermesh-config.yaml` into
//!   strongly-typed structs.
//! - [`energy`] -- Life snapshot to energy field.
//! - [`operator`] -- Shared pause/resume/speed/stop state and the command
//!   queue.
//! - [`runner`] -- [`run_simulation`], the bounded async tick loop.
//! - [`stimulus`] -- Seeded payload injection into idle cells.
//! - [`tick`] -- [`Simulation`] and the per-tick [`TickFrame`].
//!
//! [`run_simulation`]: runner::run_simulation
//! [`Simulation`]: tick::Simulation
//! [`TickFrame`]: tick::TickFrame

pub mod config;
pub mod energy;
pub mod operator;
pub mod runner;
pub mod stimulus;
pub mod tick;
