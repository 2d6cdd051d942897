//! Delta Mesh for the CyberMesh simulation.
//!
//! Every grid cell owns an embedding vector and may hold at most one
//! pending [`DeltaPayload`]. Once per tick, each holding cell routes its
//! payload to exactly one Moore neighbor, chosen by a blend of cosine
//! similarity and an external energy field, and the payload is merged into
//! the recipient's vector. Each move is recorded as a [`PassEvent`].
//!
//! # Modules
//!
//! - [`error`] -- [`MeshError`], all of which are caller contract
//!   violations.
//! - [`vector`] -- Dot product, norms, cosine similarity, normalization.
//! - [`payload`] -- [`DeltaPayload`], the unit of transfer.
//! - [`state`] -- [`EmbeddingState`], one per cell.
//! - [`routing`] -- [`RoutingPolicy`] and [`MeshParams`] with their
//!   defaults.
//! - [`mesh`] -- [`DeltaMesh`], routing and the per-tick step.
//!
//! [`PassEvent`]: cybermesh_types::PassEvent

pub mod error;
pub mod mesh;
pub mod payload;
pub mod routing;
pub mod state;
pub mod vector;

pub use error::MeshError;
pub use mesh::{CellSummary, DeltaMesh};
pub use payload::DeltaPayload;
pub use routing::{MeshParams, RouteChoice, RoutingPolicy};
pub use state::EmbeddingState;
