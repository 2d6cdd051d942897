//! Error types for the `cybermesh-mesh` crate.
//!
//! Every variant is a precondition violation raised synchronously at the
//! call site. The mesh never coerces bad input and never swallows an
//! error; steady-state routing has no recoverable failure modes.

use cybermesh_types::PayloadId;

/// Errors raised by the delta mesh.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    /// The grid size must be a positive integer.
    #[error("mesh size must be positive, got {size}")]
    InvalidSize {
        /// The rejected size.
        size: usize,
    },

    /// The embedding dimension must be a positive integer.
    #[error("embedding dimension must be positive, got {dim}")]
    InvalidDimension {
        /// The rejected dimension.
        dim: usize,
    },

    /// A cell index outside `0..size*size`.
    #[error("cell index {index} out of range (mesh has {cell_count} cells)")]
    CellOutOfRange {
        /// The rejected index.
        index: usize,
        /// Number of cells in the mesh.
        cell_count: usize,
    },

    /// The cell already holds a pending payload.
    #[error("cell {cell_index} already holding payload {pending}")]
    AlreadyHolding {
        /// The cell that was asked to hold a second payload.
        cell_index: usize,
        /// The payload it is already holding.
        pending: PayloadId,
    },

    /// A payload vector does not have the mesh's embedding dimension.
    #[error("payload dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The mesh's embedding dimension.
        expected: usize,
        /// The payload's vector length.
        actual: usize,
    },

    /// A payload vector contains NaN or infinite components.
    #[error("payload {id} has non-finite components")]
    NonFiniteVector {
        /// The offending payload.
        id: PayloadId,
    },

    /// A recorded payload norm disagrees with the norm of its vector.
    #[error("payload norm mismatch: recorded {recorded}, computed {computed}")]
    NormMismatch {
        /// The norm supplied with the payload.
        recorded: f32,
        /// The norm of the vector.
        computed: f32,
    },

    /// The energy field's size differs from the mesh's.
    #[error("energy field is {actual}x{actual}, mesh is {expected}x{expected}")]
    EnergyFieldSize {
        /// The mesh's size.
        expected: usize,
        /// The field's size.
        actual: usize,
    },

    /// The energy field contains NaN or infinite values.
    #[error("energy field contains non-finite values")]
    NonFiniteEnergy,

    /// Routing weights are negative, non-finite, or do not sum to 1.
    #[error("routing weights must be finite, non-negative and sum to 1 (cosine {cosine}, energy {energy})")]
    InvalidWeights {
        /// The rejected cosine weight.
        cosine: f32,
        /// The rejected energy weight.
        energy: f32,
    },

    /// The merge learning rate must be finite and in `(0, 1]`.
    #[error("learning rate must be in (0, 1], got {rate}")]
    InvalidLearningRate {
        /// The rejected rate.
        rate: f32,
    },

    /// Routing found no candidate neighbor. Cannot happen on a mesh built
    /// through [`DeltaMesh::new`](crate::DeltaMesh::new).
    #[error("no routing candidate for cell {cell_index}")]
    NoCandidate {
        /// The sending cell.
        cell_index: usize,
    },
}
