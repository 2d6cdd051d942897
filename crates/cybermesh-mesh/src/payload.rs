//! The unit of transfer in the mesh.

use cybermesh_types::PayloadId;

use crate::error::MeshError;
use crate::vector;

/// Relative tolerance when checking a recorded norm against its vector.
const NORM_TOLERANCE: f32 = 1e-4;

/// An immutable vector-valued payload moved between cells.
///
/// The L2 norm is computed once at creation so downstream consumers can
/// validate that the payload arrived intact.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaPayload {
    id: PayloadId,
    vector: Vec<f32>,
    l2_norm: f32,
    created_tick: u64,
}

impl DeltaPayload {
    /// Create a payload, computing its norm from `vector`.
    pub fn new(id: impl Into<PayloadId>, vector: Vec<f32>, created_tick: u64) -> Self {
        let l2_norm = vector::l2_norm(&vector);
        Self {
            id: id.into(),
            vector,
            l2_norm,
            created_tick,
        }
    }

    /// Rebuild a payload from its parts, checking the recorded norm.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::NormMismatch`] if `l2_norm` differs from the
    /// vector's norm by more than a small relative tolerance.
    pub fn from_parts(
        id: impl Into<PayloadId>,
        vector: Vec<f32>,
        l2_norm: f32,
        created_tick: u64,
    ) -> Result<Self, MeshError> {
        let computed = vector::l2_norm(&vector);
        if !norm_matches(l2_norm, computed) {
            return Err(MeshError::NormMismatch {
                recorded: l2_norm,
                computed,
            });
        }
        Ok(Self {
            id: id.into(),
            vector,
            l2_norm,
            created_tick,
        })
    }

    /// The payload's traceability token.
    pub const fn id(&self) -> &PayloadId {
        &self.id
    }

    /// The payload vector.
    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    /// Length of the payload vector.
    pub fn dim(&self) -> usize {
        self.vector.len()
    }

    /// The L2 norm recorded at creation.
    pub const fn l2_norm(&self) -> f32 {
        self.l2_norm
    }

    /// Mesh tick at which the payload was created.
    pub const fn created_tick(&self) -> u64 {
        self.created_tick
    }

    /// Whether the recorded norm still matches a fresh computation.
    pub fn verify_norm(&self) -> bool {
        norm_matches(self.l2_norm, vector::l2_norm(&self.vector))
    }

    /// Whether every component is finite.
    pub fn is_finite(&self) -> bool {
        self.vector.iter().all(|x| x.is_finite())
    }
}

fn norm_matches(recorded: f32, computed: f32) -> bool {
    recorded.is_finite() && (recorded - computed).abs() <= NORM_TOLERANCE * computed.max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norm_is_precomputed() {
        let payload = DeltaPayload::new("p1", vec![0.2; 384], 0);
        let expected = (384.0_f32 * 0.04).sqrt();
        assert!((payload.l2_norm() - expected).abs() < 1e-4);
        assert!(payload.verify_norm());
        assert_eq!(payload.dim(), 384);
        assert_eq!(payload.id().as_str(), "p1");
    }

    #[test]
    fn from_parts_accepts_matching_norm() {
        let payload = DeltaPayload::from_parts("p2", vec![3.0, 4.0], 5.0, 7);
        assert!(payload.is_ok());
        assert_eq!(payload.map(|p| p.created_tick()).unwrap_or(0), 7);
    }

    #[test]
    fn from_parts_rejects_wrong_norm() {
        let err = DeltaPayload::from_parts("p3", vec![3.0, 4.0], 0.1, 0);
        assert!(matches!(err, Err(MeshError::NormMismatch { .. })));
    }

    #[test]
    fn finiteness_check() {
        assert!(DeltaPayload::new("ok", vec![1.0, 2.0], 0).is_finite());
        assert!(!DeltaPayload::new("bad", vec![1.0, f32::NAN], 0).is_finite());
    }
}
