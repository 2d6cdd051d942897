//! Routing policy and mesh tuning parameters.
//!
//! A candidate recipient is scored as
//! `cosine_weight * cosine_similarity + energy_weight * energy`.
//! The weights are configuration, not derived constants. They must be
//! finite, non-negative, and sum to 1 so a score never silently leaves
//! the normalized range of its inputs.

use serde::{Deserialize, Serialize};

use crate::error::MeshError;

/// Default weight of cosine similarity in the routing score.
pub const DEFAULT_COSINE_WEIGHT: f32 = 0.7;

/// Default weight of the energy field in the routing score.
pub const DEFAULT_ENERGY_WEIGHT: f32 = 0.3;

/// Default merge learning rate.
pub const DEFAULT_LEARNING_RATE: f32 = 0.1;

/// Default number of prior vectors kept per cell.
pub const DEFAULT_HISTORY_LEN: usize = 4;

/// Allowed deviation of the weight sum from 1.
const WEIGHT_SUM_TOLERANCE: f32 = 1e-5;

/// Weights blending similarity and energy into a routing score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWeights")]
pub struct RoutingPolicy {
    cosine_weight: f32,
    energy_weight: f32,
}

/// Unvalidated weights, as they appear in configuration.
#[derive(Deserialize)]
struct RawWeights {
    cosine_weight: f32,
    energy_weight: f32,
}

impl TryFrom<RawWeights> for RoutingPolicy {
    type Error = MeshError;

    fn try_from(raw: RawWeights) -> Result<Self, Self::Error> {
        Self::new(raw.cosine_weight, raw.energy_weight)
    }
}

impl RoutingPolicy {
    /// Create a policy from explicit weights.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::InvalidWeights`] if either weight is negative
    /// or non-finite, or if they do not sum to 1.
    pub fn new(cosine_weight: f32, energy_weight: f32) -> Result<Self, MeshError> {
        let valid = cosine_weight.is_finite()
            && energy_weight.is_finite()
            && cosine_weight >= 0.0
            && energy_weight >= 0.0
            && (cosine_weight + energy_weight - 1.0).abs() <= WEIGHT_SUM_TOLERANCE;
        if !valid {
            return Err(MeshError::InvalidWeights {
                cosine: cosine_weight,
                energy: energy_weight,
            });
        }
        Ok(Self {
            cosine_weight,
            energy_weight,
        })
    }

    /// Weight of cosine similarity.
    pub const fn cosine_weight(&self) -> f32 {
        self.cosine_weight
    }

    /// Weight of the energy field.
    pub const fn energy_weight(&self) -> f32 {
        self.energy_weight
    }

    /// Blend a similarity and an energy value into a routing score.
    pub fn score(&self, similarity: f32, energy: f32) -> f32 {
        self.cosine_weight * similarity + self.energy_weight * energy
    }
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self {
            cosine_weight: DEFAULT_COSINE_WEIGHT,
            energy_weight: DEFAULT_ENERGY_WEIGHT,
        }
    }
}

/// Tunable mesh parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshParams {
    /// Routing score weights.
    pub routing: RoutingPolicy,
    /// Merge learning rate applied in [`EmbeddingState::receive`].
    ///
    /// [`EmbeddingState::receive`]: crate::EmbeddingState::receive
    pub learning_rate: f32,
    /// Prior vectors kept per cell.
    pub history_len: usize,
}

impl MeshParams {
    /// Check the learning rate.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::InvalidLearningRate`] unless the rate is
    /// finite and in `(0, 1]`.
    pub fn validate(&self) -> Result<(), MeshError> {
        let rate = self.learning_rate;
        if !rate.is_finite() || rate <= 0.0 || rate > 1.0 {
            return Err(MeshError::InvalidLearningRate { rate });
        }
        Ok(())
    }
}

impl Default for MeshParams {
    fn default() -> Self {
        Self {
            routing: RoutingPolicy::default(),
            learning_rate: DEFAULT_LEARNING_RATE,
            history_len: DEFAULT_HISTORY_LEN,
        }
    }
}

/// The outcome of routing one payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteChoice {
    /// Flat index of the chosen neighbor.
    pub to_index: usize,
    /// Cosine similarity between the payload and the chosen neighbor.
    pub similarity: f32,
    /// The blended score that won.
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_sum_to_one() {
        let policy = RoutingPolicy::default();
        assert!((policy.cosine_weight() + policy.energy_weight() - 1.0).abs() < 1e-6);
        assert!(RoutingPolicy::new(DEFAULT_COSINE_WEIGHT, DEFAULT_ENERGY_WEIGHT).is_ok());
    }

    #[test]
    fn rejects_weights_outside_bounds() {
        assert!(RoutingPolicy::new(0.9, 0.3).is_err());
        assert!(RoutingPolicy::new(1.2, -0.2).is_err());
        assert!(RoutingPolicy::new(f32::NAN, 0.3).is_err());
        assert!(RoutingPolicy::new(1.0, 0.0).is_ok());
        assert!(RoutingPolicy::new(0.0, 1.0).is_ok());
    }

    #[test]
    fn score_blends_linearly() {
        let policy = RoutingPolicy::new(0.5, 0.5).unwrap_or_default();
        assert!((policy.score(1.0, 0.0) - 0.5).abs() < 1e-6);
        assert!((policy.score(0.2, 0.8) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn learning_rate_bounds() {
        let mut params = MeshParams::default();
        assert!(params.validate().is_ok());
        params.learning_rate = 0.0;
        assert!(params.validate().is_err());
        params.learning_rate = 1.5;
        assert!(params.validate().is_err());
        params.learning_rate = 1.0;
        assert!(params.validate().is_ok());
    }

    #[test]
    fn deserialization_validates() {
        let ok: Result<RoutingPolicy, _> =
            serde_json::from_str(r#"{"cosine_weight": 0.6, "energy_weight": 0.4}"#);
        assert!(ok.is_ok());
        let bad: Result<RoutingPolicy, _> =
            serde_json::from_str(r#"{"cosine_weight": 0.9, "energy_weight": 0.4}"#);
        assert!(bad.is_err());
    }
}
