//! The delta mesh: one embedding per cell plus neighbor routing.
//!
//! [`DeltaMesh::step`] is sequential, not an atomic batch. Pending cells
//! are visited in ascending index order; each payload is routed against
//! the recipients' vectors as they stand at that moment, so a merge done
//! earlier in the same step is visible to later routing decisions. The
//! energy field is the same snapshot for every payload in the step.
//!
//! The only failures are caller contract violations, all detected before
//! any state is touched.

use cybermesh_types::grid::wrap;
use cybermesh_types::{CellCoord, EnergyField, PassEvent, PayloadId};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::MeshError;
use crate::payload::DeltaPayload;
use crate::routing::{MeshParams, RouteChoice};
use crate::state::EmbeddingState;

/// Per-cell summary for validation and observer queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellSummary {
    /// Row-major cell index.
    pub cell_index: usize,
    /// Column.
    pub x: usize,
    /// Row.
    pub y: usize,
    /// Short hex fingerprint of the cell's embedding.
    pub fingerprint: String,
    /// Whether the cell holds a pending payload.
    pub has_pending: bool,
    /// Payloads merged into the cell.
    pub received: u64,
    /// Payloads released by the cell.
    pub passed: u64,
}

/// A square toroidal grid of embeddings with payload routing.
#[derive(Debug, Clone)]
pub struct DeltaMesh {
    /// Edge length.
    size: usize,
    /// Embedding dimension.
    dim: usize,
    /// One state per cell, row-major.
    states: Vec<EmbeddingState>,
    /// Routing weights, learning rate, history length.
    params: MeshParams,
    /// Steps taken.
    tick: u64,
}

impl DeltaMesh {
    /// Create a `size` x `size` mesh of zero embeddings of length `dim`
    /// with default parameters.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::InvalidSize`] or [`MeshError::InvalidDimension`]
    /// if either is 0.
    pub fn new(size: usize, dim: usize) -> Result<Self, MeshError> {
        Self::with_params(size, dim, MeshParams::default())
    }

    /// Create a mesh with explicit parameters.
    ///
    /// # Errors
    ///
    /// As [`new`](Self::new), plus [`MeshError::InvalidLearningRate`] for
    /// a bad learning rate.
    pub fn with_params(size: usize, dim: usize, params: MeshParams) -> Result<Self, MeshError> {
        if size == 0 {
            return Err(MeshError::InvalidSize { size });
        }
        if dim == 0 {
            return Err(MeshError::InvalidDimension { dim });
        }
        params.validate()?;
        let cell_count = size
            .checked_mul(size)
            .ok_or(MeshError::InvalidSize { size })?;
        let states = (0..cell_count)
            .map(|index| EmbeddingState::new(index, dim, params.history_len))
            .collect();
        Ok(Self {
            size,
            dim,
            states,
            params,
            tick: 0,
        })
    }

    /// Edge length.
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Embedding dimension.
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Number of cells (`size * size`).
    pub fn cell_count(&self) -> usize {
        self.states.len()
    }

    /// Steps taken so far.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// The mesh's parameters.
    pub const fn params(&self) -> &MeshParams {
        &self.params
    }

    /// Convert a flat index to `(x, y)`.
    pub const fn index_to_coord(&self, index: usize) -> CellCoord {
        CellCoord::from_index(index, self.size)
    }

    /// Convert `(x, y)` to a flat index, wrapping both axes.
    pub fn coord_to_index(&self, x: usize, y: usize) -> usize {
        CellCoord::new(x, y).to_index(self.size)
    }

    /// Read-only view of one cell's state.
    pub fn state(&self, index: usize) -> Option<&EmbeddingState> {
        self.states.get(index)
    }

    /// Number of cells holding a pending payload.
    pub fn pending_count(&self) -> usize {
        self.states.iter().filter(|s| s.has_pending()).count()
    }

    /// The 8 Moore neighbors of `index`, wrapped.
    ///
    /// Listed row by row (`dy = -1, 0, +1`, then `dx = -1, 0, +1`). On
    /// meshes smaller than 3x3 entries repeat, and on a 1x1 mesh every
    /// entry is `index` itself.
    pub fn neighbors(&self, index: usize) -> [usize; 8] {
        let size = self.size;
        let center = self.index_to_coord(index);
        let prev = |v: usize| wrap(v.saturating_add(size).saturating_sub(1), size);
        let next = |v: usize| wrap(v.saturating_add(1), size);
        let (x, y) = (center.x, center.y);
        let (xp, xn, yp, yn) = (prev(x), next(x), prev(y), next(y));
        [
            self.coord_to_index(xp, yp),
            self.coord_to_index(x, yp),
            self.coord_to_index(xn, yp),
            self.coord_to_index(xp, y),
            self.coord_to_index(xn, y),
            self.coord_to_index(xp, yn),
            self.coord_to_index(x, yn),
            self.coord_to_index(xn, yn),
        ]
    }

    /// Attach `payload` as the pending delta of cell `index`.
    ///
    /// # Errors
    ///
    /// - [`MeshError::CellOutOfRange`] for a bad index.
    /// - [`MeshError::DimensionMismatch`] if the payload's length is not
    ///   the mesh dimension.
    /// - [`MeshError::NonFiniteVector`] if the payload has NaN or
    ///   infinite components.
    /// - [`MeshError::AlreadyHolding`] if the cell already holds a
    ///   payload. The existing payload is kept and nothing is merged.
    pub fn hold(&mut self, index: usize, payload: DeltaPayload) -> Result<(), MeshError> {
        if payload.dim() != self.dim {
            return Err(MeshError::DimensionMismatch {
                expected: self.dim,
                actual: payload.dim(),
            });
        }
        if !payload.is_finite() {
            return Err(MeshError::NonFiniteVector {
                id: payload.id().clone(),
            });
        }
        let cell_count = self.states.len();
        let state = self
            .states
            .get_mut(index)
            .ok_or(MeshError::CellOutOfRange { index, cell_count })?;
        state.hold(payload)
    }

    /// Build a payload from `vector` (stamped with the current tick) and
    /// hold it at cell `index`.
    ///
    /// # Errors
    ///
    /// As [`hold`](Self::hold).
    pub fn inject(
        &mut self,
        index: usize,
        vector: Vec<f32>,
        id: impl Into<PayloadId>,
    ) -> Result<(), MeshError> {
        let payload = DeltaPayload::new(id, vector, self.tick);
        let payload_id = payload.id().clone();
        let norm = payload.l2_norm();
        self.hold(index, payload)?;
        info!(
            payload_id = %payload_id,
            cell = index,
            norm,
            tick = self.tick,
            "Injected delta"
        );
        Ok(())
    }

    /// Choose the neighbor of `from` that should receive `payload`.
    ///
    /// Each neighbor is scored as
    /// `cosine_weight * cos(neighbor, payload) + energy_weight * energy`.
    /// The strictly highest score wins; ties go to the lowest cell index.
    /// The returned similarity is the winner's cosine similarity, not its
    /// blended score.
    ///
    /// # Errors
    ///
    /// - [`MeshError::CellOutOfRange`] for a bad `from` index.
    /// - [`MeshError::EnergyFieldSize`] / [`MeshError::NonFiniteEnergy`]
    ///   for an unusable field.
    pub fn route(
        &self,
        from: usize,
        payload: &DeltaPayload,
        energy: &EnergyField,
    ) -> Result<RouteChoice, MeshError> {
        self.check_index(from)?;
        self.check_energy(energy)?;
        self.choose(from, payload, energy)
    }

    /// Route every pending payload once and merge it into its recipient.
    ///
    /// Pending cells are visited in ascending index order. Returns one
    /// [`PassEvent`] per payload moved and advances the tick.
    ///
    /// # Errors
    ///
    /// [`MeshError::EnergyFieldSize`] / [`MeshError::NonFiniteEnergy`],
    /// checked before any payload moves.
    pub fn step(&mut self, energy: &EnergyField) -> Result<Vec<PassEvent>, MeshError> {
        self.check_energy(energy)?;

        let senders: Vec<usize> = self
            .states
            .iter()
            .filter(|s| s.has_pending())
            .map(EmbeddingState::cell_index)
            .collect();

        let mut events = Vec::with_capacity(senders.len());
        for from in senders {
            let Some(payload) = self.states.get_mut(from).and_then(EmbeddingState::release)
            else {
                continue;
            };

            let choice = self.choose(from, &payload, energy)?;
            let learning_rate = self.params.learning_rate;
            if let Some(recipient) = self.states.get_mut(choice.to_index) {
                recipient.receive(&payload, learning_rate);
            }

            debug!(
                tick = self.tick,
                payload_id = %payload.id(),
                from,
                to = choice.to_index,
                similarity = choice.similarity,
                score = choice.score,
                "Pass"
            );

            events.push(PassEvent {
                tick: self.tick,
                from_index: from,
                to_index: choice.to_index,
                from: self.index_to_coord(from),
                to: self.index_to_coord(choice.to_index),
                payload_id: payload.id().clone(),
                payload_norm: payload.l2_norm(),
                similarity: choice.similarity,
            });
        }

        self.tick = self.tick.saturating_add(1);
        Ok(events)
    }

    /// Summaries of every cell, row-major.
    pub fn cell_summaries(&self) -> Vec<CellSummary> {
        self.states
            .iter()
            .map(|state| {
                let coord = self.index_to_coord(state.cell_index());
                CellSummary {
                    cell_index: state.cell_index(),
                    x: coord.x,
                    y: coord.y,
                    fingerprint: state.fingerprint(),
                    has_pending: state.has_pending(),
                    received: state.received_count(),
                    passed: state.passed_count(),
                }
            })
            .collect()
    }

    fn check_index(&self, index: usize) -> Result<(), MeshError> {
        if index < self.states.len() {
            Ok(())
        } else {
            Err(MeshError::CellOutOfRange {
                index,
                cell_count: self.states.len(),
            })
        }
    }

    fn check_energy(&self, energy: &EnergyField) -> Result<(), MeshError> {
        if energy.size() != self.size {
            return Err(MeshError::EnergyFieldSize {
                expected: self.size,
                actual: energy.size(),
            });
        }
        if !energy.is_finite() {
            return Err(MeshError::NonFiniteEnergy);
        }
        Ok(())
    }

    /// Scoring loop shared by [`route`](Self::route) and
    /// [`step`](Self::step). Inputs are already validated.
    fn choose(
        &self,
        from: usize,
        payload: &DeltaPayload,
        energy: &EnergyField,
    ) -> Result<RouteChoice, MeshError> {
        let policy = &self.params.routing;
        let mut best: Option<RouteChoice> = None;

        for candidate in self.neighbors(from) {
            let Some(state) = self.states.get(candidate) else {
                continue;
            };
            let similarity = state.cosine_similarity(payload.vector());
            let cell_energy = energy.at_index(candidate).unwrap_or(0.0);
            let score = policy.score(similarity, cell_energy);

            // Scores are finite here, so "not greater and not less" is a tie.
            let better = best.as_ref().is_none_or(|b| {
                score > b.score || (score >= b.score && candidate < b.to_index)
            });
            if better {
                best = Some(RouteChoice {
                    to_index: candidate,
                    similarity,
                    score,
                });
            }
        }

        best.ok_or(MeshError::NoCandidate { cell_index: from })
    }
}
