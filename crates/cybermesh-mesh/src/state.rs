//! Per-cell embedding state.

use std::collections::VecDeque;

use crate::error::MeshError;
use crate::payload::DeltaPayload;
use crate::vector;

/// The embedding owned by one grid cell.
///
/// Holds a fixed-dimension vector, a bounded history of prior vectors,
/// and at most one pending payload. The vector is kept unit length after
/// every merge whenever its norm is non-negligible.
#[derive(Debug, Clone)]
pub struct EmbeddingState {
    /// Row-major index of the owning cell.
    cell_index: usize,
    /// Current embedding.
    vector: Vec<f32>,
    /// Prior embeddings, oldest first.
    history: VecDeque<Vec<f32>>,
    /// Maximum number of history entries kept.
    history_len: usize,
    /// The payload waiting to be routed next step.
    pending: Option<DeltaPayload>,
    /// Payloads merged into this cell.
    received: u64,
    /// Payloads released by this cell.
    passed: u64,
}

impl EmbeddingState {
    /// A zero embedding of length `dim` with an empty history.
    pub fn new(cell_index: usize, dim: usize, history_len: usize) -> Self {
        Self {
            cell_index,
            vector: vec![0.0; dim],
            history: VecDeque::with_capacity(history_len),
            history_len,
            pending: None,
            received: 0,
            passed: 0,
        }
    }

    /// Row-major index of the owning cell.
    pub const fn cell_index(&self) -> usize {
        self.cell_index
    }

    /// Embedding dimension.
    pub fn dim(&self) -> usize {
        self.vector.len()
    }

    /// The current embedding.
    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    /// Prior embeddings, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &[f32]> {
        self.history.iter().map(Vec::as_slice)
    }

    /// The payload waiting to be routed, if any.
    pub const fn pending(&self) -> Option<&DeltaPayload> {
        self.pending.as_ref()
    }

    /// Whether a payload is waiting to be routed.
    pub const fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of payloads merged into this cell.
    pub const fn received_count(&self) -> u64 {
        self.received
    }

    /// Number of payloads this cell has released.
    pub const fn passed_count(&self) -> u64 {
        self.passed
    }

    /// Attach `payload` as this cell's pending delta.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::AlreadyHolding`] if a payload is already
    /// pending; the state is left untouched. Returns
    /// [`MeshError::DimensionMismatch`] if the payload's length differs
    /// from the embedding's.
    pub fn hold(&mut self, payload: DeltaPayload) -> Result<(), MeshError> {
        if let Some(pending) = &self.pending {
            return Err(MeshError::AlreadyHolding {
                cell_index: self.cell_index,
                pending: pending.id().clone(),
            });
        }
        if payload.dim() != self.dim() {
            return Err(MeshError::DimensionMismatch {
                expected: self.dim(),
                actual: payload.dim(),
            });
        }
        self.pending = Some(payload);
        Ok(())
    }

    /// Take the pending payload, clearing the slot.
    pub fn release(&mut self) -> Option<DeltaPayload> {
        let payload = self.pending.take();
        if payload.is_some() {
            self.passed = self.passed.saturating_add(1);
        }
        payload
    }

    /// Merge `payload` into the embedding:
    /// `vector <- normalize(vector + learning_rate * payload)`.
    ///
    /// The previous vector is pushed onto the history first, dropping the
    /// oldest entry when full.
    pub fn receive(&mut self, payload: &DeltaPayload, learning_rate: f32) {
        if self.history_len > 0 {
            if self.history.len() >= self.history_len {
                self.history.pop_front();
            }
            self.history.push_back(self.vector.clone());
        }
        vector::add_scaled(&mut self.vector, payload.vector(), learning_rate);
        vector::normalize(&mut self.vector);
        self.received = self.received.saturating_add(1);
    }

    /// Cosine similarity between the embedding and `other`.
    pub fn cosine_similarity(&self, other: &[f32]) -> f32 {
        vector::cosine_similarity(&self.vector, other)
    }

    /// Cosine similarity between the embedding and the most recent
    /// history entry, or 1 when there is no history yet.
    pub fn cosine_with_previous(&self) -> f32 {
        self.history
            .back()
            .map_or(1.0, |prev| vector::cosine_similarity(&self.vector, prev))
    }

    /// Short hex fingerprint of the current embedding.
    pub fn fingerprint(&self) -> String {
        vector::fingerprint(&self.vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(id: &str, value: f32, dim: usize) -> DeltaPayload {
        DeltaPayload::new(id, vec![value; dim], 0)
    }

    #[test]
    fn starts_zero_and_idle() {
        let state = EmbeddingState::new(5, 16, 4);
        assert_eq!(state.cell_index(), 5);
        assert_eq!(state.dim(), 16);
        assert!(state.vector().iter().all(|x| x.abs() < f32::EPSILON));
        assert!(!state.has_pending());
        assert_eq!(state.history().count(), 0);
    }

    #[test]
    fn second_hold_is_rejected_without_overwrite() {
        let mut state = EmbeddingState::new(0, 8, 4);
        assert!(state.hold(payload("first", 0.1, 8)).is_ok());
        let err = state.hold(payload("second", 0.2, 8));
        assert_eq!(
            err,
            Err(MeshError::AlreadyHolding {
                cell_index: 0,
                pending: "first".into(),
            })
        );
        assert_eq!(state.pending().map(|p| p.id().as_str()), Some("first"));
    }

    #[test]
    fn hold_rejects_wrong_dimension() {
        let mut state = EmbeddingState::new(0, 8, 4);
        let err = state.hold(payload("short", 0.1, 4));
        assert_eq!(
            err,
            Err(MeshError::DimensionMismatch {
                expected: 8,
                actual: 4
            })
        );
        assert!(!state.has_pending());
    }

    #[test]
    fn release_clears_and_counts() {
        let mut state = EmbeddingState::new(0, 8, 4);
        assert!(state.release().is_none());
        assert_eq!(state.passed_count(), 0);

        assert!(state.hold(payload("p", 0.1, 8)).is_ok());
        let released = state.release();
        assert_eq!(released.map(|p| p.id().clone()), Some("p".into()));
        assert!(!state.has_pending());
        assert_eq!(state.passed_count(), 1);
    }

    #[test]
    fn receive_normalizes_and_records_history() {
        let mut state = EmbeddingState::new(0, 8, 4);
        state.receive(&payload("p", 0.2, 8), 0.1);
        assert!((vector::l2_norm(state.vector()) - 1.0).abs() < 1e-5);
        assert_eq!(state.history().count(), 1);
        assert_eq!(state.received_count(), 1);
        // The zero vector was pushed, so similarity to it is 0.
        assert!(state.cosine_with_previous().abs() < f32::EPSILON);
    }

    #[test]
    fn history_is_bounded() {
        let mut state = EmbeddingState::new(0, 4, 2);
        for i in 0..5 {
            state.receive(&payload("p", 0.1, 4), 0.1);
            assert!(state.history().count() <= 2, "history overflow at {i}");
        }
        assert_eq!(state.history().count(), 2);
    }

    #[test]
    fn zero_history_keeps_nothing() {
        let mut state = EmbeddingState::new(0, 4, 0);
        state.receive(&payload("p", 0.1, 4), 0.1);
        assert_eq!(state.history().count(), 0);
        assert!((state.cosine_with_previous() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn receiving_zero_payload_keeps_zero_vector() {
        let mut state = EmbeddingState::new(0, 4, 4);
        state.receive(&payload("zero", 0.0, 4), 0.1);
        assert!(state.vector().iter().all(|x| x.abs() < f32::EPSILON));
        assert_eq!(state.received_count(), 1);
    }

    #[test]
    fn fingerprint_changes_on_receive() {
        let mut state = EmbeddingState::new(0, 8, 4);
        let before = state.fingerprint();
        state.receive(&payload("p", 0.3, 8), 0.1);
        assert_ne!(before, state.fingerprint());
    }
}
