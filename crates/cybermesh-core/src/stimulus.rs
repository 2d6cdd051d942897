//! Deterministic payload generator that keeps the mesh busy.
//!
//! The injector owns a seeded RNG, so two runs with the same seed and the
//! same configuration inject identical payloads into identical cells.
//! Payload ids follow `stim-{tick}-{n}`, where `n` counts every payload
//! the injector has produced.

use cybermesh_mesh::{DeltaMesh, MeshError, vector};
use cybermesh_types::PayloadId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::StimulusConfig;

/// Generates payload vectors and injects them into idle mesh cells.
#[derive(Debug, Clone)]
pub struct StimulusInjector {
    config: StimulusConfig,
    rng: StdRng,
    produced: u64,
}

impl StimulusInjector {
    /// Create an injector seeded with `seed`.
    pub fn new(config: StimulusConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            produced: 0,
        }
    }

    /// The configuration this injector was built with.
    pub const fn config(&self) -> &StimulusConfig {
        &self.config
    }

    /// Total payloads produced so far.
    pub const fn produced(&self) -> u64 {
        self.produced
    }

    /// A random vector of length `dim` with L2 norm `magnitude`.
    ///
    /// Components are drawn uniformly from `[-1, 1]` and rescaled. A
    /// degenerate all-zero draw is returned unscaled.
    pub fn random_vector(&mut self, dim: usize, magnitude: f32) -> Vec<f32> {
        let mut values: Vec<f32> = (0..dim)
            .map(|_| self.rng.random_range(-1.0_f32..=1.0))
            .collect();
        if vector::normalize(&mut values) {
            for v in &mut values {
                *v *= magnitude;
            }
        }
        values
    }

    /// The next id in the `stim-{tick}-{n}` sequence.
    pub fn next_id(&mut self, tick: u64) -> PayloadId {
        let id = PayloadId::new(format!("stim-{tick}-{}", self.produced));
        self.produced = self.produced.saturating_add(1);
        id
    }

    /// Inject the startup batch. Returns the ids injected.
    ///
    /// # Errors
    ///
    /// Propagates [`MeshError`] from the mesh; in practice only a
    /// non-finite `magnitude` can trigger one.
    pub fn inject_initial(&mut self, mesh: &mut DeltaMesh) -> Result<Vec<PayloadId>, MeshError> {
        if !self.config.enabled {
            return Ok(Vec::new());
        }
        self.inject_batch(mesh, self.config.initial_payloads)
    }

    /// Inject the periodic batch if `tick` is on the configured interval.
    ///
    /// # Errors
    ///
    /// As [`inject_initial`](Self::inject_initial).
    pub fn on_tick(&mut self, mesh: &mut DeltaMesh, tick: u64) -> Result<Vec<PayloadId>, MeshError> {
        let interval = self.config.interval_ticks;
        if !self.config.enabled || tick == 0 || tick.checked_rem(interval) != Some(0) {
            return Ok(Vec::new());
        }
        self.inject_batch(mesh, self.config.batch_size)
    }

    /// Inject up to `count` payloads into distinct idle cells. Fewer are
    /// injected when fewer cells are idle.
    fn inject_batch(
        &mut self,
        mesh: &mut DeltaMesh,
        count: usize,
    ) -> Result<Vec<PayloadId>, MeshError> {
        let mut idle: Vec<usize> = (0..mesh.cell_count())
            .filter(|i| mesh.state(*i).is_some_and(|s| !s.has_pending()))
            .collect();
        let mut injected = Vec::with_capacity(count.min(idle.len()));

        for _ in 0..count {
            if idle.is_empty() {
                break;
            }
            let pick = self.rng.random_range(0..idle.len());
            let cell = idle.swap_remove(pick);
            let values = self.random_vector(mesh.dim(), self.config.magnitude);
            let id = self.next_id(mesh.tick());
            mesh.inject(cell, values, id.clone())?;
            injected.push(id);
        }

        debug!(count = injected.len(), tick = mesh.tick(), "Stimulus batch");
        Ok(injected)
    }
}
