//! Tick cycle: one Life step feeding one mesh step.
//!
//! Each tick runs these phases in order:
//!
//! 1. **Life** -- advance the grid one generation and collect its deltas.
//! 2. **Energy** -- derive the energy field from the post-step grid.
//! 3. **Mesh** -- route every pending payload once under that field.
//! 4. **Stimulus** -- inject the periodic payload batch, if due.
//!
//! The Life deltas and the mesh passes of one tick are returned together
//! in a [`TickFrame`] so consumers always see them as a unit. The next
//! Life generation is computed on a copy and only committed once the mesh
//! has accepted its energy field, so a failed tick leaves the session
//! untouched.
//!
//! A [`Simulation`] owns one Life grid and one mesh. Nothing in it is
//! global; the caller owns the instance and drives it.

use std::collections::VecDeque;

use cybermesh_life::{LifeError, LifeGrid, Pattern};
use cybermesh_mesh::{DeltaMesh, MeshError};
use cybermesh_types::{CellDelta, GridSnapshot, PassEvent, PayloadId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::config::{ConfigError, EnergyConfig, LifeConfig, SimulationConfig};
use crate::energy;
use crate::stimulus::StimulusInjector;

/// Errors that can occur during tick execution or session setup.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// The configuration holds a value the session cannot run with.
    #[error("config error: {source}")]
    Config {
        /// The underlying validation error.
        #[from]
        source: ConfigError,
    },

    /// A Life engine operation failed.
    #[error("life error: {source}")]
    Life {
        /// The underlying Life error.
        #[from]
        source: LifeError,
    },

    /// A mesh operation failed.
    #[error("mesh error: {source}")]
    Mesh {
        /// The underlying mesh error.
        #[from]
        source: MeshError,
    },
}

/// Everything one tick produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TickFrame {
    /// Resets applied before this tick.
    pub epoch: u64,
    /// Ticks completed, including this one. The first frame is tick 1.
    pub tick: u64,
    /// Life generation after the step.
    pub generation: u64,
    /// Cells whose Life state changed.
    pub deltas: Vec<CellDelta>,
    /// Payload moves, in sender index order. Their `tick` is the
    /// zero-based mesh step, one less than [`TickFrame::tick`].
    pub passes: Vec<PassEvent>,
    /// Live Life cells after the step.
    pub live_cells: usize,
    /// Payloads waiting in the mesh after the step, including any
    /// stimulus injected at the end of the tick.
    pub pending_payloads: usize,
}

/// A simulation session: one Life grid, one mesh, and their wiring.
#[derive(Debug)]
pub struct Simulation {
    life: LifeGrid,
    mesh: DeltaMesh,
    seed: LifeConfig,
    pattern: Pattern,
    energy: EnergyConfig,
    stimulus: StimulusInjector,
    tick: u64,
    epoch: u64,
    recent_passes: VecDeque<PassEvent>,
    pass_log_capacity: usize,
}

impl Simulation {
    /// Build a session from configuration: seed the Life grid, create the
    /// mesh, and inject the startup stimulus.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::Config`] for non-finite energies or an
    /// invalid stimulus magnitude, [`TickError::Life`] for a zero grid
    /// size or an unknown pattern, and [`TickError::Mesh`] for a zero
    /// dimension or invalid mesh parameters.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, TickError> {
        config.validate()?;
        let size = config.world.grid_size;
        let pattern = Pattern::lookup(&config.life.seed_pattern)?;

        let mut life = LifeGrid::new(size)?;
        if config.life.random_density > 0.0 {
            let mut rng = StdRng::seed_from_u64(config.world.seed);
            life.seed_random(&mut rng, config.life.random_density);
        }
        life.seed_pattern(config.life.seed_x, config.life.seed_y, &pattern);

        let mesh = DeltaMesh::with_params(size, config.mesh.embedding_dim, config.mesh.params())?;
        let stimulus = StimulusInjector::new(config.stimulus.clone(), config.world.seed);

        let mut simulation = Self {
            life,
            mesh,
            seed: config.life.clone(),
            pattern,
            energy: config.energy.clone(),
            stimulus,
            tick: 0,
            epoch: 0,
            recent_passes: VecDeque::with_capacity(config.logging.pass_log_capacity),
            pass_log_capacity: config.logging.pass_log_capacity,
        };
        let injected = simulation.stimulus.inject_initial(&mut simulation.mesh)?;

        info!(
            size,
            dim = config.mesh.embedding_dim,
            pattern = pattern.name,
            seed_x = config.life.seed_x,
            seed_y = config.life.seed_y,
            live_cells = simulation.life.live_count(),
            initial_payloads = injected.len(),
            "Simulation initialized"
        );
        Ok(simulation)
    }

    /// Run one tick. See the module docs for the phase order.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::Mesh`] if the mesh rejects the energy field.
    /// The Life grid, the mesh and the tick counter are then unchanged.
    /// The stimulus batch runs after the commit; [`Simulation::from_config`]
    /// rejects every magnitude that could make it fail.
    pub fn run_tick(&mut self) -> Result<TickFrame, TickError> {
        let mut next = self.life.clone();
        let deltas = next.step();
        let snapshot = next.snapshot();
        let field = energy::derive_energy_field(&snapshot, &self.energy);
        let passes = self.mesh.step(&field)?;

        self.life = next;
        self.tick = self.tick.saturating_add(1);
        self.stimulus.on_tick(&mut self.mesh, self.tick)?;
        self.record_passes(&passes);

        let frame = TickFrame {
            epoch: self.epoch,
            tick: self.tick,
            generation: self.life.generation(),
            deltas,
            passes,
            live_cells: snapshot.live_count(),
            pending_payloads: self.mesh.pending_count(),
        };
        debug!(
            tick = frame.tick,
            deltas = frame.deltas.len(),
            passes = frame.passes.len(),
            live_cells = frame.live_cells,
            "Tick complete"
        );
        Ok(frame)
    }

    /// Clear the Life grid and re-seed the configured pattern. The
    /// generation counter returns to 0 and the epoch advances; the tick
    /// counter and the mesh are untouched.
    pub fn reset(&mut self) {
        self.life
            .reset(self.seed.seed_x, self.seed.seed_y, &self.pattern);
        self.epoch = self.epoch.saturating_add(1);
        info!(
            tick = self.tick,
            epoch = self.epoch,
            pattern = self.pattern.name,
            "Life grid reset"
        );
    }

    /// Inject a payload at `(x, y)` (wrapped onto the grid).
    ///
    /// Without an explicit vector, a random one of norm `magnitude` is
    /// generated from the stimulus RNG.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::Mesh`] if the cell already holds a payload or
    /// the vector has the wrong dimension or non-finite components.
    pub fn inject(
        &mut self,
        x: usize,
        y: usize,
        vector: Option<Vec<f32>>,
        magnitude: f32,
        id: impl Into<PayloadId>,
    ) -> Result<usize, TickError> {
        let index = self.mesh.coord_to_index(x, y);
        let vector =
            vector.unwrap_or_else(|| self.stimulus.random_vector(self.mesh.dim(), magnitude));
        self.mesh.inject(index, vector, id)?;
        Ok(index)
    }

    /// Ticks completed so far.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Resets applied so far. Two states with the same tick but a
    /// different epoch hold unrelated Life grids.
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Edge length of the shared grid.
    pub const fn size(&self) -> usize {
        self.life.size()
    }

    /// The Life grid.
    pub const fn life(&self) -> &LifeGrid {
        &self.life
    }

    /// The delta mesh.
    pub const fn mesh(&self) -> &DeltaMesh {
        &self.mesh
    }

    /// Current Life state.
    pub fn snapshot(&self) -> GridSnapshot {
        self.life.snapshot()
    }

    /// Up to `limit` most recent passes, newest first.
    pub fn recent_passes(&self, limit: usize) -> Vec<PassEvent> {
        self.recent_passes.iter().rev().take(limit).cloned().collect()
    }

    fn record_passes(&mut self, passes: &[PassEvent]) {
        if self.pass_log_capacity == 0 {
            return;
        }
        for pass in passes {
            if self.recent_passes.len() >= self.pass_log_capacity {
                self.recent_passes.pop_front();
            }
            self.recent_passes.push_back(pass.clone());
        }
    }
}
