//! The toroidal Life grid.
//!
//! [`LifeGrid`] exclusively owns its cells. Callers read state through
//! [`LifeGrid::snapshot`], which returns a deep copy, or through the
//! delta list returned by [`LifeGrid::step`]. The grid's dimensions never
//! change after construction.

use cybermesh_types::grid::wrap;
use cybermesh_types::{CellCoord, CellDelta, GridSnapshot};
use rand::Rng;
use tracing::debug;

use crate::error::LifeError;
use crate::patterns::Pattern;
use crate::rules;

/// Position of a neighbor along one axis, relative to the center.
#[derive(Clone, Copy)]
enum Offset {
    Prev,
    Same,
    Next,
}

/// The 8 Moore-neighbor offsets as `(dx, dy)`.
const MOORE: [(Offset, Offset); 8] = [
    (Offset::Prev, Offset::Prev),
    (Offset::Same, Offset::Prev),
    (Offset::Next, Offset::Prev),
    (Offset::Prev, Offset::Same),
    (Offset::Next, Offset::Same),
    (Offset::Prev, Offset::Next),
    (Offset::Same, Offset::Next),
    (Offset::Next, Offset::Next),
];

/// Move `value` one step along an axis of length `size`, wrapping.
fn shift(value: usize, offset: Offset, size: usize) -> usize {
    let value = wrap(value, size);
    match offset {
        Offset::Prev => wrap(value.saturating_add(size).saturating_sub(1), size),
        Offset::Same => value,
        Offset::Next => wrap(value.saturating_add(1), size),
    }
}

/// Count live Moore neighbors of `(x, y)` in a row-major cell slice.
///
/// Reads only from `cells`; the caller guarantees the slice is a stable
/// snapshot that is not being written during the count. On grids smaller
/// than 3x3 several offsets land on the same cell (or the center itself)
/// and each landing is counted, exactly as per-offset modulo arithmetic
/// prescribes.
fn count_neighbors(cells: &[bool], size: usize, x: usize, y: usize) -> u8 {
    let mut count: u8 = 0;
    for (dx, dy) in MOORE {
        let nx = shift(x, dx, size);
        let ny = shift(y, dy, size);
        let index = CellCoord::new(nx, ny).to_index(size);
        if cells.get(index).copied().unwrap_or(false) {
            count = count.saturating_add(1);
        }
    }
    count
}

/// A square toroidal Game of Life grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifeGrid {
    /// Edge length (fixed at construction, at least 1).
    size: usize,
    /// Cell states in row-major order, `size * size` entries.
    cells: Vec<bool>,
    /// Number of steps taken since construction or the last reset.
    generation: u64,
}

impl LifeGrid {
    /// Create an all-dead `size` x `size` grid at generation 0.
    ///
    /// # Errors
    ///
    /// Returns [`LifeError::InvalidSize`] if `size` is 0.
    pub fn new(size: usize) -> Result<Self, LifeError> {
        if size == 0 {
            return Err(LifeError::InvalidSize { size });
        }
        let cell_count = size
            .checked_mul(size)
            .ok_or(LifeError::InvalidSize { size })?;
        Ok(Self {
            size,
            cells: vec![false; cell_count],
            generation: 0,
        })
    }

    /// Edge length of the grid.
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Number of steps taken since construction or the last reset.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the cell at `(x, y)` is alive. Coordinates wrap.
    pub fn is_alive(&self, x: usize, y: usize) -> bool {
        let index = CellCoord::new(x, y).to_index(self.size);
        self.cells.get(index).copied().unwrap_or(false)
    }

    /// Set the cell at `(x, y)`. Coordinates wrap.
    pub fn set_cell(&mut self, x: usize, y: usize, alive: bool) {
        let index = CellCoord::new(x, y).to_index(self.size);
        if let Some(cell) = self.cells.get_mut(index) {
            *cell = alive;
        }
    }

    /// Flip the cell at `(x, y)` and return its new state.
    pub fn toggle_cell(&mut self, x: usize, y: usize) -> bool {
        let alive = !self.is_alive(x, y);
        self.set_cell(x, y, alive);
        alive
    }

    /// Number of live cells.
    pub fn live_count(&self) -> usize {
        self.cells.iter().filter(|alive| **alive).count()
    }

    /// Count live cells among the 8 Moore neighbors of `(x, y)`, with each
    /// axis wrapped independently. The center cell is not counted.
    pub fn neighbor_count(&self, x: usize, y: usize) -> u8 {
        count_neighbors(&self.cells, self.size, x, y)
    }

    /// Advance the grid one generation and return every cell that changed.
    ///
    /// All next states are computed against the pre-step grid into a fresh
    /// buffer, which then replaces the grid in one move. Deltas are listed
    /// in row-major order.
    pub fn step(&mut self) -> Vec<CellDelta> {
        let current = &self.cells;
        let mut next = Vec::with_capacity(current.len());
        let mut deltas = Vec::new();

        for (index, &alive) in current.iter().enumerate() {
            let coord = CellCoord::from_index(index, self.size);
            let neighbors = count_neighbors(current, self.size, coord.x, coord.y);
            let next_alive = rules::next_state(alive, neighbors);
            if next_alive != alive {
                deltas.push(CellDelta {
                    x: coord.x,
                    y: coord.y,
                    alive: next_alive,
                });
            }
            next.push(next_alive);
        }

        self.cells = next;
        self.generation = self.generation.saturating_add(1);

        debug!(
            generation = self.generation,
            changed = deltas.len(),
            live = self.live_count(),
            "Life step"
        );

        deltas
    }

    /// Set every cell of `pattern` alive, offset from origin `(x, y)`.
    ///
    /// Each coordinate is wrapped before being written. The rest of the
    /// grid is left untouched.
    pub fn seed_pattern(&mut self, x: usize, y: usize, pattern: &Pattern) {
        for &(dx, dy) in pattern.cells {
            let cx = wrap(x, self.size).saturating_add(wrap(dx, self.size));
            let cy = wrap(y, self.size).saturating_add(wrap(dy, self.size));
            self.set_cell(cx, cy, true);
        }
        debug!(pattern = pattern.name, x, y, "Pattern seeded");
    }

    /// Fill the grid with random live cells, each alive with probability
    /// `density` (clamped to `0.0..=1.0`). Existing live cells stay alive.
    pub fn seed_random<R: Rng>(&mut self, rng: &mut R, density: f64) {
        let density = if density.is_finite() {
            density.clamp(0.0, 1.0)
        } else {
            0.0
        };
        for cell in &mut self.cells {
            if rng.random_bool(density) {
                *cell = true;
            }
        }
        debug!(density, live = self.live_count(), "Random soup seeded");
    }

    /// Kill every cell. The generation counter is kept.
    pub fn clear(&mut self) {
        self.cells.fill(false);
    }

    /// Clear the grid, reset the generation counter, and seed `pattern`
    /// at `(x, y)`.
    pub fn reset(&mut self, x: usize, y: usize, pattern: &Pattern) {
        self.clear();
        self.generation = 0;
        self.seed_pattern(x, y, pattern);
    }

    /// A deep copy of the current grid.
    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot::from_fn(self.size, |x, y| self.is_alive(x, y))
    }
}
