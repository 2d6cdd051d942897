//! Grid coordinates, Life deltas, snapshots and energy fields.
//!
//! Every coordinate in the workspace uses the same axis convention:
//! `x` is the column and `y` is the row. Flat cell indices are row-major,
//! `index = y * size + x`, so `x = index % size` and `y = index / size`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A cell position on a square toroidal grid (`x` = column, `y` = row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CellCoord {
    /// Column.
    pub x: usize,
    /// Row.
    pub y: usize,
}

impl CellCoord {
    /// Create a coordinate from a column and a row.
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Convert a row-major flat index into a coordinate on a `size`-wide grid.
    ///
    /// Returns `(0, 0)` for a zero-sized grid.
    pub const fn from_index(index: usize, size: usize) -> Self {
        let x = match index.checked_rem(size) {
            Some(x) => x,
            None => 0,
        };
        let y = match index.checked_div(size) {
            Some(y) => y,
            None => 0,
        };
        Self { x, y }
    }

    /// Convert this coordinate into a row-major flat index, wrapping both
    /// axes onto a `size`-wide grid first.
    ///
    /// Returns 0 for a zero-sized grid.
    pub fn to_index(self, size: usize) -> usize {
        let x = wrap(self.x, size);
        let y = wrap(self.y, size);
        y.saturating_mul(size).saturating_add(x)
    }
}

/// One Life cell whose state changed during a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CellDelta {
    /// Column of the changed cell.
    pub x: usize,
    /// Row of the changed cell.
    pub y: usize,
    /// The cell's state after the step.
    pub alive: bool,
}

impl CellDelta {
    /// Return the position of this delta.
    pub const fn coord(&self) -> CellCoord {
        CellCoord::new(self.x, self.y)
    }
}

/// Reduce `value` modulo `size`, returning 0 when `size` is 0.
pub const fn wrap(value: usize, size: usize) -> usize {
    match value.checked_rem(size) {
        Some(v) => v,
        None => 0,
    }
}

/// A deep, immutable copy of a Life grid.
///
/// Snapshots never alias engine storage: they are built cell by cell from
/// the engine's state and owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSnapshot {
    size: usize,
    cells: Vec<bool>,
}

impl GridSnapshot {
    /// Build a snapshot by evaluating `alive(x, y)` for every cell in
    /// row-major order.
    pub fn from_fn(size: usize, mut alive: impl FnMut(usize, usize) -> bool) -> Self {
        let mut cells = Vec::with_capacity(size.saturating_mul(size));
        for y in 0..size {
            for x in 0..size {
                cells.push(alive(x, y));
            }
        }
        Self { size, cells }
    }

    /// An all-dead snapshot.
    pub fn empty(size: usize) -> Self {
        Self::from_fn(size, |_, _| false)
    }

    /// Edge length of the grid.
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Whether the cell at `(x, y)` is alive. Coordinates wrap.
    pub fn is_alive(&self, x: usize, y: usize) -> bool {
        let index = CellCoord::new(x, y).to_index(self.size);
        self.cells.get(index).copied().unwrap_or(false)
    }

    /// Number of live cells.
    pub fn live_count(&self) -> usize {
        self.cells.iter().filter(|alive| **alive).count()
    }

    /// Positions of all live cells in row-major order.
    pub fn live_cells(&self) -> Vec<CellCoord> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(index, _)| CellCoord::from_index(index, self.size))
            .collect()
    }

    /// The grid as `size` rows of `size` 0/1 values, the full-state wire
    /// shape.
    pub fn rows(&self) -> Vec<Vec<u8>> {
        self.cells
            .chunks(self.size.max(1))
            .map(|row| row.iter().map(|alive| u8::from(*alive)).collect())
            .collect()
    }

    /// The deltas that turn `self` into `next`, in row-major order.
    ///
    /// Returns `None` if the two snapshots have different sizes.
    pub fn diff(&self, next: &Self) -> Option<Vec<CellDelta>> {
        if self.size != next.size {
            return None;
        }
        let deltas = self
            .cells
            .iter()
            .zip(&next.cells)
            .enumerate()
            .filter(|(_, (before, after))| before != after)
            .map(|(index, (_, after))| {
                let coord = CellCoord::from_index(index, self.size);
                CellDelta {
                    x: coord.x,
                    y: coord.y,
                    alive: *after,
                }
            })
            .collect();
        Some(deltas)
    }
}

/// A grid-shaped field of per-cell scalar energy used to bias mesh routing.
///
/// The field is derived from Life state by the orchestration layer; the
/// mesh only reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyField {
    size: usize,
    values: Vec<f32>,
}

impl EnergyField {
    /// Build a field by evaluating `energy(x, y)` for every cell in
    /// row-major order.
    pub fn from_fn(size: usize, mut energy: impl FnMut(usize, usize) -> f32) -> Self {
        let mut values = Vec::with_capacity(size.saturating_mul(size));
        for y in 0..size {
            for x in 0..size {
                values.push(energy(x, y));
            }
        }
        Self { size, values }
    }

    /// A field with the same value everywhere.
    pub fn uniform(size: usize, value: f32) -> Self {
        Self::from_fn(size, |_, _| value)
    }

    /// Edge length of the field.
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Energy at `(x, y)`. Coordinates wrap; a zero-sized field reads 0.
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.at_index(CellCoord::new(x, y).to_index(self.size))
            .unwrap_or(0.0)
    }

    /// Energy at a row-major flat index, if in range.
    pub fn at_index(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied()
    }

    /// Whether every value in the field is finite.
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}
