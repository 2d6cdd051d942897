//! Seed patterns for the Life grid.
//!
//! Each pattern is a fixed set of `(dx, dy)` offsets (column, row)
//! relative to the seeding origin. Offsets are added to the origin and
//! wrapped onto the grid, so a pattern seeded near an edge continues on
//! the opposite side.

use crate::error::LifeError;

/// A named set of live-cell offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pattern {
    /// Display name, also used for lookup.
    pub name: &'static str,
    /// Live cells as `(dx, dy)` offsets from the origin.
    pub cells: &'static [(usize, usize)],
}

/// The canonical glider, travelling `(+1, +1)` every 4 generations.
///
/// ```text
/// .X.
/// ..X
/// XXX
/// ```
pub const GLIDER: Pattern = Pattern {
    name: "glider",
    cells: &[(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)],
};

/// Period-2 oscillator, horizontal phase.
pub const BLINKER: Pattern = Pattern {
    name: "blinker",
    cells: &[(0, 0), (1, 0), (2, 0)],
};

/// 2x2 still life.
pub const BLOCK: Pattern = Pattern {
    name: "block",
    cells: &[(0, 0), (1, 0), (0, 1), (1, 1)],
};

/// Period-2 oscillator.
pub const TOAD: Pattern = Pattern {
    name: "toad",
    cells: &[(1, 0), (2, 0), (3, 0), (0, 1), (1, 1), (2, 1)],
};

/// Period-2 oscillator made of two diagonal blocks.
pub const BEACON: Pattern = Pattern {
    name: "beacon",
    cells: &[
        (0, 0),
        (1, 0),
        (0, 1),
        (1, 1),
        (2, 2),
        (3, 2),
        (2, 3),
        (3, 3),
    ],
};

/// Methuselah; on small tori it burns out quickly.
pub const R_PENTOMINO: Pattern = Pattern {
    name: "r-pentomino",
    cells: &[(1, 0), (2, 0), (0, 1), (1, 1), (1, 2)],
};

/// Every built-in pattern.
pub const PATTERNS: &[Pattern] = &[GLIDER, BLINKER, BLOCK, TOAD, BEACON, R_PENTOMINO];

impl Pattern {
    /// Look up a built-in pattern by name.
    ///
    /// Matching ignores ASCII case and treats `_` and `-` alike, so
    /// `R_Pentomino` resolves to [`R_PENTOMINO`].
    pub fn lookup(name: &str) -> Result<Self, LifeError> {
        let wanted = name.trim().to_ascii_lowercase().replace('_', "-");
        PATTERNS
            .iter()
            .find(|pattern| pattern.name == wanted)
            .copied()
            .ok_or_else(|| LifeError::UnknownPattern {
                name: name.to_owned(),
            })
    }

    /// Number of live cells in the pattern.
    pub const fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the pattern has no cells.
    pub const fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
