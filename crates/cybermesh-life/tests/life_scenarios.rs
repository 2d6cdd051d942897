//! Scenario tests for the Life Engine: still lifes, oscillators, the
//! canonical glider, wraparound, and delta soundness.

#![allow(clippy::unwrap_used, clippy::cast_precision_loss)]

use std::collections::BTreeSet;

use cybermesh_life::patterns::{BEACON, BLINKER, BLOCK, GLIDER, R_PENTOMINO, TOAD};
use cybermesh_life::{LifeGrid, Pattern};
use cybermesh_types::{CellCoord, GridSnapshot};
use rand::SeedableRng;

fn seeded(size: usize, x: usize, y: usize, pattern: &Pattern) -> LifeGrid {
    let mut grid = LifeGrid::new(size).unwrap();
    grid.seed_pattern(x, y, pattern);
    grid
}

fn live_set(snapshot: &GridSnapshot) -> BTreeSet<CellCoord> {
    snapshot.live_cells().into_iter().collect()
}

fn shifted(cells: &BTreeSet<CellCoord>, dx: usize, dy: usize, size: usize) -> BTreeSet<CellCoord> {
    cells
        .iter()
        .map(|c| CellCoord::new((c.x + dx) % size, (c.y + dy) % size))
        .collect()
}

fn center_of_mass(cells: &[CellCoord]) -> (f64, f64) {
    let n = cells.len() as f64;
    let sx: f64 = cells.iter().map(|c| c.x as f64).sum();
    let sy: f64 = cells.iter().map(|c| c.y as f64).sum();
    (sx / n, sy / n)
}

#[test]
fn glider_end_to_end_on_8x8() {
    let mut grid = seeded(8, 1, 1, &GLIDER);
    let initial = live_set(&grid.snapshot());
    assert_eq!(initial.len(), 5);

    for _ in 0..4 {
        grid.step();
    }

    let after = grid.snapshot();
    assert_eq!(after.live_count(), 5);
    assert_eq!(live_set(&after), shifted(&initial, 1, 1, 8));
}

#[test]
fn glider_center_of_mass_moves_one_diagonal_per_period() {
    let mut grid = seeded(8, 1, 1, &GLIDER);
    let (x0, y0) = center_of_mass(&grid.snapshot().live_cells());
    for _ in 0..4 {
        grid.step();
    }
    let (x1, y1) = center_of_mass(&grid.snapshot().live_cells());
    assert!((x1 - x0 - 1.0).abs() < 1e-9);
    assert!((y1 - y0 - 1.0).abs() < 1e-9);
}

#[test]
fn glider_survives_fifty_steps_with_five_cells() {
    let mut grid = seeded(8, 1, 1, &GLIDER);
    for step in 0..50 {
        grid.step();
        assert_eq!(grid.live_count(), 5, "glider broke at step {step}");
    }
}

#[test]
fn glider_crosses_the_corner() {
    let mut grid = seeded(8, 6, 6, &GLIDER);
    let initial = live_set(&grid.snapshot());
    // Two full trips around the torus: 8 periods of 4 generations each.
    for _ in 0..32 {
        grid.step();
        assert_eq!(grid.live_count(), 5);
    }
    assert_eq!(live_set(&grid.snapshot()), shifted(&initial, 8, 8, 8));
    assert_eq!(live_set(&grid.snapshot()), initial);
}

#[test]
fn oscillators_return_after_two_steps() {
    for pattern in [BLINKER, TOAD, BEACON] {
        let mut grid = seeded(8, 2, 2, &pattern);
        let original = grid.snapshot();
        grid.step();
        assert_ne!(grid.snapshot(), original, "{} did not change", pattern.name);
        grid.step();
        assert_eq!(grid.snapshot(), original, "{} did not return", pattern.name);
    }
}

#[test]
fn block_is_unchanged_across_an_edge() {
    let mut grid = seeded(8, 7, 7, &BLOCK);
    let original = grid.snapshot();
    for _ in 0..25 {
        assert!(grid.step().is_empty());
    }
    assert_eq!(grid.snapshot(), original);
}

#[test]
fn deltas_match_snapshot_diff_every_step() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let mut grid = LifeGrid::new(16).unwrap();
    grid.seed_random(&mut rng, 0.35);
    grid.seed_pattern(3, 9, &R_PENTOMINO);

    for _ in 0..60 {
        let before = grid.snapshot();
        let deltas = grid.step();
        let after = grid.snapshot();
        assert_eq!(Some(deltas), before.diff(&after));
    }
}

#[test]
fn stable_grid_produces_no_deltas() {
    let mut grid = LifeGrid::new(8).unwrap();
    assert!(grid.step().is_empty());
    assert!(grid.step().is_empty());
    assert_eq!(grid.generation(), 2);
}

#[test]
fn birth_and_death_rules_in_situ() {
    // Three cells in an L: the empty corner of the 2x2 box is born, and
    // each existing cell has exactly two neighbors and survives.
    let mut grid = LifeGrid::new(8).unwrap();
    grid.set_cell(3, 3, true);
    grid.set_cell(4, 3, true);
    grid.set_cell(3, 4, true);
    let deltas = grid.step();
    assert_eq!(deltas.len(), 1);
    assert!(grid.is_alive(4, 4));
    assert_eq!(grid.live_count(), 4);

    // A lone cell dies of underpopulation.
    let mut grid = LifeGrid::new(8).unwrap();
    grid.set_cell(5, 5, true);
    grid.step();
    assert_eq!(grid.live_count(), 0);

    // A center with four neighbors dies of overpopulation.
    let mut grid = LifeGrid::new(8).unwrap();
    for (x, y) in [(4, 4), (3, 4), (5, 4), (4, 3), (4, 5)] {
        grid.set_cell(x, y, true);
    }
    assert_eq!(grid.neighbor_count(4, 4), 4);
    grid.step();
    assert!(!grid.is_alive(4, 4));
}
