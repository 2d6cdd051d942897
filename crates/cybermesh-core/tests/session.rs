//! Session-level tests: the glider scenario through the full tick cycle,
//! delta replay, and the stimulus lifecycle.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;

use cybermesh_core::config::SimulationConfig;
use cybermesh_core::tick::Simulation;
use cybermesh_types::CellCoord;

fn live(sim: &Simulation) -> BTreeSet<CellCoord> {
    sim.snapshot().live_cells().into_iter().collect()
}

#[test]
fn glider_moves_one_diagonal_in_four_ticks() {
    let mut sim = Simulation::from_config(&SimulationConfig::default()).unwrap();
    let initial = live(&sim);
    assert_eq!(initial.len(), 5);

    for _ in 0..4 {
        sim.run_tick().unwrap();
    }

    let expected: BTreeSet<CellCoord> = initial
        .iter()
        .map(|c| CellCoord::new((c.x + 1) % 8, (c.y + 1) % 8))
        .collect();
    assert_eq!(live(&sim), expected);
    assert_eq!(sim.tick(), 4);
}

#[test]
fn replaying_frame_deltas_reproduces_the_grid() {
    let yaml = "world:\n  grid_size: 12\nlife:\n  seed_pattern: r-pentomino\n  seed_x: 4\n  seed_y: 4\n";
    let mut sim = Simulation::from_config(&SimulationConfig::parse(yaml).unwrap()).unwrap();
    let size = sim.size();
    let mut rows = sim.snapshot().rows();

    for _ in 0..40 {
        let frame = sim.run_tick().unwrap();
        for delta in &frame.deltas {
            rows[delta.y][delta.x] = u8::from(delta.alive);
        }
        assert_eq!(rows, sim.snapshot().rows(), "diverged at tick {}", frame.tick);
        assert_eq!(rows.len(), size);
    }
}

#[test]
fn startup_stimulus_passes_once_then_mesh_goes_quiet() {
    let mut sim = Simulation::from_config(&SimulationConfig::default()).unwrap();
    assert_eq!(sim.mesh().pending_count(), 1);

    let first = sim.run_tick().unwrap();
    assert_eq!(first.passes.len(), 1);
    assert!(first.passes[0].payload_id.as_str().starts_with("stim-0-"));
    assert_eq!(first.pending_payloads, 0);

    for _ in 0..5 {
        assert!(sim.run_tick().unwrap().passes.is_empty());
    }
    assert_eq!(sim.recent_passes(10).len(), 1);
}

#[test]
fn periodic_stimulus_keeps_payloads_flowing() {
    let yaml = "mesh:\n  embedding_dim: 32\nstimulus:\n  initial_payloads: 0\n  interval_ticks: 2\n  batch_size: 3\n";
    let mut sim = Simulation::from_config(&SimulationConfig::parse(yaml).unwrap()).unwrap();
    assert_eq!(sim.mesh().pending_count(), 0);

    let counts: Vec<usize> = (0..6)
        .map(|_| sim.run_tick().unwrap().passes.len())
        .collect();
    // Batches land at the end of ticks 2 and 4 and move on the next tick.
    assert_eq!(counts, vec![0, 0, 3, 0, 3, 0]);
}

#[test]
fn only_recipients_change_fingerprint() {
    let mut sim = Simulation::from_config(&SimulationConfig::default()).unwrap();
    let before: Vec<String> = sim
        .mesh()
        .cell_summaries()
        .into_iter()
        .map(|s| s.fingerprint)
        .collect();
    let frame = sim.run_tick().unwrap();
    let after: Vec<String> = sim
        .mesh()
        .cell_summaries()
        .into_iter()
        .map(|s| s.fingerprint)
        .collect();

    let changed: Vec<usize> = (0..before.len())
        .filter(|i| before[*i] != after[*i])
        .collect();
    let recipients: Vec<usize> = frame.passes.iter().map(|p| p.to_index).collect();
    assert_eq!(changed, recipients);
}
