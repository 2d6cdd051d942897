//! Conway's B3/S23 transition table.

/// Compute a cell's next state from its current state and its live
/// Moore-neighbor count.
///
/// | current | neighbors | next |
/// |---------|-----------|------|
/// | dead    | 3         | alive (birth) |
/// | dead    | other     | dead |
/// | alive   | 2 or 3    | alive (survival) |
/// | alive   | <2 or >3  | dead |
pub const fn next_state(alive: bool, live_neighbors: u8) -> bool {
    matches!((alive, live_neighbors), (true, 2 | 3) | (false, 3))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underpopulation_kills() {
        assert!(!next_state(true, 0));
        assert!(!next_state(true, 1));
    }

    #[test]
    fn two_or_three_neighbors_survive() {
        assert!(next_state(true, 2));
        assert!(next_state(true, 3));
    }

    #[test]
    fn overpopulation_kills_or_keeps_dead() {
        for n in 4..=8 {
            assert!(!next_state(true, n), "alive with {n} neighbors should die");
            assert!(!next_state(false, n), "dead with {n} neighbors should stay dead");
        }
    }

    #[test]
    fn birth_only_on_exactly_three() {
        for n in 0..=8 {
            assert_eq!(next_state(false, n), n == 3, "dead cell with {n} neighbors");
        }
    }
}
