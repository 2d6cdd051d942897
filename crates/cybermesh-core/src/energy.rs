//! Energy field derivation: Life state in, per-cell routing bias out.

use cybermesh_types::{EnergyField, GridSnapshot};

use crate::config::EnergyConfig;

/// Energy every cell gets when no Life-derived field is in use.
pub const NEUTRAL_ENERGY: f32 = 0.5;

/// A field that biases no cell over another.
pub fn neutral_field(size: usize) -> EnergyField {
    EnergyField::uniform(size, NEUTRAL_ENERGY)
}

/// Map a Life snapshot to the mesh energy field.
///
/// Live cells get `alive_energy`, dead cells `dead_energy`. With the
/// defaults (0.75 / 0.25) this is `0.5 * alive + 0.25`. A disabled config
/// yields [`neutral_field`].
pub fn derive_energy_field(snapshot: &GridSnapshot, config: &EnergyConfig) -> EnergyField {
    if !config.enabled {
        return neutral_field(snapshot.size());
    }
    EnergyField::from_fn(snapshot.size(), |x, y| {
        if snapshot.is_alive(x, y) {
            config.alive_energy
        } else {
            config.dead_energy
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_cells_get_more_energy() {
        let snapshot = GridSnapshot::from_fn(4, |x, y| (x, y) == (1, 2));
        let field = derive_energy_field(&snapshot, &EnergyConfig::default());
        assert_eq!(field.size(), 4);
        assert!((field.get(1, 2) - 0.75).abs() < f32::EPSILON);
        assert!((field.get(0, 0) - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn disabled_config_is_neutral() {
        let snapshot = GridSnapshot::from_fn(3, |_, _| true);
        let config = EnergyConfig {
            enabled: false,
            ..EnergyConfig::default()
        };
        let field = derive_energy_field(&snapshot, &config);
        assert_eq!(field, neutral_field(3));
    }
}
