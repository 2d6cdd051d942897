//! Configuration loading and typed config structures for the CyberMesh
//! simulation.
//!
//! The canonical configuration lives in `cybermesh-config.yaml` at the
//! project root. Every section and field is optional; missing values take
//! the defaults below, which reproduce the reference setup: an 8x8 grid
//! ticking every 500 ms with a glider at (1, 1) and a 384-dimensional
//! mesh.

use std::path::Path;

use cybermesh_mesh::{MeshParams, RoutingPolicy};
use serde::Deserialize;
use tracing::warn;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is outside its allowed range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What the value must satisfy.
        reason: &'static str,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `cybermesh-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Grid size, timing, and seed.
    #[serde(default)]
    pub world: WorldConfig,

    /// Initial Life pattern and random soup.
    #[serde(default)]
    pub life: LifeConfig,

    /// Embedding dimension and routing parameters.
    #[serde(default)]
    pub mesh: MeshConfig,

    /// Life-to-energy mapping.
    #[serde(default)]
    pub energy: EnergyConfig,

    /// Automatic payload injection.
    #[serde(default)]
    pub stimulus: StimulusConfig,

    /// Observer server binding.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Simulation boundary parameters.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for the observer binding:
    /// - `OBSERVER_HOST` overrides `infrastructure.observer_host`
    /// - `OBSERVER_PORT` overrides `infrastructure.observer_port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML or carries
    /// invalid routing weights, or [`ConfigError::Invalid`] as for
    /// [`validate`](Self::validate).
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] as for [`validate`](Self::validate).
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        config.infrastructure.apply_env_overrides();
        Ok(config)
    }

    /// Check the values serde cannot: energies must be finite and the
    /// stimulus magnitude finite and positive.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.energy.validate()?;
        self.stimulus.validate()
    }
}

/// Grid and timing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable simulation name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Seed for random soup and stimulus vectors.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Edge length of the square grid shared by Life and the mesh.
    #[serde(default = "default_grid_size")]
    pub grid_size: usize,

    /// Real-time milliseconds per tick.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            grid_size: default_grid_size(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// Initial Life state. Also used by `reset`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LifeConfig {
    /// Name of the seed pattern (see `cybermesh_life::PATTERNS`).
    #[serde(default = "default_seed_pattern")]
    pub seed_pattern: String,

    /// Column of the pattern origin.
    #[serde(default = "default_seed_offset")]
    pub seed_x: usize,

    /// Row of the pattern origin.
    #[serde(default = "default_seed_offset")]
    pub seed_y: usize,

    /// Probability that each cell starts alive before the pattern is
    /// stamped on top. 0 disables the random soup.
    #[serde(default)]
    pub random_density: f64,
}

impl Default for LifeConfig {
    fn default() -> Self {
        Self {
            seed_pattern: default_seed_pattern(),
            seed_x: default_seed_offset(),
            seed_y: default_seed_offset(),
            random_density: 0.0,
        }
    }
}

/// Delta mesh configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeshConfig {
    /// Embedding dimension.
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,

    /// Similarity/energy weights. Rejected at parse time unless finite,
    /// non-negative, and summing to 1.
    #[serde(default)]
    pub routing: RoutingPolicy,

    /// Merge learning rate, in (0, 1].
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,

    /// Prior vectors kept per cell.
    #[serde(default = "default_history_len")]
    pub history_len: usize,
}

impl MeshConfig {
    /// The mesh parameters this section describes.
    pub const fn params(&self) -> MeshParams {
        MeshParams {
            routing: self.routing,
            learning_rate: self.learning_rate,
            history_len: self.history_len,
        }
    }
}

impl Default for MeshConfig {
    fn default() -> Self {
        let params = MeshParams::default();
        Self {
            embedding_dim: default_embedding_dim(),
            routing: params.routing,
            learning_rate: params.learning_rate,
            history_len: params.history_len,
        }
    }
}

/// How Life state becomes the mesh energy field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnergyConfig {
    /// When false every cell gets the neutral energy 0.5.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Energy of a live cell.
    #[serde(default = "default_alive_energy")]
    pub alive_energy: f32,

    /// Energy of a dead cell.
    #[serde(default = "default_dead_energy")]
    pub dead_energy: f32,
}

impl EnergyConfig {
    /// Both energies must be finite, or the mesh rejects every field.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a NaN or infinite energy.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if !self.alive_energy.is_finite() {
            return Err(ConfigError::Invalid {
                field: "energy.alive_energy",
                reason: "must be finite",
            });
        }
        if !self.dead_energy.is_finite() {
            return Err(ConfigError::Invalid {
                field: "energy.dead_energy",
                reason: "must be finite",
            });
        }
        Ok(())
    }
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            alive_energy: default_alive_energy(),
            dead_energy: default_dead_energy(),
        }
    }
}

/// Automatic payload injection into idle cells.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StimulusConfig {
    /// Whether the injector runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Payloads injected at startup.
    #[serde(default = "default_initial_payloads")]
    pub initial_payloads: usize,

    /// Inject a new batch every N ticks (0 = startup only).
    #[serde(default)]
    pub interval_ticks: u64,

    /// Payloads per periodic batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// L2 norm of generated payload vectors.
    #[serde(default = "default_magnitude")]
    pub magnitude: f32,
}

impl StimulusConfig {
    /// The magnitude must be finite and positive.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for any other magnitude.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if !self.magnitude.is_finite() || self.magnitude <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "stimulus.magnitude",
                reason: "must be finite and positive",
            });
        }
        Ok(())
    }
}

impl Default for StimulusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_payloads: default_initial_payloads(),
            interval_ticks: 0,
            batch_size: default_batch_size(),
            magnitude: default_magnitude(),
        }
    }
}

/// Observer server binding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// Interface the observer binds to.
    #[serde(default = "default_observer_host")]
    pub observer_host: String,

    /// Observer HTTP/WebSocket port.
    #[serde(default = "default_observer_port")]
    pub observer_port: u16,
}

impl InfrastructureConfig {
    /// Override the observer binding with environment variables when set.
    ///
    /// An `OBSERVER_PORT` that is not a valid port is ignored with a
    /// warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("OBSERVER_HOST") {
            self.observer_host = val;
        }
        if let Ok(val) = std::env::var("OBSERVER_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.observer_port = port,
                Err(e) => warn!(value = %val, error = %e, "Ignoring invalid OBSERVER_PORT"),
            }
        }
    }
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            observer_host: default_observer_host(),
            observer_port: default_observer_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,

    /// Passes kept for `/api/passes`.
    #[serde(default = "default_pass_log_capacity")]
    pub pass_log_capacity: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            pass_log_capacity: default_pass_log_capacity(),
        }
    }
}

/// Simulation boundary configuration.
///
/// A value of 0 for either limit means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Maximum number of ticks before the simulation ends (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,

    /// Maximum wall-clock seconds before the simulation ends (0 = unlimited).
    #[serde(default)]
    pub max_real_time_seconds: u64,

    /// Start paused and wait for an operator `resume` or a `start` command.
    #[serde(default)]
    pub start_paused: bool,
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    "CyberMesh".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_grid_size() -> usize {
    8
}

const fn default_tick_interval_ms() -> u64 {
    500
}

fn default_seed_pattern() -> String {
    "glider".to_owned()
}

const fn default_seed_offset() -> usize {
    1
}

const fn default_embedding_dim() -> usize {
    384
}

const fn default_learning_rate() -> f32 {
    cybermesh_mesh::routing::DEFAULT_LEARNING_RATE
}

const fn default_history_len() -> usize {
    cybermesh_mesh::routing::DEFAULT_HISTORY_LEN
}

const fn default_alive_energy() -> f32 {
    0.75
}

const fn default_dead_energy() -> f32 {
    0.25
}

const fn default_initial_payloads() -> usize {
    1
}

const fn default_batch_size() -> usize {
    1
}

const fn default_magnitude() -> f32 {
    1.0
}

fn default_observer_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_observer_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_pass_log_capacity() -> usize {
    256
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_reference_setup() {
        let config = SimulationConfig::default();
        assert_eq!(config.world.grid_size, 8);
        assert_eq!(config.world.tick_interval_ms, 500);
        assert_eq!(config.life.seed_pattern, "glider");
        assert_eq!((config.life.seed_x, config.life.seed_y), (1, 1));
        assert_eq!(config.mesh.embedding_dim, 384);
        assert!((config.mesh.routing.cosine_weight() - 0.7).abs() < f32::EPSILON);
        assert!((config.mesh.learning_rate - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.mesh.history_len, 4);
        assert!((config.energy.alive_energy - 0.75).abs() < f32::EPSILON);
        assert_eq!(config.infrastructure.observer_port, 8000);
        assert_eq!(config.simulation.max_ticks, 0);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
world:
  name: "Test Mesh"
  seed: 7
  grid_size: 16
  tick_interval_ms: 250

life:
  seed_pattern: "r-pentomino"
  seed_x: 4
  seed_y: 5
  random_density: 0.2

mesh:
  embedding_dim: 64
  routing:
    cosine_weight: 0.5
    energy_weight: 0.5
  learning_rate: 0.25
  history_len: 2

energy:
  enabled: false
  alive_energy: 1.0
  dead_energy: 0.0

stimulus:
  enabled: true
  initial_payloads: 3
  interval_ticks: 10
  batch_size: 2
  magnitude: 2.0

infrastructure:
  observer_host: "127.0.0.1"
  observer_port: 9090

logging:
  level: "debug"
  json: true
  pass_log_capacity: 32

simulation:
  max_ticks: 100
  max_real_time_seconds: 60
  start_paused: true
"#;

        let config = SimulationConfig::parse(yaml);
        assert!(config.is_ok(), "{config:?}");
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.world.name, "Test Mesh");
        assert_eq!(config.world.grid_size, 16);
        assert_eq!(config.life.seed_pattern, "r-pentomino");
        assert_eq!(config.mesh.embedding_dim, 64);
        assert!((config.mesh.routing.energy_weight() - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.mesh.params().history_len, 2);
        assert!(!config.energy.enabled);
        assert_eq!(config.stimulus.interval_ticks, 10);
        assert!(config.logging.json);
        assert_eq!(config.simulation.max_ticks, 100);
        assert!(config.simulation.start_paused);
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "world:\n  grid_size: 12\n";
        let config = SimulationConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.world.grid_size, 12);
        // Everything else uses defaults
        assert_eq!(config.world.tick_interval_ms, 500);
        assert_eq!(config.mesh, MeshConfig::default());
    }

    #[test]
    fn routing_weights_must_sum_to_one() {
        let yaml = "mesh:\n  routing:\n    cosine_weight: 0.9\n    energy_weight: 0.3\n";
        let config = SimulationConfig::parse(yaml);
        assert!(matches!(config, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn negative_routing_weight_is_rejected() {
        let yaml = "mesh:\n  routing:\n    cosine_weight: 1.5\n    energy_weight: -0.5\n";
        assert!(SimulationConfig::parse(yaml).is_err());
    }

    #[test]
    fn non_finite_energy_is_rejected() {
        let config = SimulationConfig::parse("energy:\n  alive_energy: .nan\n");
        assert!(matches!(
            config,
            Err(ConfigError::Invalid {
                field: "energy.alive_energy",
                ..
            })
        ));

        let config = SimulationConfig::parse("energy:\n  dead_energy: -.inf\n");
        assert!(matches!(
            config,
            Err(ConfigError::Invalid {
                field: "energy.dead_energy",
                ..
            })
        ));
    }

    #[test]
    fn stimulus_magnitude_must_be_positive() {
        for value in [".inf", ".nan", "0.0", "-1.0"] {
            let yaml = format!("stimulus:\n  magnitude: {value}\n");
            assert!(
                matches!(
                    SimulationConfig::parse(&yaml),
                    Err(ConfigError::Invalid {
                        field: "stimulus.magnitude",
                        ..
                    })
                ),
                "magnitude {value} accepted"
            );
        }
        assert!(SimulationConfig::parse("stimulus:\n  magnitude: 0.5\n").is_ok());
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("cybermesh-config.yaml");
        if path.exists() {
            let config = SimulationConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
