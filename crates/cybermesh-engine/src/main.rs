//! Engine binary for the CyberMesh simulation.
//!
//! Wires the Life grid, the delta mesh and the observer server together
//! and drives the tick loop until a termination condition is met.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (first argument, `CYBERMESH_CONFIG`, or
//!    `cybermesh-config.yaml`; defaults when the file is absent)
//! 2. Initialize structured logging (tracing)
//! 3. Build the simulation session and inject the startup stimulus
//! 4. Create operator state from simulation bounds
//! 5. Spawn the observer server
//! 6. Run the tick loop
//! 7. Log the result and keep serving until Ctrl-C

mod error;
mod observer_callback;

use std::path::PathBuf;
use std::sync::Arc;

use cybermesh_core::config::SimulationConfig;
use cybermesh_core::operator::OperatorState;
use cybermesh_core::runner;
use cybermesh_core::tick::Simulation;
use cybermesh_observer::server::ServerConfig;
use cybermesh_observer::state::{AppState, ObserverSnapshot};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::observer_callback::ObserverCallback;

/// Config file used when neither an argument nor `CYBERMESH_CONFIG`
/// names one.
const DEFAULT_CONFIG_PATH: &str = "cybermesh-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let config_path = config_path();
    let config_found = config_path.exists();
    let config = if config_found {
        SimulationConfig::from_file(&config_path)?
    } else {
        SimulationConfig::default()
    };

    // 2. Initialize structured logging. RUST_LOG wins over the config.
    init_logging(&config);

    info!("cybermesh-engine starting");
    if config_found {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(
        world_name = config.world.name,
        seed = config.world.seed,
        grid_size = config.world.grid_size,
        tick_interval_ms = config.world.tick_interval_ms,
        embedding_dim = config.mesh.embedding_dim,
        "Configuration resolved"
    );

    // 3. Build the session.
    let mut simulation = Simulation::from_config(&config)?;

    // 4. Create operator state.
    let operator = Arc::new(OperatorState::new(
        config.world.tick_interval_ms,
        &config.simulation,
    ));
    info!(
        max_ticks = operator.max_ticks(),
        max_real_time_seconds = operator.max_real_time_seconds(),
        paused = operator.is_paused(),
        "Operator state initialized"
    );

    // 5. Start the observer server.
    let pass_limit = config.logging.pass_log_capacity;
    let app_state = Arc::new(AppState::with_operator(
        ObserverSnapshot::capture(&simulation, pass_limit),
        Arc::clone(&operator),
    ));
    let server_config = ServerConfig {
        host: config.infrastructure.observer_host.clone(),
        port: config.infrastructure.observer_port,
    };
    let observer_handle =
        cybermesh_observer::spawn_observer(server_config, Arc::clone(&app_state))?;

    // 6. Run the simulation. Ctrl-C aborts the loop.
    let mut callback = ObserverCallback::new(app_state, pass_limit);
    let outcome = tokio::select! {
        result = runner::run_simulation(&mut simulation, &operator, &mut callback) => Some(result?),
        signal = tokio::signal::ctrl_c() => {
            signal?;
            None
        }
    };

    // 7. Log results, then keep the final state queryable.
    let Some(result) = outcome else {
        info!(tick = simulation.tick(), "Interrupted, shutting down");
        observer_handle.abort();
        return Ok(());
    };
    runner::log_simulation_end(&result);

    info!("Observer still serving the final state, press Ctrl-C to exit");
    tokio::signal::ctrl_c().await?;
    observer_handle.abort();

    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "cybermesh-engine shutdown complete"
    );

    Ok(())
}

/// The config file to load: the first argument, then `CYBERMESH_CONFIG`,
/// then [`DEFAULT_CONFIG_PATH`].
fn config_path() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os("CYBERMESH_CONFIG"))
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Install the global tracing subscriber.
fn init_logging(config: &SimulationConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
