// src/main.rs - Heating curve controller CLI
use clap::{Parser, Subcommand};
use heatcurve::config::{self, AppConfig};
use heatcurve::simulation::{self, SimulatedRoom};
use heatcurve::{CurveController, JsonFileStore, SharedCurveController};
use std::path::PathBuf;
use tokio::time::{Duration, MissedTickBehavior};

/// Adaptive heating curve controller
#[derive(Parser, Debug)]
#[command(name = "heatcurve", about = "Adaptive heating-curve pump frequency controller.")]
struct Cli {
    /// Path to a TOML config file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Coefficient file, overrides `curve.param_file`
    #[arg(long)]
    params: Option<PathBuf>,

    /// Log per-cycle details
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single control cycle
    Once {
        #[arg(long, allow_negative_numbers = true)]
        outdoor: f64,
        #[arg(long, allow_negative_numbers = true)]
        indoor: f64,
        /// Indoor setpoint, overrides `controller.target_temp`
        #[arg(long, allow_negative_numbers = true)]
        target: Option<f64>,
        /// Heater is still warming up
        #[arg(long)]
        warmup: bool,
    },
    /// Closed-loop run against the simulated room
    Simulate {
        #[arg(long, default_value_t = 288)]
        cycles: u32,
        /// Wall-clock delay between cycles
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO })
        .init();

    let mut app = match &cli.config {
        Some(path) => {
            let path = path.to_str().ok_or("config path is not valid UTF-8")?;
            tracing::info!("Loading configuration from: {}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    let param_file = cli.params.clone().unwrap_or_else(|| PathBuf::from(&app.curve.param_file));

    match cli.command {
        Commands::Once { outdoor, indoor, target, warmup } => {
            if let Some(target) = target {
                app.controller.target_temp = target;
            }
            let controller = build_controller(&app, param_file)?;
            let shared = SharedCurveController::new(controller);
            let (_, frequency) = shared.cycle(outdoor, indoor, !warmup);
            println!("{}", describe_frequency(frequency));
        }
        Commands::Simulate { cycles, interval_ms } => {
            let controller = build_controller(&app, param_file)?;
            let shared = SharedCurveController::new(controller);
            let mut room = SimulatedRoom::new(app.simulation.clone(), app.controller.clone());
            let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(
                "Simulating {} cycles, target {:.1}°C",
                cycles,
                app.controller.target_temp
            );
            for cycle in 0..cycles {
                if interval_ms > 0 {
                    ticker.tick().await;
                }
                let Some(record) = simulation::run_cycle(&shared, &mut room) else {
                    break;
                };
                tracing::info!(
                    cycle,
                    outdoor = record.reading.outdoor_temp,
                    indoor = record.reading.indoor_temp,
                    frequency = ?record.frequency,
                    k1 = record.k1,
                    k2 = record.k2,
                    "cycle"
                );
            }
            let snapshot = shared.snapshot();
            tracing::info!(
                "Finished: indoor {:.2}°C, k1={:.3}, k2={:.3}, pump {:.2} Hz",
                room.indoor_temp(),
                snapshot.k1,
                snapshot.k2,
                snapshot.last_accepted_frequency
            );
        }
    }

    Ok(())
}

/// One-line report for the `once` command. `{:?}` keeps whole numbers as `2.0`.
fn describe_frequency(frequency: Option<f64>) -> String {
    match frequency {
        Some(frequency) => format!("Fuel pump frequency: {:?} Hz", frequency),
        None => "Heater is in warm-up mode - no control over pump frequency.".to_string(),
    }
}

fn build_controller(
    app: &AppConfig,
    param_file: PathBuf,
) -> Result<CurveController, Box<dyn std::error::Error + Send + Sync + 'static>> {
    let store = JsonFileStore::new(param_file);
    tracing::info!("Heating curve parameters: {}", store.path().display());
    let controller = CurveController::new(
        app.controller.clone(),
        app.curve.initial_k1,
        app.curve.initial_k2,
        Box::new(store),
    )
    .map_err(|e| {
        tracing::error!("Failed to initialize controller: {}", e);
        e
    })?;
    Ok(controller)
}
