use anyhow::Result;
use log::{debug, error, info, trace, warn};
use serde::Serialize;
use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use tumor_common::{write_series_csv, write_snapshot, SimulationConfig, SnapshotFormat};
use tumor_engine::{CellState, ConvergenceReason, Simulation, SimulationParameters};

/// Summary of a finished run, saved next to the series and snapshot.
#[derive(Debug, Serialize)]
struct RunSummary {
    steps_run: u64,
    step_ceiling: u32,
    converged: bool,
    reason: String,
    seeded_cells: usize,
    scale_factor: f64,
    final_tumor_cells: usize,
    final_necrotic_cells: usize,
    final_scaled_tumor: f64,
    final_scaled_necrotic: f64,
    elapsed_days: f64,
    params: SimulationParameters,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();

    info!("Starting Tumor Lattice Engine...");

    // --- Load Configuration ---
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));
    let config = SimulationConfig::load(&config_path)?;
    info!("Loaded configuration from {}.", config_path.display());

    // --- Initialize Simulation ---
    let mut sim = Simulation::new(config)?;
    debug!("Simulation Parameters: {:#?}", sim.params());

    // --- Simulation Loop ---
    let step_ceiling = sim.config().step_ceiling();
    let log_every = (sim.config().timing.max_steps / 10).max(1) as u64;
    info!(
        "Running until convergence or {} steps ({} nominal x {} safety factor)...",
        step_ceiling,
        sim.config().timing.max_steps,
        sim.config().timing.safety_factor
    );

    let start_time = Instant::now();
    let mut outcome = (false, ConvergenceReason::Running);
    let mut steps_run = 0u64;

    for step in 0..step_ceiling as u64 {
        let step_start_time = Instant::now();
        sim.step(step);
        steps_run = step + 1;
        let step_duration = step_start_time.elapsed();

        outcome = sim.has_converged();
        if step % log_every == 0 || outcome.0 {
            let census = sim.lattice().census();
            info!(
                "Step [{}/{}] | Tumor: {} | Necrotic: {} | Real cells: {:.3e} | Step Time: {:6.2} ms",
                step + 1,
                step_ceiling,
                census.tumor,
                census.necrotic,
                (census.tumor + census.necrotic) as f64 * sim.scale_factor(),
                step_duration.as_secs_f64() * 1000.0
            );
        } else {
            trace!("Step [{}/{}] completed in {:.2} ms", step + 1, step_ceiling, step_duration.as_secs_f64() * 1000.0);
        }

        if outcome.0 {
            info!("Simulation converged after {} steps: {}.", steps_run, outcome.1);
            break;
        }
    }
    if !outcome.0 {
        warn!("Step ceiling of {} reached without convergence.", step_ceiling);
    }

    let total_duration = start_time.elapsed();
    info!("Simulation finished in {:.3} seconds.", total_duration.as_secs_f64());

    // --- Save Recorded Data ---
    save_outputs(&sim, steps_run, outcome)?;

    info!("Simulation Complete.");
    Ok(())
}

fn save_outputs(sim: &Simulation, steps_run: u64, outcome: (bool, ConvergenceReason)) -> Result<()> {
    let output = &sim.config().output;
    let base = &output.base_filename;

    if output.save_series {
        let filename = PathBuf::from(format!("{}_results.csv", base));
        match write_series_csv(&filename, sim.series().records()) {
            Ok(rows) => info!("{} series rows saved to {}", rows, filename.display()),
            Err(e) => error!("Error saving series CSV '{}': {:#}", filename.display(), e),
        }
    } else {
        info!("Skipping series CSV as per config (save_series is false).");
    }

    if output.save_lattice {
        let format_name = output.format.as_deref().unwrap_or("json");
        let format = SnapshotFormat::from_name(format_name).unwrap_or_else(|| {
            error!("Unknown output format: {}. Using JSON instead.", format_name);
            SnapshotFormat::Json
        });
        let filename = PathBuf::from(format!("{}_final_lattice.{}", base, format.extension()));
        match write_snapshot(&filename, &sim.snapshot(), format) {
            Ok(()) => info!("Final lattice saved to {}", filename.display()),
            Err(e) => error!("Error saving final lattice '{}': {:#}", filename.display(), e),
        }
    } else {
        info!("Skipping final lattice as per config (save_lattice is false).");
    }

    let lattice = sim.lattice();
    let summary = RunSummary {
        steps_run,
        step_ceiling: sim.config().step_ceiling(),
        converged: outcome.0,
        reason: outcome.1.to_string(),
        seeded_cells: sim.seeded_count(),
        scale_factor: sim.scale_factor(),
        final_tumor_cells: lattice.count(CellState::Tumor),
        final_necrotic_cells: lattice.count(CellState::Necrotic),
        final_scaled_tumor: sim.series().tumor_counts().last().copied().unwrap_or(0.0),
        final_scaled_necrotic: sim.series().necrotic_counts().last().copied().unwrap_or(0.0),
        elapsed_days: sim.elapsed_ticks() as f64 / tumor_engine::drug::TICKS_PER_DAY,
        params: sim.params().clone(),
    };
    let filename = format!("{}_summary.json", base);
    match File::create(&filename) {
        Ok(file) => match serde_json::to_writer_pretty(file, &summary) {
            Ok(()) => info!("Run summary saved to {}", filename),
            Err(e) => error!("Error serializing run summary: {}", e),
        },
        Err(e) => error!("Error creating summary file '{}': {}", filename, e),
    }
    Ok(())
}
