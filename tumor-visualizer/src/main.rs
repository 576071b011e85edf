use anyhow::{anyhow, Context, Result};
use clap::Parser;
use env_logger::Builder;
use log::{info, warn, LevelFilter};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tumor_common::{read_series_csv, read_snapshot, CellState, SimulationConfig, SnapshotFormat};

mod plots;
mod render;

use render::{parse_color, render_lattice, CellPalette};

/// Command-line arguments for the visualizer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Lattice snapshot file (.json, .bin or .msgpack)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Series CSV written by the engine
    #[arg(short, long)]
    series: Option<PathBuf>,

    /// Optional path to the config.toml file; output file names are derived from it
    /// when --input or --series are not given
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the rendered files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Pixels per lattice site
    #[arg(long, default_value_t = 4)]
    scale: u32,

    /// Color of healthy sites
    #[arg(long, default_value = "white")]
    healthy_color: String,

    /// Color of tumor sites
    #[arg(long, default_value = "red")]
    tumor_color: String,

    /// Color of necrotic sites
    #[arg(long, default_value = "black")]
    necrotic_color: String,
}

/// Files to read, after filling gaps from the config.
#[derive(Debug, PartialEq)]
struct Inputs {
    snapshot: Option<PathBuf>,
    series: Option<PathBuf>,
}

fn resolve_inputs(args: &Args, config: Option<&SimulationConfig>) -> Inputs {
    let mut inputs = Inputs {
        snapshot: args.input.clone(),
        series: args.series.clone(),
    };
    if let Some(config) = config {
        let output = &config.output;
        if inputs.snapshot.is_none() && output.save_lattice {
            let format = output
                .format
                .as_deref()
                .and_then(SnapshotFormat::from_name)
                .unwrap_or(SnapshotFormat::Json);
            inputs.snapshot = Some(PathBuf::from(format!(
                "{}_final_lattice.{}",
                output.base_filename,
                format.extension()
            )));
        }
        if inputs.series.is_none() && output.save_series {
            inputs.series = Some(PathBuf::from(format!("{}_results.csv", output.base_filename)));
        }
    }
    inputs
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("tumor")
        .to_string()
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    run_with_args(args)
}

fn run_with_args(args: Args) -> Result<()> {
    // Initialize logger
    Builder::from_default_env()
        .filter(None, LevelFilter::Info)
        .init();

    info!("Starting Tumor Visualizer...");
    let start_time = Instant::now();

    let config = match &args.config {
        Some(path) => Some(SimulationConfig::load(path)?),
        None => None,
    };
    let inputs = resolve_inputs(&args, config.as_ref());
    if inputs.snapshot.is_none() && inputs.series.is_none() {
        return Err(anyhow!("Nothing to render: pass --input, --series or --config."));
    }

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create output directory '{}'", args.output_dir.display()))?;

    // --- Lattice image ---
    if let Some(path) = &inputs.snapshot {
        info!("Input snapshot: {}", path.display());
        let snapshot = read_snapshot(path)?;
        info!(
            "Lattice {}x{} at step {:?}: {} tumor, {} necrotic",
            snapshot.width,
            snapshot.height,
            snapshot.step,
            snapshot.count(CellState::Tumor),
            snapshot.count(CellState::Necrotic)
        );

        let palette = CellPalette {
            healthy: parse_color(&args.healthy_color),
            tumor: parse_color(&args.tumor_color),
            necrotic: parse_color(&args.necrotic_color),
        };
        let image = render_lattice(&snapshot, args.scale, &palette);
        let out_path = args.output_dir.join(format!("{}.png", file_stem(path)));
        image
            .save(&out_path)
            .with_context(|| format!("Failed to write image '{}'", out_path.display()))?;
        info!("Lattice image saved to {}", out_path.display());
    }

    // --- Series plots ---
    if let Some(path) = &inputs.series {
        info!("Input series: {}", path.display());
        let series = read_series_csv(path)?;
        if series.is_empty() {
            warn!("Series file '{}' has no rows.", path.display());
        } else {
            let stem = file_stem(path);
            let population_path = args.output_dir.join(format!("{}_population.svg", stem));
            plots::plot_population(&series, &population_path)
                .map_err(|e| anyhow!("Failed to draw '{}': {}", population_path.display(), e))?;
            let growth_path = args.output_dir.join(format!("{}_growth_rate.svg", stem));
            plots::plot_growth_rate(&series, &growth_path)
                .map_err(|e| anyhow!("Failed to draw '{}': {}", growth_path.display(), e))?;
        }
    }

    info!("Rendering finished in {:.2} s.", start_time.elapsed().as_secs_f64());
    Ok(())
}

// Unit tests
#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Args {
        Args::parse_from(["tumor-visualizer"])
    }

    #[test]
    fn explicit_paths_win_over_config() {
        let mut args = args();
        args.input = Some(PathBuf::from("mine.bin"));
        let inputs = resolve_inputs(&args, Some(&SimulationConfig::default()));
        assert_eq!(inputs.snapshot, Some(PathBuf::from("mine.bin")));
        assert_eq!(inputs.series, Some(PathBuf::from("tumor_growth_results.csv")));
    }

    #[test]
    fn config_names_follow_output_settings() {
        let mut config = SimulationConfig::default();
        config.output.format = Some("messagepack".to_string());
        config.output.save_series = false;
        let inputs = resolve_inputs(&args(), Some(&config));
        assert_eq!(inputs.snapshot, Some(PathBuf::from("tumor_growth_final_lattice.msgpack")));
        assert_eq!(inputs.series, None);
    }

    #[test]
    fn no_sources_without_config() {
        let inputs = resolve_inputs(&args(), None);
        assert_eq!(inputs, Inputs { snapshot: None, series: None });
    }

    #[test]
    fn defaults_parse() {
        let args = args();
        assert_eq!(args.scale, 4);
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert_eq!(file_stem(Path::new("out/run_final_lattice.json")), "run_final_lattice");
    }
}
