use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::sim_params::SimulationParameters;
use std::path::Path;

/// Base probability that a healthy cell touching tumor tissue transforms in one step.
pub const SPONTANEOUS_RATE: f64 = 0.001;
/// Tumor age (in steps) at which the necrosis age factor saturates.
pub const MAX_CELL_AGE: u32 = 20;

// Lattice geometry and initial seed
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LatticeConfig {
    pub width: u32,
    pub height: u32,
    pub initial_radius: f64,
}

// Growth law and population scaling
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct BiologyConfig {
    pub growth_rate: f64,
    pub carrying_capacity: f64,  // K
    pub initial_population: f64, // N0
    #[serde(default = "default_spontaneous_rate")]
    pub spontaneous_rate: f64,
    #[serde(default = "default_max_cell_age")]
    pub max_cell_age: u32,
}

// Drug and treatment settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TreatmentConfig {
    #[serde(default)]
    pub treatment_gain: f64,
    pub drug_gain: f64,
    pub drug_reference_concentration: f64,
    /// Leave unset to reuse the growth rate as the elimination constant.
    #[serde(default)]
    pub elimination_rate: Option<f64>,
}

// Step budget for the external driver loop
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    pub max_steps: u32,
    #[serde(default = "default_safety_factor")]
    pub safety_factor: u32, // Hard ceiling = max_steps * safety_factor
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ConvergenceConfig {
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RunConfig {
    pub seed: u64,
}

// Configuration for output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    pub save_series: bool,
    pub save_lattice: bool,
    pub format: Option<String>, // Lattice snapshot format: "json", "bincode", "messagepack"
}

fn default_spontaneous_rate() -> f64 {
    SPONTANEOUS_RATE
}

fn default_max_cell_age() -> u32 {
    MAX_CELL_AGE
}

fn default_safety_factor() -> u32 {
    5
}

fn default_window() -> usize {
    10
}

fn default_threshold() -> f64 {
    0.001
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        ConvergenceConfig {
            window: default_window(),
            threshold: default_threshold(),
        }
    }
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub lattice: LatticeConfig,
    pub biology: BiologyConfig,
    pub treatment: TreatmentConfig,
    pub timing: TimingConfig,
    #[serde(default)]
    pub convergence: ConvergenceConfig,
    pub run: RunConfig,
    pub output: OutputConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            lattice: LatticeConfig {
                width: 100,
                height: 100,
                initial_radius: 5.0,
            },
            biology: BiologyConfig {
                growth_rate: 0.006,
                carrying_capacity: 1e13,
                initial_population: 1e9,
                spontaneous_rate: SPONTANEOUS_RATE,
                max_cell_age: MAX_CELL_AGE,
            },
            treatment: TreatmentConfig {
                treatment_gain: 0.0,
                drug_gain: 0.1,
                drug_reference_concentration: 0.5,
                elimination_rate: None,
            },
            timing: TimingConfig {
                max_steps: 100,
                safety_factor: default_safety_factor(),
            },
            convergence: ConvergenceConfig::default(),
            run: RunConfig { seed: 42 },
            output: OutputConfig {
                base_filename: "tumor_growth".to_string(),
                save_series: true,
                save_lattice: true,
                format: Some("json".to_string()),
            },
        }
    }
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config in '{}': {}", path_ref.display(), e))
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(text)?;

        // --- Validation ---
        if config.lattice.width == 0 || config.lattice.height == 0 {
            anyhow::bail!("lattice width and height must be greater than 0.");
        }
        if !config.lattice.initial_radius.is_finite() {
            anyhow::bail!("initial_radius must be a finite number.");
        }
        if config.timing.max_steps == 0 || config.timing.safety_factor == 0 {
            anyhow::bail!("max_steps and safety_factor must be greater than 0.");
        }
        if config.convergence.window == 0 {
            anyhow::bail!("convergence window must be greater than 0.");
        }
        // Parameter ranges are checked again, with typed errors, when the engine is built.

        Ok(config)
    }

    /// Converts the configuration into the live model parameters.
    pub fn get_sim_params(&self) -> SimulationParameters {
        SimulationParameters {
            growth_rate: self.biology.growth_rate,
            drug_gain: self.treatment.drug_gain,
            drug_reference_concentration: self.treatment.drug_reference_concentration,
            treatment_gain: self.treatment.treatment_gain,
            elimination_rate: self.treatment.elimination_rate,
        }
    }

    /// Absolute number of ticks a driver may run before giving up on convergence.
    pub fn step_ceiling(&self) -> u32 {
        self.timing.max_steps.saturating_mul(self.timing.safety_factor)
    }
}
