pub mod cell_state;
pub mod config;
pub mod io;
pub mod sim_params;
pub mod snapshot;

// Re-export key types for easier use by dependent crates
pub use cell_state::CellState;
pub use config::{
    BiologyConfig, ConvergenceConfig, LatticeConfig, OutputConfig, RunConfig, SimulationConfig,
    TimingConfig, TreatmentConfig, MAX_CELL_AGE, SPONTANEOUS_RATE,
};
pub use io::{read_series_csv, read_snapshot, write_series_csv, write_snapshot, SnapshotFormat};
pub use sim_params::SimulationParameters;
pub use snapshot::{LatticeSnapshot, SeriesRecord};
