use serde::{Serialize, Deserialize};
use crate::cell_state::CellState;
use crate::sim_params::SimulationParameters;

/// One row of the statistics series, in the column layout of the results CSV.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesRecord {
    #[serde(rename = "Step")]
    pub step: u64,
    #[serde(rename = "Tumor Cells")]
    pub tumor_cells: f64,
    #[serde(rename = "Necrotic Cells")]
    pub necrotic_cells: f64,
    #[serde(rename = "Growth Rate")]
    pub growth_rate: f64,
}

/// A read-only copy of the lattice at a given step, for persistence and rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatticeSnapshot {
    /// Index of the last completed step, `None` if taken before the first step.
    pub step: Option<u64>,
    pub width: u32,
    pub height: u32,
    /// Row-major cell codes (see `CellState::code`).
    pub cells: Vec<u8>,
    pub scale_factor: f64,
    pub params: SimulationParameters,
}

impl LatticeSnapshot {
    pub fn state_at(&self, x: u32, y: u32) -> Option<CellState> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.cells.get(idx).copied().and_then(CellState::from_code)
    }

    pub fn count(&self, state: CellState) -> usize {
        let code = state.code();
        self.cells.iter().filter(|&&c| c == code).count()
    }
}
