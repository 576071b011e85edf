use serde::{Deserialize, Serialize};

/// Tunable model parameters, derived from the configuration and mutated live by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    pub growth_rate: f64,                  // r, Gompertz growth constant
    pub drug_gain: f64,                    // gamma, drug effect per unit concentration
    pub drug_reference_concentration: f64, // c0
    pub treatment_gain: f64,               // in [0, 1]
    /// Pharmacokinetic elimination constant. `None` reuses `growth_rate`.
    #[serde(default)]
    pub elimination_rate: Option<f64>,
}

impl SimulationParameters {
    /// Elimination constant actually used by the concentration curve.
    pub fn elimination_constant(&self) -> f64 {
        self.elimination_rate.unwrap_or(self.growth_rate)
    }

    /// Necrosis only fires while some treatment is applied.
    pub fn treatment_active(&self) -> bool {
        self.treatment_gain > 0.0
    }
}
