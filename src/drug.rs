use tumor_common::SimulationParameters;

/// Simulation ticks per day of model time (one tick is one hour).
pub const TICKS_PER_DAY: f64 = 24.0;

/// Single-compartment absorption/elimination curve:
/// `c(t) = c0 * gain * t * exp(-k * t)`, with `t` in days.
pub fn concentration_at(t_days: f64, params: &SimulationParameters) -> f64 {
    params.drug_reference_concentration
        * params.treatment_gain
        * t_days
        * (-params.elimination_constant() * t_days).exp()
}

/// Global drug effect seen by every cell: `gamma * c(t)`.
pub fn effect_at(t_days: f64, params: &SimulationParameters) -> f64 {
    params.drug_gain * concentration_at(t_days, params)
}

/// Keeps simulated time for the pharmacokinetic curve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrugModel {
    elapsed_ticks: u64,
}

impl DrugModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances simulated time by one tick and returns the new tick count.
    pub fn advance(&mut self) -> u64 {
        self.elapsed_ticks += 1;
        self.elapsed_ticks
    }

    pub fn reset(&mut self) {
        self.elapsed_ticks = 0;
    }

    pub fn elapsed_ticks(&self) -> u64 {
        self.elapsed_ticks
    }

    pub fn elapsed_days(&self) -> f64 {
        self.elapsed_ticks as f64 / TICKS_PER_DAY
    }

    pub fn concentration(&self, params: &SimulationParameters) -> f64 {
        concentration_at(self.elapsed_days(), params)
    }

    pub fn effect(&self, params: &SimulationParameters) -> f64 {
        effect_at(self.elapsed_days(), params)
    }
}
