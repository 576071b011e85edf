use crate::lattice::Lattice;
use log::trace;
use rand::Rng;
use tumor_common::{CellState, SimulationParameters, MAX_CELL_AGE, SPONTANEOUS_RATE};

/// Floor applied to the global tumor density before taking its logarithm.
pub const DENSITY_EPSILON: f64 = 1e-10;

/// Fixed per-cell rule constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionRules {
    pub spontaneous_rate: f64,
    pub max_cell_age: u32,
}

impl Default for TransitionRules {
    fn default() -> Self {
        Self {
            spontaneous_rate: SPONTANEOUS_RATE,
            max_cell_age: MAX_CELL_AGE,
        }
    }
}

/// Events applied during one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    pub necroses: usize,
    pub divisions: usize,
    pub transformations: usize,
}

/// Necrosis probability for a tumor cell, clamped to [0, 1].
pub fn necrosis_probability(
    treatment_gain: f64,
    age: u32,
    max_cell_age: u32,
    local_density: f64,
    drug_effect: f64,
) -> f64 {
    let age_factor = if max_cell_age == 0 {
        1.0
    } else {
        (age as f64 / max_cell_age as f64).min(1.0)
    };
    let p = treatment_gain * 0.01 * (1.0 + 0.5 * age_factor) * (0.5 + local_density)
        + drug_effect * 0.1;
    clamp_probability(p)
}

/// Gompertz division probability `r * (-ln g) - d`, clamped to [0, 1].
pub fn division_probability(growth_rate: f64, global_density: f64, drug_effect: f64) -> f64 {
    let g = global_density.max(DENSITY_EPSILON);
    clamp_probability(growth_rate * -g.ln() - drug_effect)
}

/// Probability that a healthy cell next to tumor tissue transforms.
pub fn transformation_probability(spontaneous_rate: f64, treatment_gain: f64) -> f64 {
    clamp_probability(spontaneous_rate * (1.0 - treatment_gain))
}

#[inline(always)]
fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

/// Applies one synchronous update to a lattice.
///
/// All decisions read the lattice as it stood at the start of the step; writes go
/// to an internal `next` buffer which is swapped in once every site has been
/// visited. Tumor sites are processed first (row-major), then healthy sites.
/// Random numbers are drawn in that same order, so a seeded generator replays a
/// run exactly.
#[derive(Debug, Clone)]
pub struct TransitionEngine {
    rules: TransitionRules,
    next: Option<Lattice>,
    neighbors: Vec<(u32, u32)>, // Scratch space for healthy neighbour lists
}

impl TransitionEngine {
    pub fn new(rules: TransitionRules) -> Self {
        Self {
            rules,
            next: None,
            neighbors: Vec::with_capacity(8),
        }
    }

    pub fn rules(&self) -> &TransitionRules {
        &self.rules
    }

    /// Advances `lattice` by one step under drug effect `drug_effect`.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        lattice: &mut Lattice,
        params: &SimulationParameters,
        drug_effect: f64,
        rng: &mut R,
    ) -> StepOutcome {
        // --- Prepare the output buffer as a copy of the current state ---
        let mut next = match self.next.take() {
            Some(mut buffer) if buffer.width() == lattice.width() && buffer.height() == lattice.height() => {
                buffer.clone_from(lattice);
                buffer
            }
            _ => lattice.clone(),
        };

        let mut outcome = StepOutcome::default();
        let current: &Lattice = &*lattice;

        // Constant for the whole step: it is read from the current buffer only.
        let global_density = current.global_tumor_density();
        let p_division = division_probability(params.growth_rate, global_density, drug_effect);
        let necrosis_active = params.treatment_active();

        // --- 1. Tumor cells: age, necrosis, division ---
        for y in 0..current.height() {
            for x in 0..current.width() {
                if current.state(x, y) != CellState::Tumor {
                    continue;
                }
                let idx = current.idx(x, y);
                let age = current.age(x, y).saturating_add(1);
                next.ages_mut()[idx] = age;

                if necrosis_active {
                    let density = current.local_density(x, y, 1);
                    let p_necrosis = necrosis_probability(
                        params.treatment_gain,
                        age,
                        self.rules.max_cell_age,
                        density,
                        drug_effect,
                    );
                    if rng.random::<f64>() < p_necrosis {
                        next.set_state(x, y, CellState::Necrotic);
                        outcome.necroses += 1;
                        continue;
                    }
                }

                current.healthy_moore_neighbors_into(x, y, &mut self.neighbors);
                if self.neighbors.is_empty() {
                    continue;
                }
                if rng.random::<f64>() < p_division {
                    let (nx, ny) = self.neighbors[rng.random_range(0..self.neighbors.len())];
                    // Two parents may pick the same target; it only turns tumor once.
                    if next.state(nx, ny) == CellState::Healthy {
                        outcome.divisions += 1;
                    }
                    next.spawn_tumor(nx, ny);
                }
            }
        }

        // --- 2. Healthy cells: spontaneous transformation ---
        let p_transform = transformation_probability(self.rules.spontaneous_rate, params.treatment_gain);
        for y in 0..current.height() {
            for x in 0..current.width() {
                if current.state(x, y) != CellState::Healthy {
                    continue;
                }
                if current.tumor_moore_neighbor_count(x, y) > 0 && rng.random::<f64>() < p_transform {
                    if next.state(x, y) == CellState::Healthy {
                        outcome.transformations += 1;
                    }
                    next.spawn_tumor(x, y);
                }
            }
        }

        // --- 3. Necrotic cells are absorbing: nothing to do ---

        // --- 4. Commit: next becomes current, old current is kept as the next buffer ---
        std::mem::swap(lattice, &mut next);
        self.next = Some(next);

        trace!(
            "Transition: g={:.5} p_div={:.5} d={:.5} -> {} necroses, {} divisions, {} transformations",
            global_density,
            p_division,
            drug_effect,
            outcome.necroses,
            outcome.divisions,
            outcome.transformations
        );
        outcome
    }
}

impl Default for TransitionEngine {
    fn default() -> Self {
        Self::new(TransitionRules::default())
    }
}
