use crate::drug::DrugModel;
use crate::error::{check_finite, check_non_negative, check_positive, check_unit_interval, Result, SimError};
use crate::lattice::Lattice;
use crate::statistics::{ConvergenceReason, StatisticsSeries, StatisticsTracker};
use crate::transition::{StepOutcome, TransitionEngine, TransitionRules};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tumor_common::{LatticeSnapshot, SimulationConfig, SimulationParameters};

/// Owns the whole simulation: lattice, drug clock, transition engine,
/// statistics and the random source.
///
/// Drive it with `step(i)` for increasing `i` and stop when `has_converged()`
/// says so or an external step ceiling is hit.
pub struct Simulation<R = StdRng> {
    /// The configuration the run was built from.
    config: SimulationConfig,
    /// Live parameters; setters change these, `reset` keeps them.
    params: SimulationParameters,
    lattice: Lattice,
    engine: TransitionEngine,
    drug: DrugModel,
    stats: StatisticsTracker,
    /// Random source for every stochastic rule, consumed in a fixed order.
    rng: R,
    seeded_count: usize,
    last_step: Option<u64>,
    last_effect: f64,
}

impl Simulation<StdRng> {
    /// Builds a simulation with a `StdRng` seeded from `config.run.seed`.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let rng = StdRng::seed_from_u64(config.run.seed);
        Self::with_rng(config, rng)
    }
}

impl<R: Rng + SeedableRng> Simulation<R> {
    /// Replaces the random source with a freshly seeded one.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = R::seed_from_u64(seed);
    }
}

impl<R: Rng> Simulation<R> {
    /// Builds a simulation around an explicit random source.
    pub fn with_rng(config: SimulationConfig, rng: R) -> Result<Self> {
        validate_config(&config)?;

        let params = config.get_sim_params();
        let mut lattice = Lattice::new(config.lattice.width, config.lattice.height)?;
        let seeded_count = lattice.initialize(config.lattice.initial_radius);
        let scale_factor = StatisticsTracker::scale_factor_for(config.biology.initial_population, seeded_count);
        if seeded_count == 0 {
            warn!(
                "Initial radius {} seeds no tumor cells; scale factor falls back to 1.",
                config.lattice.initial_radius
            );
        }

        let engine = TransitionEngine::new(TransitionRules {
            spontaneous_rate: config.biology.spontaneous_rate,
            max_cell_age: config.biology.max_cell_age,
        });
        let stats = StatisticsTracker::new(scale_factor, config.biology.carrying_capacity, &config.convergence);

        info!(
            "Lattice {}x{} seeded with {} tumor cells (scale factor {:.4e}).",
            lattice.width(),
            lattice.height(),
            seeded_count,
            scale_factor
        );

        Ok(Self {
            config,
            params,
            lattice,
            engine,
            drug: DrugModel::new(),
            stats,
            rng,
            seeded_count,
            last_step: None,
            last_effect: 0.0,
        })
    }

    /// Re-seeds the lattice, recomputes the scale factor, clears the series and
    /// rewinds simulated time. Current parameter values are kept.
    pub fn reset(&mut self) {
        self.seeded_count = self.lattice.initialize(self.config.lattice.initial_radius);
        let scale_factor =
            StatisticsTracker::scale_factor_for(self.config.biology.initial_population, self.seeded_count);
        if self.seeded_count == 0 {
            warn!("Reset seeded no tumor cells; scale factor falls back to 1.");
        }
        self.stats.reset(scale_factor);
        self.drug.reset();
        self.last_step = None;
        self.last_effect = 0.0;
        info!("Simulation reset ({} tumor cells seeded).", self.seeded_count);
        debug!("Parameters after reset: {:?}", self.params);
    }

    /// Runs one tick: drug clock, synchronous transition, statistics update.
    ///
    /// `step_index` is the caller's frame counter and must increase from call to call.
    pub fn step(&mut self, step_index: u64) -> StepOutcome {
        if let Some(last) = self.last_step {
            if step_index <= last {
                warn!("Step index {} does not follow previous index {}.", step_index, last);
            }
        }

        // --- 1. Drug model ---
        self.drug.advance();
        let effect = self.drug.effect(&self.params);
        self.last_effect = effect;

        // --- 2. Transition engine ---
        let outcome = self.engine.step(&mut self.lattice, &self.params, effect, &mut self.rng);

        // --- 3. Statistics ---
        let census = self.lattice.census();
        self.stats.record(step_index, census.tumor, census.necrotic);
        self.last_step = Some(step_index);

        debug!(
            "Step {} (t={:.3} d): effect={:.5} | tumor={} necrotic={} | +{} div, +{} spont, -{} necrosis",
            step_index,
            self.drug.elapsed_days(),
            effect,
            census.tumor,
            census.necrotic,
            outcome.divisions,
            outcome.transformations,
            outcome.necroses
        );
        outcome
    }

    // --- Parameter setters (validated, never retroactive) ---

    pub fn set_growth_rate(&mut self, value: f64) -> Result<()> {
        check_non_negative("growth_rate", value)?;
        self.params.growth_rate = value;
        Ok(())
    }

    pub fn set_drug_gain(&mut self, value: f64) -> Result<()> {
        check_non_negative("drug_gain", value)?;
        self.params.drug_gain = value;
        Ok(())
    }

    pub fn set_drug_reference_concentration(&mut self, value: f64) -> Result<()> {
        check_non_negative("drug_reference_concentration", value)?;
        self.params.drug_reference_concentration = value;
        Ok(())
    }

    pub fn set_treatment_gain(&mut self, value: f64) -> Result<()> {
        check_unit_interval("treatment_gain", value)?;
        self.params.treatment_gain = value;
        Ok(())
    }

    /// `None` makes the drug curve reuse the growth rate as its elimination constant.
    pub fn set_elimination_rate(&mut self, value: Option<f64>) -> Result<()> {
        if let Some(rate) = value {
            check_non_negative("elimination_rate", rate)?;
        }
        self.params.elimination_rate = value;
        Ok(())
    }

    /// On/off form of the treatment gain (1.0 or 0.0).
    pub fn set_treatment_active(&mut self, active: bool) {
        self.params.treatment_gain = if active { 1.0 } else { 0.0 };
    }

    // --- Read-only views ---

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn series(&self) -> &StatisticsSeries {
        self.stats.series()
    }

    pub fn statistics(&self) -> &StatisticsTracker {
        &self.stats
    }

    pub fn scale_factor(&self) -> f64 {
        self.stats.scale_factor()
    }

    pub fn seeded_count(&self) -> usize {
        self.seeded_count
    }

    pub fn elapsed_ticks(&self) -> u64 {
        self.drug.elapsed_ticks()
    }

    /// Drug effect applied during the most recent step.
    pub fn drug_effect(&self) -> f64 {
        self.last_effect
    }

    pub fn last_step(&self) -> Option<u64> {
        self.last_step
    }

    pub fn is_stabilized(&self) -> bool {
        self.stats.is_stabilized()
    }

    pub fn has_converged(&self) -> (bool, ConvergenceReason) {
        self.stats.has_converged()
    }

    /// Copy of the current lattice for persistence or rendering.
    pub fn snapshot(&self) -> LatticeSnapshot {
        LatticeSnapshot {
            step: self.last_step,
            width: self.lattice.width(),
            height: self.lattice.height(),
            cells: self.lattice.codes(),
            scale_factor: self.stats.scale_factor(),
            params: self.params.clone(),
        }
    }
}

/// Rejects configurations the engine cannot run. Nothing is corrected silently.
pub fn validate_config(config: &SimulationConfig) -> Result<()> {
    let lattice = &config.lattice;
    if lattice.width == 0 || lattice.height == 0 {
        return Err(SimError::InvalidDimensions { width: lattice.width, height: lattice.height });
    }
    check_finite("initial_radius", lattice.initial_radius)?;

    let biology = &config.biology;
    check_non_negative("growth_rate", biology.growth_rate)?;
    check_positive("carrying_capacity", biology.carrying_capacity)?;
    check_positive("initial_population", biology.initial_population)?;
    check_unit_interval("spontaneous_rate", biology.spontaneous_rate)?;

    let treatment = &config.treatment;
    check_unit_interval("treatment_gain", treatment.treatment_gain)?;
    check_non_negative("drug_gain", treatment.drug_gain)?;
    check_non_negative("drug_reference_concentration", treatment.drug_reference_concentration)?;
    if let Some(rate) = treatment.elimination_rate {
        check_non_negative("elimination_rate", rate)?;
    }

    if config.convergence.window == 0 {
        return Err(SimError::InvalidConfig("convergence window must be greater than 0".to_string()));
    }
    check_non_negative("convergence threshold", config.convergence.threshold)?;
    if config.step_ceiling() == 0 {
        return Err(SimError::InvalidConfig("max_steps * safety_factor must be greater than 0".to_string()));
    }
    Ok(())
}
