use log::debug;
use std::fmt;
use tumor_common::{ConvergenceConfig, SeriesRecord};

/// Fraction of the carrying capacity at which a run counts as saturated.
pub const CAPACITY_FRACTION: f64 = 0.9;

/// Why a run is (or is not yet) considered finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvergenceReason {
    Running,
    TumorEliminated,
    Stabilized,
    CapacityReached,
}

impl ConvergenceReason {
    pub fn is_converged(self) -> bool {
        self != ConvergenceReason::Running
    }
}

impl fmt::Display for ConvergenceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ConvergenceReason::Running => "running",
            ConvergenceReason::TumorEliminated => "tumor eliminated",
            ConvergenceReason::Stabilized => "growth stabilized",
            ConvergenceReason::CapacityReached => "carrying capacity reached",
        };
        f.write_str(text)
    }
}

/// Append-only, aligned step / tumor / necrotic / growth-rate columns.
///
/// The only way in is `push`, which appends one full row, so all four
/// columns always have the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticsSeries {
    steps: Vec<u64>,
    tumor_counts: Vec<f64>,
    necrotic_counts: Vec<f64>,
    growth_rates: Vec<f64>,
}

impl StatisticsSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row and returns the growth rate computed for it.
    fn push(&mut self, step: u64, tumor: f64, necrotic: f64) -> f64 {
        // 0 stands for "no previous point" or "previous count was zero".
        let growth_rate = match self.tumor_counts.last() {
            Some(&prev) if prev > 0.0 => (tumor - prev) / prev,
            _ => 0.0,
        };
        self.steps.push(step);
        self.tumor_counts.push(tumor);
        self.necrotic_counts.push(necrotic);
        self.growth_rates.push(growth_rate);
        growth_rate
    }

    fn clear(&mut self) {
        self.steps.clear();
        self.tumor_counts.clear();
        self.necrotic_counts.clear();
        self.growth_rates.clear();
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[u64] {
        &self.steps
    }

    pub fn tumor_counts(&self) -> &[f64] {
        &self.tumor_counts
    }

    pub fn necrotic_counts(&self) -> &[f64] {
        &self.necrotic_counts
    }

    pub fn growth_rates(&self) -> &[f64] {
        &self.growth_rates
    }

    pub fn latest_tumor(&self) -> Option<f64> {
        self.tumor_counts.last().copied()
    }

    pub fn record(&self, i: usize) -> Option<SeriesRecord> {
        Some(SeriesRecord {
            step: *self.steps.get(i)?,
            tumor_cells: self.tumor_counts[i],
            necrotic_cells: self.necrotic_counts[i],
            growth_rate: self.growth_rates[i],
        })
    }

    /// Rows in insertion order, in the persisted CSV layout.
    pub fn records(&self) -> impl Iterator<Item = SeriesRecord> + '_ {
        (0..self.len()).filter_map(move |i| self.record(i))
    }
}

/// Converts lattice counts into scaled population figures and decides when a run is done.
#[derive(Debug, Clone)]
pub struct StatisticsTracker {
    scale_factor: f64,
    carrying_capacity: f64,
    window: usize,
    threshold: f64,
    series: StatisticsSeries,
}

impl StatisticsTracker {
    pub fn new(scale_factor: f64, carrying_capacity: f64, convergence: &ConvergenceConfig) -> Self {
        Self {
            scale_factor,
            carrying_capacity,
            window: convergence.window,
            threshold: convergence.threshold,
            series: StatisticsSeries::new(),
        }
    }

    /// `N0 / seeded`, or 1 when nothing was seeded.
    pub fn scale_factor_for(initial_population: f64, seeded: usize) -> f64 {
        if seeded > 0 {
            initial_population / seeded as f64
        } else {
            1.0
        }
    }

    /// Clears the series and installs a new scale factor.
    pub fn reset(&mut self, scale_factor: f64) {
        self.scale_factor = scale_factor;
        self.series.clear();
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn carrying_capacity(&self) -> f64 {
        self.carrying_capacity
    }

    pub fn series(&self) -> &StatisticsSeries {
        &self.series
    }

    /// Records raw lattice counts for `step`, scaled to real-world cell numbers.
    /// Returns the growth rate of the new point.
    pub fn record(&mut self, step: u64, tumor_cells: usize, necrotic_cells: usize) -> f64 {
        let tumor = tumor_cells as f64 * self.scale_factor;
        let necrotic = necrotic_cells as f64 * self.scale_factor;
        self.record_scaled(step, tumor, necrotic)
    }

    /// Records already-scaled counts for `step`.
    pub fn record_scaled(&mut self, step: u64, tumor: f64, necrotic: f64) -> f64 {
        let growth_rate = self.series.push(step, tumor, necrotic);
        debug!(
            "Step {}: tumor={:.3e} necrotic={:.3e} growth={:+.5}",
            step, tumor, necrotic, growth_rate
        );
        growth_rate
    }

    /// Stabilization test with the configured window and threshold.
    pub fn is_stabilized(&self) -> bool {
        self.is_stabilized_with(self.window, self.threshold)
    }

    /// True once the mean |growth rate| over the last `window` points drops below `threshold`.
    pub fn is_stabilized_with(&self, window: usize, threshold: f64) -> bool {
        let rates = self.series.growth_rates();
        if window == 0 || rates.len() < window {
            return false;
        }
        let recent = &rates[rates.len() - window..];
        let mean_abs = recent.iter().map(|r| r.abs()).sum::<f64>() / window as f64;
        mean_abs < threshold
    }

    /// Stopping criteria, checked in priority order: elimination, stabilization, capacity.
    pub fn has_converged(&self) -> (bool, ConvergenceReason) {
        let reason = self.convergence_reason();
        (reason.is_converged(), reason)
    }

    pub fn convergence_reason(&self) -> ConvergenceReason {
        let Some(latest) = self.series.latest_tumor() else {
            return ConvergenceReason::Running;
        };
        if latest <= 0.0 {
            ConvergenceReason::TumorEliminated
        } else if self.is_stabilized() {
            ConvergenceReason::Stabilized
        } else if latest > CAPACITY_FRACTION * self.carrying_capacity {
            ConvergenceReason::CapacityReached
        } else {
            ConvergenceReason::Running
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const K: f64 = 1e13;

    fn tracker(scale_factor: f64) -> StatisticsTracker {
        StatisticsTracker::new(scale_factor, K, &ConvergenceConfig::default())
    }

    #[test]
    fn scale_factor_defaults_to_one_for_empty_seed() {
        assert_eq!(StatisticsTracker::scale_factor_for(1e9, 0), 1.0);
        assert_relative_eq!(StatisticsTracker::scale_factor_for(1e9, 29), 1e9 / 29.0);
    }

    #[test]
    fn growth_rate_uses_previous_point() {
        let mut stats = tracker(10.0);
        assert_eq!(stats.record(0, 10, 0), 0.0);
        assert_relative_eq!(stats.record(1, 15, 1), 0.5);
        assert_relative_eq!(stats.record(2, 12, 3), -0.2);

        let series = stats.series();
        assert_eq!(series.steps(), &[0, 1, 2]);
        assert_eq!(series.tumor_counts(), &[100.0, 150.0, 120.0]);
        assert_eq!(series.necrotic_counts(), &[0.0, 10.0, 30.0]);
    }

    #[test]
    fn growth_rate_after_zero_is_sentinel() {
        let mut stats = tracker(1.0);
        stats.record(0, 0, 4);
        assert_eq!(stats.record(1, 3, 4), 0.0);
    }

    #[test]
    fn empty_series_is_running() {
        assert_eq!(tracker(1.0).has_converged(), (false, ConvergenceReason::Running));
    }

    #[test]
    fn elimination_takes_priority() {
        let mut stats = tracker(1.0);
        for step in 0..12 {
            stats.record_scaled(step, 0.0, 5.0);
        }
        // Growth rates are all 0, so stabilization would also hold.
        assert!(stats.is_stabilized());
        assert_eq!(stats.has_converged(), (true, ConvergenceReason::TumorEliminated));
    }

    #[test]
    fn capacity_reached_above_ninety_percent() {
        let mut stats = tracker(1.0);
        stats.record_scaled(0, 1e9, 0.0);
        stats.record_scaled(1, 0.95 * K, 0.0);
        assert_eq!(stats.has_converged(), (true, ConvergenceReason::CapacityReached));
    }

    #[test]
    fn stabilization_window() {
        let mut stats = tracker(1.0);
        let mut tumor = 1e9;
        stats.record_scaled(0, tumor, 0.0);
        for step in 1..10 {
            tumor *= 1.0001;
            stats.record_scaled(step, tumor, 0.0);
        }
        // Ten samples, the first being the 0 sentinel.
        assert!(stats.is_stabilized());
        assert_eq!(stats.has_converged(), (true, ConvergenceReason::Stabilized));

        stats.record_scaled(10, tumor * 1.01, 0.0);
        let mean = stats.series().growth_rates()[1..].iter().map(|r| r.abs()).sum::<f64>() / 10.0;
        assert!(mean > 0.001);
        assert!(!stats.is_stabilized());
    }

    #[test]
    fn too_few_samples_are_never_stable() {
        let mut stats = tracker(1.0);
        for step in 0..9 {
            stats.record_scaled(step, 100.0, 0.0);
        }
        assert!(!stats.is_stabilized());
        assert!(!stats.is_stabilized_with(0, 1.0));
    }

    #[test]
    fn reset_clears_series() {
        let mut stats = tracker(1.0);
        stats.record(0, 5, 0);
        stats.reset(2.0);
        assert!(stats.series().is_empty());
        assert_eq!(stats.scale_factor(), 2.0);
    }

    #[test]
    fn records_follow_insertion_order() {
        let mut stats = tracker(2.0);
        stats.record(3, 1, 0);
        stats.record(4, 2, 1);
        let rows: Vec<_> = stats.series().records().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].step, 4);
        assert_eq!(rows[1].tumor_cells, 4.0);
        assert_eq!(rows[1].necrotic_cells, 2.0);
        assert_relative_eq!(rows[1].growth_rate, 1.0);
    }
}
