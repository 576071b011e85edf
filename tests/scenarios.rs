//! End-to-end runs of the controller: seeding, elimination under heavy treatment,
//! capacity and stabilization stops, untreated growth and the file outputs.

use approx::assert_relative_eq;
use tempfile::tempdir;
use tumor_common::{read_series_csv, read_snapshot, write_series_csv, write_snapshot, ConvergenceConfig, SnapshotFormat};
use tumor_engine::{CellState, ConvergenceReason, Simulation, SimulationConfig, StatisticsTracker};

fn config_with_radius(radius: f64) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.lattice.initial_radius = radius;
    config
}

#[test]
fn radius_three_seeds_twenty_nine_cells() {
    let sim = Simulation::new(config_with_radius(3.0)).unwrap();
    assert_eq!(sim.seeded_count(), 29);
    assert_eq!(sim.lattice().count(CellState::Tumor), 29);
    assert_eq!(sim.lattice().count(CellState::Necrotic), 0);
    assert_relative_eq!(sim.scale_factor(), 1e9 / 29.0, max_relative = 1e-12);
    assert!(sim.series().is_empty());
}

#[test]
fn overwhelming_drug_eliminates_tumor_in_one_step() {
    let mut config = config_with_radius(3.0);
    config.treatment.treatment_gain = 1.0;
    config.treatment.drug_gain = 1000.0;
    config.treatment.drug_reference_concentration = 1.0;
    config.treatment.elimination_rate = Some(0.0);
    let mut sim = Simulation::new(config).unwrap();

    let outcome = sim.step(0);
    assert_eq!(outcome.necroses, 29);
    assert_eq!(outcome.divisions, 0);
    assert_eq!(sim.lattice().count(CellState::Tumor), 0);
    assert_eq!(sim.lattice().count(CellState::Necrotic), 29);
    assert_eq!(sim.has_converged(), (true, ConvergenceReason::TumorEliminated));
}

#[test]
fn elimination_can_be_switched_on_mid_run() {
    let mut sim = Simulation::new(config_with_radius(3.0)).unwrap();
    for step in 0..5 {
        sim.step(step);
    }
    assert_eq!(sim.lattice().count(CellState::Necrotic), 0);

    sim.set_treatment_active(true);
    sim.set_drug_gain(1e6).unwrap();
    sim.set_drug_reference_concentration(1.0).unwrap();
    sim.set_elimination_rate(Some(0.0)).unwrap();
    sim.step(5);
    assert_eq!(sim.lattice().count(CellState::Tumor), 0);
    assert_eq!(sim.has_converged().1, ConvergenceReason::TumorEliminated);
}

#[test]
fn population_near_capacity_stops_the_run() {
    let mut tracker = StatisticsTracker::new(1.0, 1e13, &ConvergenceConfig::default());
    tracker.record_scaled(0, 1e9, 0.0);
    assert_eq!(tracker.has_converged(), (false, ConvergenceReason::Running));

    tracker.record_scaled(1, 0.95e13, 0.0);
    assert_eq!(tracker.has_converged(), (true, ConvergenceReason::CapacityReached));
}

#[test]
fn flat_growth_window_reports_stabilization() {
    let mut tracker = StatisticsTracker::new(1.0, 1e13, &ConvergenceConfig::default());
    let mut population = 1e9;
    tracker.record_scaled(0, population, 0.0);
    for step in 1..=10 {
        population *= 1.0001;
        tracker.record_scaled(step, population, 0.0);
    }
    assert!(tracker.is_stabilized());
    assert_eq!(tracker.has_converged(), (true, ConvergenceReason::Stabilized));

    // Nine quiet samples plus one at 1% push the mean above the threshold.
    let mut broken = StatisticsTracker::new(1.0, 1e13, &ConvergenceConfig::default());
    let mut population = 1e9;
    broken.record_scaled(0, population, 0.0);
    for step in 1..=9 {
        population *= 1.0001;
        broken.record_scaled(step, population, 0.0);
    }
    broken.record_scaled(10, population * 1.01, 0.0);
    assert!(!broken.is_stabilized());
    assert_eq!(broken.has_converged().1, ConvergenceReason::Running);
}

#[test]
fn untreated_tumor_never_shrinks() {
    let mut config = SimulationConfig::default();
    config.biology.growth_rate = 0.05;
    config.treatment.treatment_gain = 0.0;
    let mut sim = Simulation::new(config).unwrap();

    for step in 0..20 {
        let outcome = sim.step(step);
        assert_eq!(outcome.necroses, 0);
        assert_eq!(sim.drug_effect(), 0.0);
    }
    assert_eq!(sim.lattice().count(CellState::Necrotic), 0);

    let counts = sim.series().tumor_counts();
    assert!(counts.windows(2).all(|w| w[1] >= w[0]), "tumor counts decreased: {:?}", counts);
    assert!(counts[0] >= sim.seeded_count() as f64 * sim.scale_factor());
}

#[test]
fn run_outputs_can_be_written_and_read_back() {
    let mut config = SimulationConfig::default();
    config.lattice.width = 30;
    config.lattice.height = 20;
    config.treatment.treatment_gain = 0.5;
    let mut sim = Simulation::new(config).unwrap();
    for step in 0..12 {
        sim.step(step);
    }

    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("run_results.csv");
    let rows = write_series_csv(&csv_path, sim.series().records()).unwrap();
    assert_eq!(rows, 12);
    let read_back = read_series_csv(&csv_path).unwrap();
    assert_eq!(read_back.len(), 12);
    assert_eq!(read_back[0].step, 0);
    assert_eq!(read_back[0].growth_rate, 0.0);
    assert_eq!(read_back[11].step, 11);

    let lattice_path = dir.path().join("run_final_lattice.msgpack");
    write_snapshot(&lattice_path, &sim.snapshot(), SnapshotFormat::MessagePack).unwrap();
    let snapshot = read_snapshot(&lattice_path).unwrap();
    assert_eq!((snapshot.width, snapshot.height), (30, 20));
    assert_eq!(snapshot.step, Some(11));
    assert_eq!(snapshot.count(CellState::Tumor), sim.lattice().count(CellState::Tumor));
    assert_eq!(snapshot.cells, sim.lattice().codes());
}
