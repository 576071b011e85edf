//! Stochastic lattice model of tumor growth and treatment response.
//!
//! The core is split the way a step flows: the [`drug`] clock yields an effect,
//! the [`transition`] engine rewrites the [`lattice`] synchronously, and the
//! [`statistics`] tracker turns the new lattice into scaled population figures.
//! [`simulation::Simulation`] owns all of them. Files are read and written by `tumor_common::io`.

pub mod drug;
pub mod error;
pub mod lattice;
pub mod simulation;
pub mod statistics;
pub mod transition;

pub use error::{Result, SimError};
pub use lattice::{CellCensus, Lattice};
pub use simulation::Simulation;
pub use statistics::{ConvergenceReason, StatisticsSeries, StatisticsTracker};
pub use transition::{StepOutcome, TransitionEngine, TransitionRules};
pub use tumor_common::{CellState, LatticeSnapshot, SeriesRecord, SimulationConfig, SimulationParameters};
