//! Domain models for the NPI strategy calculator

pub mod compartments;
pub mod parameters;
pub mod strategy;

// Re-exports
pub use compartments::{CompartmentLayout, Phase, PHASE_COUNT};
pub use parameters::{DiseaseParameters, DurationBounds, ResidenceTimes, Scenario, ScenarioTriple};
pub use strategy::{Mode, Strategy};
