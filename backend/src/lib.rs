//! NPI Strategy Core - Rust Engine
//!
//! Transmission-risk calculator for non-pharmaceutical intervention
//! strategies: quarantine, isolation, diagnostic testing and symptom
//! screening, evaluated against a compartmental disease-progression model.
//!
//! # Architecture
//!
//! - **models**: Compartment layout, disease parameters, strategies
//! - **core**: Test schedules and day timelines
//! - **assay**: Test types, false omission rates, positive probabilities
//! - **progression**: Generator, matrix-exponential engine, test-aware runner
//! - **orchestrator**: Six-model scenario composition and risk metrics
//! - **prevalence**: Back-estimation of today's infection-age distribution
//! - **summary**: (mid, min, max) ordering of scenario results
//!
//! # Critical Invariants
//!
//! 1. Generator columns sum to zero; at full risk-posing fraction the
//!    propagated mass is conserved
//! 2. Runs are pure functions of their inputs (no RNG, no I/O)
//! 3. Invalid input is rejected as `InvalidParameter`, never turned into NaN
//! 4. FFI boundary is minimal and safe

// Module declarations
pub mod assay;
pub mod core;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod prevalence;
pub mod progression;
pub mod summary;

// Re-exports for convenience
pub use assay::{PositiveProbabilities, TestAssay, TestType};
pub use crate::core::timeline::{Segment, TestSchedule, Timeline};
pub use error::ModelError;
pub use models::{
    CompartmentLayout, DiseaseParameters, DurationBounds, Mode, Phase, ResidenceTimes, Scenario,
    ScenarioTriple, Strategy,
};
pub use orchestrator::{
    CalculatorConfig, ReleaseSummary, ScenarioOrchestrator, StrategyAssessment,
};
pub use prevalence::{PrevalenceEstimate, PrevalenceEstimator, WeeklyIncidence};
pub use progression::{ProgressionEngine, TestAwareRunner, Trajectory, RISK_HORIZON_DAYS};
pub use summary::{mid_min_max, ScenarioRange};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn npi_strategy_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::orchestrator::PyStrategyCalculator>()?;
    m.add_function(wrap_pyfunction!(ffi::orchestrator::estimate_prevalence, m)?)?;
    Ok(())
}
