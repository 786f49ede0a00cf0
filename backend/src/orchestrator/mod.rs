//! Scenario orchestration
//!
//! Composes progression engines and test-aware runners into the six models
//! of a strategy evaluation and derives comparative risk metrics.
//!
//! See `engine.rs` for the pipeline.

pub mod assessment;
pub mod engine;

#[cfg(test)]
mod tests;

pub use assessment::{ReleaseSummary, StrategyAssessment};
pub use engine::{
    apply_symptomatic_screening, initial_state, CalculatorConfig, ScenarioOrchestrator,
};
