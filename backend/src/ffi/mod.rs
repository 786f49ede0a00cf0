//! Python bindings
//!
//! Thin wrappers over the orchestrator and the prevalence estimator. All
//! results cross the boundary as plain lists of floats.

pub mod orchestrator;
pub mod types;
