//! Compartmental disease-progression model
//!
//! - **generator**: construction of the linear system
//! - **engine**: exact solution by matrix exponentiation
//! - **runner**: trajectories interrupted by diagnostic tests, residual risk

pub mod engine;
pub mod generator;
pub mod runner;

pub use engine::ProgressionEngine;
pub use generator::{build_generator, exit_rates, SINK_RATE};
pub use runner::{TestAwareRunner, Trajectory, RISK_HORIZON_DAYS};
