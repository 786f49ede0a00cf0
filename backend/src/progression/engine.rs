//! Progression Engine
//!
//! Solves the linear compartmental system exactly: `X(t) = exp(A t) X0`.
//!
//! The matrix exponential is delegated to nalgebra, which uses scaling and
//! squaring with a Padé approximant. Rates scale with 1/residence time and
//! `t` reaches ~100 days, so truncated Taylor series are not an option.
//!
//! # Example
//!
//! ```rust
//! use nalgebra::DVector;
//! use npi_strategy_core_rs::models::{CompartmentLayout, ResidenceTimes};
//! use npi_strategy_core_rs::progression::ProgressionEngine;
//!
//! let layout = CompartmentLayout::canonical();
//! let tau = ResidenceTimes::new([3.0, 3.0, 8.0, 5.0]).unwrap();
//! let mut x0 = DVector::zeros(layout.n_compartments());
//! x0[0] = 1.0;
//!
//! let engine = ProgressionEngine::new(&layout, tau, 1.0, x0.clone()).unwrap();
//! assert_eq!(engine.evaluate(0.0).unwrap(), x0);
//! ```

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::error::{ensure_probability, ModelError};
use crate::models::compartments::CompartmentLayout;
use crate::models::parameters::ResidenceTimes;
use crate::progression::generator::build_generator;

/// Linear compartmental model with a fixed generator
///
/// Immutable apart from explicit re-seeding of the initial state.
#[derive(Debug, Clone)]
pub struct ProgressionEngine {
    layout: CompartmentLayout,
    residence_times: ResidenceTimes,
    risk_posing_fraction: f64,
    generator: DMatrix<f64>,
    initial_state: DVector<f64>,
}

impl ProgressionEngine {
    /// Build the generator from validated inputs
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the risk-posing fraction lies outside [0, 1]
    /// or the initial state does not match the layout.
    pub fn new(
        layout: &CompartmentLayout,
        residence_times: ResidenceTimes,
        risk_posing_fraction: f64,
        initial_state: DVector<f64>,
    ) -> Result<Self, ModelError> {
        ensure_probability("risk_posing_fraction", risk_posing_fraction)?;
        layout.validate_state(&initial_state)?;

        let generator = build_generator(layout, &residence_times, risk_posing_fraction);
        debug!(
            "progression engine: tau={:?} f={} N={}",
            residence_times.as_array(),
            risk_posing_fraction,
            layout.n_compartments()
        );

        Ok(Self {
            layout: layout.clone(),
            residence_times,
            risk_posing_fraction,
            generator,
            initial_state,
        })
    }

    pub fn layout(&self) -> &CompartmentLayout {
        &self.layout
    }

    pub fn residence_times(&self) -> &ResidenceTimes {
        &self.residence_times
    }

    pub fn risk_posing_fraction(&self) -> f64 {
        self.risk_posing_fraction
    }

    pub fn generator(&self) -> &DMatrix<f64> {
        &self.generator
    }

    pub fn initial_state(&self) -> &DVector<f64> {
        &self.initial_state
    }

    /// Replace the initial state
    pub fn reseed(&mut self, initial_state: DVector<f64>) -> Result<(), ModelError> {
        self.layout.validate_state(&initial_state)?;
        self.initial_state = initial_state;
        Ok(())
    }

    /// `exp(A t)`, checked for finiteness
    pub fn propagator(&self, t: f64) -> Result<DMatrix<f64>, ModelError> {
        if !t.is_finite() || t < 0.0 {
            return Err(ModelError::invalid(format!(
                "evaluation time must be finite and >= 0, got {}",
                t
            )));
        }
        let propagator = (&self.generator * t).exp();
        if propagator.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NumericOverflow(format!(
                "matrix exponential not finite at t={}",
                t
            )));
        }
        Ok(propagator)
    }

    /// State at time `t` starting from the engine's initial state
    pub fn evaluate(&self, t: f64) -> Result<DVector<f64>, ModelError> {
        self.evaluate_from(t, &self.initial_state)
    }

    /// State at time `t` starting from `state`, leaving the engine untouched
    pub fn evaluate_from(&self, t: f64, state: &DVector<f64>) -> Result<DVector<f64>, ModelError> {
        if state.len() != self.layout.n_compartments() {
            return Err(ModelError::invalid(format!(
                "state vector has length {}, expected {}",
                state.len(),
                self.layout.n_compartments()
            )));
        }
        if t == 0.0 {
            return Ok(state.clone());
        }
        Ok(self.propagator(t)? * state)
    }

    /// Re-seed with `initial_state`, then evaluate at `t`
    pub fn evaluate_reseeded(
        &mut self,
        t: f64,
        initial_state: DVector<f64>,
    ) -> Result<DVector<f64>, ModelError> {
        self.reseed(initial_state)?;
        self.evaluate(t)
    }
}
