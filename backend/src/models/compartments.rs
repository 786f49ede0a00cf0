//! Compartment layout of the disease-progression chain
//!
//! The state vector is partitioned into five contiguous phases. Each phase
//! is split into sub-compartments so that the time spent in a phase follows
//! an Erlang distribution rather than an exponential one.
//!
//! ```text
//! [predetection x5][presymptomatic x1][symptomatic x13][postinfectious x1][sink]
//! ```

use std::ops::Range;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Number of phases, including the risk sink
pub const PHASE_COUNT: usize = 5;

/// A named group of contiguous compartments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Infected but not yet detectable nor infectious
    Predetection,
    /// Infectious before symptom onset
    Presymptomatic,
    /// Infectious with symptoms
    Symptomatic,
    /// Detectable but no longer infectious
    Postinfectious,
    /// Absorbing risk accumulator
    RiskSink,
}

impl Phase {
    /// All phases in chain order
    pub const ALL: [Phase; PHASE_COUNT] = [
        Phase::Predetection,
        Phase::Presymptomatic,
        Phase::Symptomatic,
        Phase::Postinfectious,
        Phase::RiskSink,
    ];

    /// Phases that carry a residence time
    pub const TRANSIENT: [Phase; 4] = [
        Phase::Predetection,
        Phase::Presymptomatic,
        Phase::Symptomatic,
        Phase::Postinfectious,
    ];

    pub fn index(self) -> usize {
        match self {
            Phase::Predetection => 0,
            Phase::Presymptomatic => 1,
            Phase::Symptomatic => 2,
            Phase::Postinfectious => 3,
            Phase::RiskSink => 4,
        }
    }
}

/// Sub-compartment counts per phase
///
/// # Example
/// ```
/// use npi_strategy_core_rs::models::{CompartmentLayout, Phase};
///
/// let layout = CompartmentLayout::canonical();
/// assert_eq!(layout.n_compartments(), 21);
/// assert_eq!(layout.first_compartment(Phase::Symptomatic), 6);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[usize; PHASE_COUNT]", into = "[usize; PHASE_COUNT]")]
pub struct CompartmentLayout {
    sub_compartments: [usize; PHASE_COUNT],
}

impl CompartmentLayout {
    /// Sub-compartment counts used by the calculator
    pub const CANONICAL: [usize; PHASE_COUNT] = [5, 1, 13, 1, 1];

    /// Create a layout; every phase needs a compartment and the sink exactly one
    pub fn new(sub_compartments: [usize; PHASE_COUNT]) -> Result<Self, ModelError> {
        if let Some(phase) = Phase::TRANSIENT
            .iter()
            .find(|phase| sub_compartments[phase.index()] == 0)
        {
            return Err(ModelError::invalid(format!(
                "phase {:?} needs at least one sub-compartment",
                phase
            )));
        }
        if sub_compartments[Phase::RiskSink.index()] != 1 {
            return Err(ModelError::invalid(format!(
                "the risk sink must be a single compartment, got {}",
                sub_compartments[Phase::RiskSink.index()]
            )));
        }
        Ok(Self { sub_compartments })
    }

    pub fn canonical() -> Self {
        Self {
            sub_compartments: Self::CANONICAL,
        }
    }

    /// Total number of compartments N
    pub fn n_compartments(&self) -> usize {
        self.sub_compartments.iter().sum()
    }

    pub fn sub_compartments(&self, phase: Phase) -> usize {
        self.sub_compartments[phase.index()]
    }

    /// Index range of the compartments belonging to `phase`
    pub fn phase_range(&self, phase: Phase) -> Range<usize> {
        let start: usize = self.sub_compartments[..phase.index()].iter().sum();
        start..start + self.sub_compartments[phase.index()]
    }

    pub fn first_compartment(&self, phase: Phase) -> usize {
        self.phase_range(phase).start
    }

    pub fn last_compartment(&self, phase: Phase) -> usize {
        self.phase_range(phase).end - 1
    }

    /// Index of the risk sink (always the last compartment)
    pub fn sink(&self) -> usize {
        self.n_compartments() - 1
    }

    /// Presymptomatic and symptomatic compartments
    pub fn infectious_range(&self) -> Range<usize> {
        self.first_compartment(Phase::Presymptomatic)..self.phase_range(Phase::Symptomatic).end
    }

    /// Phase a compartment belongs to
    pub fn phase_of(&self, compartment: usize) -> Option<Phase> {
        Phase::ALL
            .iter()
            .copied()
            .find(|&phase| self.phase_range(phase).contains(&compartment))
    }

    /// Sum a state vector per phase
    pub fn group_by_phase(&self, state: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            PHASE_COUNT,
            Phase::ALL
                .iter()
                .map(|&phase| self.phase_range(phase).map(|i| state[i]).sum::<f64>()),
        )
    }

    /// Sum every row of a (rows x N) state matrix per phase
    pub fn group_rows_by_phase(&self, states: &DMatrix<f64>) -> DMatrix<f64> {
        DMatrix::from_fn(states.nrows(), PHASE_COUNT, |row, col| {
            self.phase_range(Phase::ALL[col])
                .map(|i| states[(row, i)])
                .sum()
        })
    }

    /// Mass outside the risk sink
    pub fn population_mass(&self, state: &DVector<f64>) -> f64 {
        state.rows(0, self.sink()).sum()
    }

    /// Check that `state` is a valid state vector for this layout
    pub fn validate_state(&self, state: &DVector<f64>) -> Result<(), ModelError> {
        if state.len() != self.n_compartments() {
            return Err(ModelError::invalid(format!(
                "state vector has length {}, expected {}",
                state.len(),
                self.n_compartments()
            )));
        }
        if let Some((i, v)) = state
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(ModelError::invalid(format!(
                "compartment {} holds invalid mass {}",
                i, v
            )));
        }
        Ok(())
    }
}

impl Default for CompartmentLayout {
    fn default() -> Self {
        Self::canonical()
    }
}

impl TryFrom<[usize; PHASE_COUNT]> for CompartmentLayout {
    type Error = ModelError;

    fn try_from(value: [usize; PHASE_COUNT]) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CompartmentLayout> for [usize; PHASE_COUNT] {
    fn from(layout: CompartmentLayout) -> Self {
        layout.sub_compartments
    }
}
