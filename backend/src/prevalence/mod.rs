//! Prevalence Back-Estimator
//!
//! Reconstructs today's infection-age distribution from five weeks of
//! reported incidence. Each week contributes a cohort seeded across the
//! non-sink phases and propagated to today; the system is linear, so the
//! cohorts superpose.
//!
//! # Example
//!
//! ```rust
//! use npi_strategy_core_rs::models::{CompartmentLayout, DiseaseParameters, Scenario};
//! use npi_strategy_core_rs::prevalence::{PrevalenceEstimator, WeeklyIncidence};
//!
//! let layout = CompartmentLayout::canonical();
//! let triple = DiseaseParameters::default().scenario_triple().unwrap();
//! let estimator = PrevalenceEstimator::new(&layout, triple);
//!
//! let incidence = WeeklyIncidence::from_reports([50.0, 40.0, 30.0, 20.0, 10.0], 0.5).unwrap();
//! let estimate = estimator.estimate(&incidence).unwrap();
//! assert!(estimate.infectious_probability(Scenario::Mean) > 0.0);
//! ```

use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::models::compartments::{CompartmentLayout, Phase, PHASE_COUNT};
use crate::models::parameters::{DiseaseParameters, Scenario, ScenarioTriple};
use crate::models::strategy::Mode;
use crate::progression::{ProgressionEngine, TestAwareRunner};
use crate::summary::{row_ranges, ScenarioRange};

/// Number of reported weeks, current week first
pub const INCIDENCE_WEEKS: usize = 5;

pub const DAYS_PER_WEEK: usize = 7;

/// Population size reported case counts refer to
pub const REPORTING_POPULATION: f64 = 100_000.0;

// ============================================================================
// Incidence input
// ============================================================================

/// Weekly incidence as a fraction of the population, current week first
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; INCIDENCE_WEEKS]", into = "[f64; INCIDENCE_WEEKS]")]
pub struct WeeklyIncidence {
    weeks: [f64; INCIDENCE_WEEKS],
}

impl WeeklyIncidence {
    pub fn new(weeks: [f64; INCIDENCE_WEEKS]) -> Result<Self, ModelError> {
        if let Some(bad) = weeks.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(ModelError::invalid(format!(
                "weekly incidence must be finite and >= 0, got {}",
                bad
            )));
        }
        Ok(Self { weeks })
    }

    /// Convert reported weekly cases per 100 000 into incidence fractions
    ///
    /// `case_detection_rate` is the share of infections that get reported,
    /// in (0, 1].
    pub fn from_reports(
        cases_per_100k: [f64; INCIDENCE_WEEKS],
        case_detection_rate: f64,
    ) -> Result<Self, ModelError> {
        if !(case_detection_rate > 0.0 && case_detection_rate <= 1.0) {
            return Err(ModelError::invalid(format!(
                "case detection rate must be within (0, 1], got {}",
                case_detection_rate
            )));
        }
        let mut weeks = cases_per_100k;
        for week in weeks.iter_mut() {
            *week = *week / REPORTING_POPULATION / case_detection_rate;
        }
        Self::new(weeks)
    }

    pub fn weeks(&self) -> &[f64; INCIDENCE_WEEKS] {
        &self.weeks
    }

    /// Average daily incidence during `week` weeks ago
    pub fn daily(&self, week: usize) -> f64 {
        self.weeks.get(week).map_or(0.0, |w| w / DAYS_PER_WEEK as f64)
    }
}

impl TryFrom<[f64; INCIDENCE_WEEKS]> for WeeklyIncidence {
    type Error = ModelError;

    fn try_from(weeks: [f64; INCIDENCE_WEEKS]) -> Result<Self, Self::Error> {
        Self::new(weeks)
    }
}

impl From<WeeklyIncidence> for [f64; INCIDENCE_WEEKS] {
    fn from(incidence: WeeklyIncidence) -> Self {
        incidence.weeks
    }
}

// ============================================================================
// Estimator
// ============================================================================

/// Back-estimates today's compartment distribution for all scenarios
#[derive(Debug, Clone)]
pub struct PrevalenceEstimator {
    layout: CompartmentLayout,
    residence_times: ScenarioTriple,
}

impl PrevalenceEstimator {
    pub fn new(layout: &CompartmentLayout, residence_times: ScenarioTriple) -> Self {
        Self {
            layout: layout.clone(),
            residence_times,
        }
    }

    pub fn from_parameters(
        layout: &CompartmentLayout,
        parameters: &DiseaseParameters,
    ) -> Result<Self, ModelError> {
        parameters.validate()?;
        Ok(Self::new(layout, parameters.scenario_triple()?))
    }

    /// Cohort seeded by one day of incidence
    ///
    /// Spread over the non-sink phases in proportion to the mean scenario
    /// residence times, evenly within a phase.
    pub fn cohort(&self, daily_incidence: f64) -> DVector<f64> {
        let tau = &self.residence_times.mean;
        let total = tau.total();
        let mut state = DVector::zeros(self.layout.n_compartments());
        for phase in Phase::TRANSIENT {
            let share = tau.get(phase).unwrap_or(0.0) / total * daily_incidence;
            let per_compartment = share / self.layout.sub_compartments(phase) as f64;
            for i in self.layout.phase_range(phase) {
                state[i] = per_compartment;
            }
        }
        state
    }

    /// Superpose the weekly cohorts of `incidence` into today's state
    pub fn estimate(&self, incidence: &WeeklyIncidence) -> Result<PrevalenceEstimate, ModelError> {
        info!("estimating prevalence from weekly incidence {:?}", incidence.weeks());

        let states = Scenario::ALL
            .par_iter()
            .map(|&scenario| self.superpose(scenario, incidence))
            .collect::<Result<Vec<_>, ModelError>>()?;

        let n = self.layout.n_compartments();
        let mut compartment_states = DMatrix::zeros(n, Scenario::ALL.len());
        let mut phase_probabilities = DMatrix::zeros(PHASE_COUNT, Scenario::ALL.len());
        for (col, state) in states.iter().enumerate() {
            compartment_states.set_column(col, state);
            phase_probabilities.set_column(col, &self.layout.group_by_phase(state));
        }

        Ok(PrevalenceEstimate {
            layout: self.layout.clone(),
            compartment_states,
            phase_probabilities,
        })
    }

    fn superpose(
        &self,
        scenario: Scenario,
        incidence: &WeeklyIncidence,
    ) -> Result<DVector<f64>, ModelError> {
        let n = self.layout.n_compartments();
        let engine = ProgressionEngine::new(
            &self.layout,
            *self.residence_times.get(scenario),
            1.0,
            DVector::zeros(n),
        )?;
        let mut runner = TestAwareRunner::untested(engine, 0);
        let mut today = DVector::zeros(n);

        for week in 0..INCIDENCE_WEEKS {
            let end_day = (week + 1) * DAYS_PER_WEEK - 1;
            runner.engine_mut().reseed(self.cohort(incidence.daily(week)))?;
            let trajectory = runner.run_continuous(end_day)?;
            for row in trajectory.n_rows().saturating_sub(DAYS_PER_WEEK)..trajectory.n_rows() {
                today += trajectory.row(row);
            }
        }

        debug!(
            "{} scenario: prevalence {:.6}",
            scenario.name(),
            self.layout.population_mass(&today)
        );
        Ok(today)
    }
}

// ============================================================================
// Estimate
// ============================================================================

/// Today's infection-age distribution for the three scenarios
///
/// Matrices have one column per scenario in [`Scenario::ALL`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct PrevalenceEstimate {
    layout: CompartmentLayout,
    compartment_states: DMatrix<f64>,
    phase_probabilities: DMatrix<f64>,
}

impl PrevalenceEstimate {
    /// (N x 3) compartment probabilities
    pub fn compartment_states(&self) -> &DMatrix<f64> {
        &self.compartment_states
    }

    /// (5 x 3) phase probabilities
    pub fn phase_probabilities(&self) -> &DMatrix<f64> {
        &self.phase_probabilities
    }

    pub fn state(&self, scenario: Scenario) -> DVector<f64> {
        self.compartment_states.column(scenario.index()).clone_owned()
    }

    /// Initial state for the incoming travelers mode
    pub fn initial_state(&self, scenario: Scenario) -> Vec<f64> {
        self.compartment_states.column(scenario.index()).iter().copied().collect()
    }

    pub fn incoming_travelers_mode(&self, scenario: Scenario) -> Mode {
        Mode::IncomingTravelers {
            initial_state: self.initial_state(scenario),
        }
    }

    pub fn phase_probability(&self, phase: Phase, scenario: Scenario) -> f64 {
        self.phase_probabilities[(phase.index(), scenario.index())]
    }

    /// Probability of being currently infected and not yet recovered
    /// (predetection, presymptomatic or symptomatic)
    pub fn infectious_probability(&self, scenario: Scenario) -> f64 {
        [Phase::Predetection, Phase::Presymptomatic, Phase::Symptomatic]
            .iter()
            .map(|&phase| self.phase_probability(phase, scenario))
            .sum()
    }

    /// Probability of being in any non-sink phase
    pub fn total_prevalence(&self, scenario: Scenario) -> f64 {
        self.layout.population_mass(&self.state(scenario))
    }

    /// Ordered range of the infectious probability across scenarios
    pub fn infectious_range(&self) -> ScenarioRange {
        ScenarioRange::from_values(Scenario::ALL.map(|s| self.infectious_probability(s)))
    }

    /// Ordered range of each phase probability, one entry per phase
    pub fn phase_ranges(&self) -> Vec<ScenarioRange> {
        row_ranges(&self.phase_probabilities)
    }
}
