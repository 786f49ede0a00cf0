//! Scenario Orchestrator
//!
//! Builds six models, {mean, best, worst} x {no intervention, NPI}, and
//! derives the comparative risk metrics of a strategy.
//!
//! # Pipeline
//!
//! ```text
//! config ──> initial states (per mode, screening on the NPI branch only)
//!        ──> per scenario (in parallel):
//!              no-intervention runner: f = 1, no tests
//!                 └─ baseline risk, untested trajectory ─> assay metrics
//!              NPI runner: f = risk-posing fraction, strategy tests
//!                 └─ tested trajectory ─> residual risk per row
//!        ──> adherence blend ─> StrategyAssessment
//! ```
//!
//! # Example
//!
//! ```rust
//! use npi_strategy_core_rs::orchestrator::{CalculatorConfig, ScenarioOrchestrator};
//! use npi_strategy_core_rs::models::Strategy;
//!
//! let config = CalculatorConfig {
//!     strategy: Strategy {
//!         duration: 10,
//!         test_days: vec![5],
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//!
//! let orchestrator = ScenarioOrchestrator::new(&config).unwrap();
//! let assessment = orchestrator.run().unwrap();
//! assert_eq!(assessment.evaluation_points_with_tests().len(), 12);
//! ```

use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::assay::TestAssay;
use crate::core::timeline::{TestSchedule, Timeline};
use crate::error::ModelError;
use crate::models::compartments::{CompartmentLayout, Phase};
use crate::models::parameters::{DiseaseParameters, Scenario, ScenarioTriple};
use crate::models::strategy::{Mode, Strategy};
use crate::orchestrator::assessment::StrategyAssessment;
use crate::progression::{ProgressionEngine, TestAwareRunner, Trajectory};

// ============================================================================
// Configuration Types
// ============================================================================

/// Complete calculator configuration
///
/// Every field has a default, so a JSON document only needs to name what
/// differs from the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    /// Sub-compartment counts per phase
    pub layout: CompartmentLayout,

    /// Disease parameters and test characteristics
    pub parameters: DiseaseParameters,

    /// Explicit scenario residence times; derived from the parameter bounds
    /// when absent
    pub residence_times: Option<ScenarioTriple>,

    /// Strategy under evaluation
    pub strategy: Strategy,
}

impl CalculatorConfig {
    /// Parse a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        serde_json::from_str(json)
            .map_err(|e| ModelError::invalid(format!("malformed configuration: {}", e)))
    }

    /// Residence times of the three scenarios
    pub fn scenario_triple(&self) -> Result<ScenarioTriple, ModelError> {
        match self.residence_times {
            Some(triple) => Ok(triple),
            None => self.parameters.scenario_triple(),
        }
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// The two models of one uncertainty scenario
#[derive(Debug, Clone)]
struct ScenarioModels {
    scenario: Scenario,
    /// No tests, no screening
    no_intervention: TestAwareRunner,
    /// Full strategy
    npi: TestAwareRunner,
}

/// Per-scenario results before assembly into matrices
struct ScenarioOutcome {
    baseline_risk: f64,
    npi_risk: DVector<f64>,
    npi_trajectory: Trajectory,
    baseline_trajectory: Trajectory,
    detectability: DVector<f64>,
    efficacy: DVector<f64>,
}

/// Owns the six scenario models of one strategy evaluation
///
/// Construction validates all inputs; `run` is a pure function of the
/// constructed models and may be called repeatedly with identical results.
#[derive(Debug, Clone)]
pub struct ScenarioOrchestrator {
    layout: CompartmentLayout,
    timeline: Timeline,
    assay: TestAssay,
    adherence: f64,
    risk_posing_fraction: f64,
    baseline_initial_state: DVector<f64>,
    npi_initial_state: DVector<f64>,
    models: Vec<ScenarioModels>,
}

impl ScenarioOrchestrator {
    /// Create an orchestrator from a full configuration
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for any invalid parameter, residence time, test
    /// schedule or initial state. No partial computation is attempted.
    pub fn new(config: &CalculatorConfig) -> Result<Self, ModelError> {
        let triple = config.scenario_triple()?;
        Self::with_residence_times(&config.layout, &config.parameters, triple, &config.strategy)
    }

    /// Create an orchestrator with explicit scenario residence times
    pub fn with_residence_times(
        layout: &CompartmentLayout,
        parameters: &DiseaseParameters,
        triple: ScenarioTriple,
        strategy: &Strategy,
    ) -> Result<Self, ModelError> {
        parameters.validate()?;
        strategy.validate()?;
        let timeline = strategy.timeline()?;

        let assay = TestAssay::new(
            strategy.test_type,
            parameters.test_sensitivity(strategy.test_type),
            parameters.pcr_specificity,
        )?;
        let risk_posing_fraction = parameters.risk_posing_fraction(strategy.symptomatic_screening);

        let baseline_initial_state = initial_state(layout, strategy)?;
        let npi_initial_state = if strategy.symptomatic_screening {
            apply_symptomatic_screening(layout, &baseline_initial_state, risk_posing_fraction)
        } else {
            baseline_initial_state.clone()
        };

        let end_day = timeline.end_day();
        let models = Scenario::ALL
            .iter()
            .map(|&scenario| -> Result<ScenarioModels, ModelError> {
                let tau = *triple.get(scenario);
                let baseline_engine =
                    ProgressionEngine::new(layout, tau, 1.0, baseline_initial_state.clone())?;
                let npi_engine = ProgressionEngine::new(
                    layout,
                    tau,
                    risk_posing_fraction,
                    npi_initial_state.clone(),
                )?;
                Ok(ScenarioModels {
                    scenario,
                    no_intervention: TestAwareRunner::untested(baseline_engine, end_day),
                    npi: TestAwareRunner::new(npi_engine, timeline.schedule().clone(), &assay),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "orchestrator: mode={:?} end_day={} tests={:?} f={} adherence={}",
            strategy.mode,
            end_day,
            timeline.schedule().test_days(),
            risk_posing_fraction,
            strategy.adherence
        );

        Ok(Self {
            layout: layout.clone(),
            timeline,
            assay,
            adherence: strategy.adherence,
            risk_posing_fraction,
            baseline_initial_state,
            npi_initial_state,
            models,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn layout(&self) -> &CompartmentLayout {
        &self.layout
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn schedule(&self) -> &TestSchedule {
        self.timeline.schedule()
    }

    pub fn assay(&self) -> &TestAssay {
        &self.assay
    }

    pub fn risk_posing_fraction(&self) -> f64 {
        self.risk_posing_fraction
    }

    pub fn baseline_initial_state(&self) -> &DVector<f64> {
        &self.baseline_initial_state
    }

    pub fn npi_initial_state(&self) -> &DVector<f64> {
        &self.npi_initial_state
    }

    // ========================================================================
    // Risk calculation
    // ========================================================================

    /// Evaluate all scenarios and assemble the comparison
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if a scenario has zero no-intervention risk
    /// (relative metrics would be undefined); `NumericOverflow` if a
    /// propagation is not finite.
    pub fn run(&self) -> Result<StrategyAssessment, ModelError> {
        info!(
            "running strategy assessment: {} days, {} tests",
            self.timeline.end_day(),
            self.schedule().test_days().len()
        );

        let outcomes = self
            .models
            .par_iter()
            .map(|models| self.evaluate_scenario(models))
            .collect::<Result<Vec<_>, ModelError>>()?;

        let rows = self.schedule().row_count();
        let days = self.timeline.end_day() + 1;
        let mut risk_no_intervention = DMatrix::zeros(rows, Scenario::ALL.len());
        let mut risk_npi = DMatrix::zeros(rows, Scenario::ALL.len());
        let mut detectability = DMatrix::zeros(days, Scenario::ALL.len());
        let mut efficacy = DMatrix::zeros(days, Scenario::ALL.len());
        let mut npi_trajectories = Vec::with_capacity(outcomes.len());
        let mut baseline_trajectories = Vec::with_capacity(outcomes.len());

        for (col, outcome) in outcomes.into_iter().enumerate() {
            for row in 0..rows {
                risk_no_intervention[(row, col)] = outcome.baseline_risk;
                risk_npi[(row, col)] = self.adherence * outcome.npi_risk[row]
                    + (1.0 - self.adherence) * outcome.baseline_risk;
            }
            detectability.set_column(col, &outcome.detectability);
            efficacy.set_column(col, &outcome.efficacy);
            npi_trajectories.push(outcome.npi_trajectory);
            baseline_trajectories.push(outcome.baseline_trajectory);
        }

        let assessment = StrategyAssessment {
            risk_no_intervention,
            risk_npi,
            assay_detectability: detectability,
            test_efficacy: efficacy,
            evaluation_points_with_tests: self.timeline.evaluation_points_with_tests(),
            evaluation_points_without_tests: self.timeline.evaluation_points_without_tests(),
            npi_trajectories,
            baseline_trajectories,
        };

        let summary = assessment.release_summary();
        info!(
            "relative risk at release: {:.4} ({:.4}, {:.4})",
            summary.relative_risk.mid, summary.relative_risk.min, summary.relative_risk.max
        );
        Ok(assessment)
    }

    fn evaluate_scenario(&self, models: &ScenarioModels) -> Result<ScenarioOutcome, ModelError> {
        let baseline = &models.no_intervention;
        let start = Trajectory::single(0, self.baseline_initial_state.clone());
        let baseline_risk = baseline.integrate(&start)?[0];
        if !(baseline_risk > 0.0) {
            return Err(ModelError::invalid(format!(
                "no-intervention risk of the {} scenario is zero; relative metrics are undefined",
                models.scenario.name()
            )));
        }

        let npi_trajectory = models.npi.run_with_tests()?;
        let npi_risk = models.npi.integrate(&npi_trajectory)?;

        let baseline_trajectory = baseline.run_continuous(self.timeline.end_day())?;
        let (detectability, efficacy) = self.assay_metrics(&baseline_trajectory);

        debug!(
            "{} scenario: baseline risk {:.6}, final NPI risk {:.6}",
            models.scenario.name(),
            baseline_risk,
            npi_risk.iter().last().copied().unwrap_or(0.0)
        );

        Ok(ScenarioOutcome {
            baseline_risk,
            npi_risk,
            npi_trajectory,
            baseline_trajectory,
            detectability,
            efficacy,
        })
    }

    /// Daily detectability and efficacy from the untested baseline
    fn assay_metrics(&self, baseline: &Trajectory) -> (DVector<f64>, DVector<f64>) {
        let initial_population = if baseline.n_rows() > 0 {
            self.layout.population_mass(&baseline.row(0))
        } else {
            0.0
        };
        let probabilities = self
            .assay
            .positive_probabilities_by_row(&self.layout, baseline.states());

        let detectability = DVector::from_iterator(
            probabilities.len(),
            probabilities.iter().map(|p| {
                if initial_population > 0.0 {
                    p.any_positive() / initial_population
                } else {
                    0.0
                }
            }),
        );
        let efficacy = DVector::from_iterator(
            probabilities.len(),
            probabilities.iter().map(|p| p.efficacy()),
        );
        (detectability, efficacy)
    }
}

// ============================================================================
// Initial states
// ============================================================================

/// Initial state of the no-intervention branch for a strategy mode
pub fn initial_state(layout: &CompartmentLayout, strategy: &Strategy) -> Result<DVector<f64>, ModelError> {
    let mut state = DVector::zeros(layout.n_compartments());
    match &strategy.mode {
        Mode::ContactManagement => {
            state[0] = strategy.initial_infection_probability;
        }
        Mode::Isolation => {
            state[layout.first_compartment(Phase::Symptomatic)] = strategy.initial_infection_probability;
        }
        Mode::IncomingTravelers { initial_state } => {
            state = DVector::from_column_slice(initial_state);
            layout.validate_state(&state)?;
            if !(layout.population_mass(&state) > 0.0) {
                return Err(ModelError::invalid(
                    "incoming travelers distribution carries no population mass",
                ));
            }
        }
    }
    Ok(state)
}

/// Rescale the symptomatic compartments by the risk-posing fraction
pub fn apply_symptomatic_screening(
    layout: &CompartmentLayout,
    state: &DVector<f64>,
    risk_posing_fraction: f64,
) -> DVector<f64> {
    let mut screened = state.clone();
    for i in layout.phase_range(Phase::Symptomatic) {
        screened[i] *= risk_posing_fraction;
    }
    screened
}
