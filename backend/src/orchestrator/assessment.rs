//! Strategy assessment results
//!
//! All risk matrices have one row per evaluation point of the tested
//! trajectory and one column per scenario in [`Scenario::ALL`] order
//! (mean, best, worst). Assay matrices have one row per day.

use nalgebra::DMatrix;
use serde::Serialize;

use crate::models::parameters::Scenario;
use crate::progression::Trajectory;
use crate::summary::ScenarioRange;

/// Comparative risk metrics of one strategy
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyAssessment {
    pub(crate) risk_no_intervention: DMatrix<f64>,
    pub(crate) risk_npi: DMatrix<f64>,
    pub(crate) assay_detectability: DMatrix<f64>,
    pub(crate) test_efficacy: DMatrix<f64>,
    pub(crate) evaluation_points_with_tests: Vec<i64>,
    pub(crate) evaluation_points_without_tests: Vec<i64>,
    pub(crate) npi_trajectories: Vec<Trajectory>,
    pub(crate) baseline_trajectories: Vec<Trajectory>,
}

/// Final-row metrics ordered across scenarios
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReleaseSummary {
    pub relative_risk: ScenarioRange,
    pub risk_reduction: ScenarioRange,
    pub fold_risk_reduction: ScenarioRange,
}

impl StrategyAssessment {
    /// Risk without intervention, constant over rows
    pub fn risk_matrix_no_intervention(&self) -> &DMatrix<f64> {
        &self.risk_no_intervention
    }

    /// Adherence-blended risk under the strategy
    pub fn risk_matrix_npi(&self) -> &DMatrix<f64> {
        &self.risk_npi
    }

    /// Share of baseline risk that remains under the strategy
    pub fn relative_risk(&self) -> DMatrix<f64> {
        self.risk_npi
            .zip_map(&self.risk_no_intervention, |npi, baseline| npi / baseline)
    }

    /// `1 - relative_risk`
    pub fn risk_reduction(&self) -> DMatrix<f64> {
        self.relative_risk().map(|r| 1.0 - r)
    }

    /// Baseline risk over blended risk, saturating at `f64::MAX`
    pub fn fold_risk_reduction(&self) -> DMatrix<f64> {
        self.risk_no_intervention
            .zip_map(&self.risk_npi, |baseline, npi| {
                if npi > 0.0 {
                    (baseline / npi).min(f64::MAX)
                } else {
                    f64::MAX
                }
            })
    }

    /// Probability of a positive test per day, relative to the initial
    /// infected population
    pub fn temporal_assay_detectability(&self) -> &DMatrix<f64> {
        &self.assay_detectability
    }

    /// Probability that a positive individual is infectious, per day
    pub fn test_efficacy(&self) -> &DMatrix<f64> {
        &self.test_efficacy
    }

    pub fn evaluation_points_with_tests(&self) -> &[i64] {
        &self.evaluation_points_with_tests
    }

    pub fn evaluation_points_without_tests(&self) -> &[i64] {
        &self.evaluation_points_without_tests
    }

    pub fn npi_trajectory(&self, scenario: Scenario) -> &Trajectory {
        &self.npi_trajectories[scenario.index()]
    }

    pub fn baseline_trajectory(&self, scenario: Scenario) -> &Trajectory {
        &self.baseline_trajectories[scenario.index()]
    }

    /// Metrics at the end of the strategy
    pub fn release_summary(&self) -> ReleaseSummary {
        ReleaseSummary {
            relative_risk: last_row_range(&self.relative_risk()),
            risk_reduction: last_row_range(&self.risk_reduction()),
            fold_risk_reduction: last_row_range(&self.fold_risk_reduction()),
        }
    }
}

fn last_row_range(matrix: &DMatrix<f64>) -> ScenarioRange {
    match matrix.nrows() {
        0 => ScenarioRange::default(),
        rows => {
            let row = matrix.row(rows - 1);
            ScenarioRange::from_values([row[0], row[1], row[2]])
        }
    }
}
