//! Test-Aware Runner
//!
//! Wraps a [`ProgressionEngine`] with a diagnostic test schedule and
//! integrates residual transmission risk.
//!
//! # Trajectory layout
//!
//! ```text
//! tests on day 2, end day 4:
//!
//! row  day  state
//!  0    0   X(0)
//!  1    1   X(1)
//!  2    2   X(2)              pre-test
//!  3    2   FOR * X(2)        post-test, seeds the next segment
//!  4    3   ...
//!  5    4   ...
//! ```

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::assay::TestAssay;
use crate::core::timeline::TestSchedule;
use crate::error::ModelError;
use crate::progression::engine::ProgressionEngine;

/// Residual risk is integrated up to this many days after exposure
pub const RISK_HORIZON_DAYS: usize = 100;

/// States over time, one row per evaluation point
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    days: Vec<usize>,
    states: DMatrix<f64>,
}

impl Trajectory {
    /// Assemble a trajectory from per-row days and state vectors
    pub fn from_rows(days: Vec<usize>, rows: &[DVector<f64>]) -> Result<Self, ModelError> {
        if days.len() != rows.len() {
            return Err(ModelError::invalid(format!(
                "{} days for {} state rows",
                days.len(),
                rows.len()
            )));
        }
        let n = rows.first().map_or(0, |row| row.len());
        if rows.iter().any(|row| row.len() != n) {
            return Err(ModelError::invalid("state rows differ in length"));
        }
        let states = DMatrix::from_fn(rows.len(), n, |r, c| rows[r][c]);
        Ok(Self { days, states })
    }

    /// Single-row trajectory at `day`
    pub fn single(day: usize, state: DVector<f64>) -> Self {
        let states = DMatrix::from_row_slice(1, state.len(), state.as_slice());
        Self {
            days: vec![day],
            states,
        }
    }

    pub fn days(&self) -> &[usize] {
        &self.days
    }

    /// (rows x N) state matrix
    pub fn states(&self) -> &DMatrix<f64> {
        &self.states
    }

    pub fn n_rows(&self) -> usize {
        self.days.len()
    }

    pub fn row(&self, index: usize) -> DVector<f64> {
        self.states.row(index).transpose()
    }

    pub fn final_state(&self) -> Option<DVector<f64>> {
        self.n_rows().checked_sub(1).map(|last| self.row(last))
    }
}

/// Engine plus test schedule
#[derive(Debug, Clone)]
pub struct TestAwareRunner {
    engine: ProgressionEngine,
    schedule: TestSchedule,
    false_omission_rates: DVector<f64>,
}

impl TestAwareRunner {
    pub fn new(engine: ProgressionEngine, schedule: TestSchedule, assay: &TestAssay) -> Self {
        let false_omission_rates = assay.false_omission_rates(engine.layout());
        Self {
            engine,
            schedule,
            false_omission_rates,
        }
    }

    /// Runner without tests; every row is untransformed
    pub fn untested(engine: ProgressionEngine, end_day: usize) -> Self {
        let n = engine.layout().n_compartments();
        Self {
            engine,
            schedule: TestSchedule::untested(end_day),
            false_omission_rates: DVector::from_element(n, 1.0),
        }
    }

    pub fn engine(&self) -> &ProgressionEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ProgressionEngine {
        &mut self.engine
    }

    pub fn schedule(&self) -> &TestSchedule {
        &self.schedule
    }

    pub fn false_omission_rates(&self) -> &DVector<f64> {
        &self.false_omission_rates
    }

    /// Days `0..=end_time` from the engine's initial state, no tests
    pub fn run_continuous(&self, end_time: usize) -> Result<Trajectory, ModelError> {
        let rows = (0..=end_time)
            .map(|day| self.engine.evaluate(day as f64))
            .collect::<Result<Vec<_>, _>>()?;
        Trajectory::from_rows((0..=end_time).collect(), &rows)
    }

    /// Run the schedule, applying the false omission rates on test days
    ///
    /// With an empty schedule this equals `run_continuous(end_day)`.
    pub fn run_with_tests(&self) -> Result<Trajectory, ModelError> {
        let mut rows = Vec::with_capacity(self.schedule.row_count());
        let mut state = self.engine.initial_state().clone();

        for segment in self.schedule.segments() {
            for offset in 0..=segment.len() {
                rows.push(self.engine.evaluate_from(offset as f64, &state)?);
            }
            if segment.ends_with_test {
                let last = rows.last().cloned().unwrap_or_else(|| state.clone());
                state = last.component_mul(&self.false_omission_rates);
                debug!(
                    "test on day {}: population mass {:.6} -> {:.6}",
                    segment.end,
                    self.engine.layout().population_mass(&last),
                    self.engine.layout().population_mass(&state)
                );
            }
        }

        Trajectory::from_rows(self.schedule.row_days(), &rows)
    }

    /// Incremental sink mass each row accumulates up to the risk horizon
    ///
    /// Each row is treated as a fresh initial state at its own day and
    /// propagated to day [`RISK_HORIZON_DAYS`]; rows past the horizon
    /// contribute nothing.
    pub fn integrate(&self, trajectory: &Trajectory) -> Result<DVector<f64>, ModelError> {
        let sink = self.engine.layout().sink();
        let mut risk = DVector::zeros(trajectory.n_rows());
        for (i, &day) in trajectory.days().iter().enumerate() {
            let row = trajectory.row(i);
            let remaining = RISK_HORIZON_DAYS.saturating_sub(day) as f64;
            let at_horizon = self.engine.evaluate_from(remaining, &row)?;
            risk[i] = at_horizon[sink] - row[sink];
        }
        Ok(risk)
    }
}
