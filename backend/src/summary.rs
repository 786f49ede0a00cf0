//! Scenario range ordering
//!
//! Results are computed for the mean, best and worst scenario, but the
//! "best" scenario does not always yield the lowest risk. Reports are
//! therefore ordered by value: the median becomes `mid`, the extremes
//! become `min` and `max`.
//!
//! Ties break by index, first occurrence wins: the first minimal value is
//! `min`, the first maximal value is `max`, and `mid` is the remaining one.
//! When all three values are equal every role points at index 0.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Median and extremes of a scenario triple
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScenarioRange {
    pub mid: f64,
    pub min: f64,
    pub max: f64,
}

impl ScenarioRange {
    /// Order three scenario values
    pub fn from_values(values: [f64; 3]) -> Self {
        let (mid, min, max) = ordering_indices(values);
        Self {
            mid: values[mid],
            min: values[min],
            max: values[max],
        }
    }

    pub fn as_tuple(&self) -> (f64, f64, f64) {
        (self.mid, self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Indices of (median, min, max) among three values
///
/// When all three values are equal, all three indices are 0.
pub fn ordering_indices(values: [f64; 3]) -> (usize, usize, usize) {
    let mut min = 0;
    let mut max = 0;
    for (i, &value) in values.iter().enumerate().skip(1) {
        if value < values[min] {
            min = i;
        }
        if value > values[max] {
            max = i;
        }
    }
    let mid = if min == max { 0 } else { 3 - min - max };
    (mid, min, max)
}

/// Order three reals into (median, min, max)
pub fn mid_min_max(a: f64, b: f64, c: f64) -> (f64, f64, f64) {
    ScenarioRange::from_values([a, b, c]).as_tuple()
}

/// Order every row of a (rows x 3) scenario matrix into (mid, min, max)
/// columns
pub fn order_rows(scenarios: &DMatrix<f64>) -> DMatrix<f64> {
    let mut ordered = DMatrix::zeros(scenarios.nrows(), 3);
    for (r, row) in scenarios.row_iter().enumerate() {
        let range = ScenarioRange::from_values([row[0], row[1], row[2]]);
        ordered[(r, 0)] = range.mid;
        ordered[(r, 1)] = range.min;
        ordered[(r, 2)] = range.max;
    }
    ordered
}

/// Ordered ranges of every row of a (rows x 3) scenario matrix
pub fn row_ranges(scenarios: &DMatrix<f64>) -> Vec<ScenarioRange> {
    scenarios
        .row_iter()
        .map(|row| ScenarioRange::from_values([row[0], row[1], row[2]]))
        .collect()
}
