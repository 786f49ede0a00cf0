//! Diagnostic test models
//!
//! A test acts on the state vector as an elementwise multiplier, the false
//! omission rate: individuals correctly identified as infected are removed
//! (isolated), while missed cases and true negatives stay in place.
//!
//! Each test type carries its own rule for which compartments respond:
//!
//! | Compartments                     | PCR          | Antigen      |
//! |----------------------------------|--------------|--------------|
//! | predetection                     | specificity  | specificity  |
//! | first 2 of infectious window     | 1 - sens     | specificity  |
//! | middle of infectious window      | 1 - sens     | 1 - sens     |
//! | last 5 of infectious window      | 1 - sens     | specificity  |
//! | postinfectious, sink             | 1            | 1            |
//!
//! The infectious window is presymptomatic + symptomatic.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_probability, ModelError};
use crate::models::compartments::{CompartmentLayout, Phase};

/// Leading infectious-window compartments an antigen test cannot detect
pub const ANTIGEN_LEADING_BLIND_COMPARTMENTS: usize = 2;

/// Trailing infectious-window compartments an antigen test cannot detect
pub const ANTIGEN_TRAILING_BLIND_COMPARTMENTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    #[default]
    Pcr,
    Antigen,
}

/// How a compartment responds to a test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssayResponse {
    /// Only false positives possible; governed by specificity
    Specific,
    /// Infection detectable; governed by sensitivity
    Sensitive,
    /// Test outcome does not change the state
    Inert,
}

impl TestType {
    /// Compartments of the infectious window a test of this type detects
    pub fn detection_window(self, layout: &CompartmentLayout) -> std::ops::Range<usize> {
        let window = layout.infectious_range();
        match self {
            TestType::Pcr => window,
            TestType::Antigen => {
                let start = (window.start + ANTIGEN_LEADING_BLIND_COMPARTMENTS).min(window.end);
                let end = window
                    .end
                    .saturating_sub(ANTIGEN_TRAILING_BLIND_COMPARTMENTS)
                    .max(start);
                start..end
            }
        }
    }

    /// Response of `compartment` to a removal test
    pub fn response(self, layout: &CompartmentLayout, compartment: usize) -> AssayResponse {
        if self.detection_window(layout).contains(&compartment) {
            return AssayResponse::Sensitive;
        }
        if layout.phase_range(Phase::Predetection).contains(&compartment)
            || layout.infectious_range().contains(&compartment)
        {
            return AssayResponse::Specific;
        }
        AssayResponse::Inert
    }

    /// Grouping used for assay detectability
    ///
    /// Differs from [`TestType::response`] only for PCR, which also picks
    /// up residual RNA in postinfectious individuals. Those are never
    /// removed by a test since they no longer pose a risk.
    pub fn detection_class(self, layout: &CompartmentLayout, compartment: usize) -> AssayResponse {
        match self {
            TestType::Pcr if layout.phase_range(Phase::Postinfectious).contains(&compartment) => {
                AssayResponse::Sensitive
            }
            _ => self.response(layout, compartment),
        }
    }
}

/// Per-row positive-test probabilities
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositiveProbabilities {
    /// Positive result from an uninfected-like compartment
    pub false_positive: f64,
    /// Positive result from a detectable compartment
    pub detected: f64,
    /// Positive result from an infectious compartment
    pub true_positive: f64,
}

impl PositiveProbabilities {
    pub fn any_positive(&self) -> f64 {
        self.false_positive + self.detected
    }

    /// Probability that a positive individual is truly infectious
    pub fn efficacy(&self) -> f64 {
        let any = self.any_positive();
        if any > 0.0 {
            self.true_positive / any
        } else {
            0.0
        }
    }
}

/// A test type with its sensitivity and specificity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestAssay {
    pub test_type: TestType,
    pub sensitivity: f64,
    pub specificity: f64,
}

impl TestAssay {
    pub fn new(test_type: TestType, sensitivity: f64, specificity: f64) -> Result<Self, ModelError> {
        ensure_probability("test sensitivity", sensitivity)?;
        ensure_probability("test specificity", specificity)?;
        Ok(Self {
            test_type,
            sensitivity,
            specificity,
        })
    }

    /// Multiplier applied to the state at a test instant
    pub fn false_omission_rates(&self, layout: &CompartmentLayout) -> DVector<f64> {
        DVector::from_fn(layout.n_compartments(), |i, _| {
            match self.test_type.response(layout, i) {
                AssayResponse::Specific => self.specificity,
                AssayResponse::Sensitive => 1.0 - self.sensitivity,
                AssayResponse::Inert => 1.0,
            }
        })
    }

    /// Positive-test probabilities of one state row
    pub fn positive_probabilities(&self, layout: &CompartmentLayout, state: &[f64]) -> PositiveProbabilities {
        let infectious = layout.infectious_range();
        let mut probabilities = PositiveProbabilities::default();
        for (i, mass) in state.iter().enumerate() {
            match self.test_type.detection_class(layout, i) {
                AssayResponse::Specific => {
                    probabilities.false_positive += (1.0 - self.specificity) * mass;
                }
                AssayResponse::Sensitive => {
                    probabilities.detected += self.sensitivity * mass;
                    if infectious.contains(&i) {
                        probabilities.true_positive += self.sensitivity * mass;
                    }
                }
                AssayResponse::Inert => {}
            }
        }
        probabilities
    }

    /// Positive-test probabilities of every row of a (rows x N) matrix
    pub fn positive_probabilities_by_row(
        &self,
        layout: &CompartmentLayout,
        states: &DMatrix<f64>,
    ) -> Vec<PositiveProbabilities> {
        states
            .row_iter()
            .map(|row| {
                let row: Vec<f64> = row.iter().copied().collect();
                self.positive_probabilities(layout, &row)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcr_false_omission_rates() {
        let layout = CompartmentLayout::canonical();
        let assay = TestAssay::new(TestType::Pcr, 0.8, 0.99).unwrap();
        let rates = assay.false_omission_rates(&layout);

        for i in 0..5 {
            assert_eq!(rates[i], 0.99);
        }
        for i in 5..19 {
            assert!((rates[i] - 0.2).abs() < 1e-12);
        }
        assert_eq!(rates[19], 1.0);
        assert_eq!(rates[20], 1.0);
    }

    #[test]
    fn test_antigen_false_omission_rates() {
        let layout = CompartmentLayout::canonical();
        let assay = TestAssay::new(TestType::Antigen, 0.7, 0.98).unwrap();
        let rates = assay.false_omission_rates(&layout);

        // predetection and the first 2 of the infectious window
        for i in 0..7 {
            assert_eq!(rates[i], 0.98, "compartment {}", i);
        }
        for i in 7..14 {
            assert!((rates[i] - 0.3).abs() < 1e-12, "compartment {}", i);
        }
        // last 5 of the window
        for i in 14..19 {
            assert_eq!(rates[i], 0.98, "compartment {}", i);
        }
        assert_eq!(rates[19], 1.0);
        assert_eq!(rates[20], 1.0);
    }

    #[test]
    fn test_antigen_window_clamps_on_short_layouts() {
        let layout = CompartmentLayout::new([1, 1, 3, 1, 1]).unwrap();
        let window = TestType::Antigen.detection_window(&layout);
        assert!(window.is_empty());
    }

    #[test]
    fn test_pcr_detects_postinfectious_for_assay_metrics() {
        let layout = CompartmentLayout::canonical();
        assert_eq!(TestType::Pcr.response(&layout, 19), AssayResponse::Inert);
        assert_eq!(
            TestType::Pcr.detection_class(&layout, 19),
            AssayResponse::Sensitive
        );
        assert_eq!(TestType::Antigen.detection_class(&layout, 19), AssayResponse::Inert);
    }

    #[test]
    fn test_efficacy_without_positives_is_zero() {
        let probabilities = PositiveProbabilities::default();
        assert_eq!(probabilities.efficacy(), 0.0);
    }

    fn graded_state(layout: &CompartmentLayout) -> Vec<f64> {
        (0..layout.n_compartments()).map(|i| (i + 1) as f64 * 0.01).collect()
    }

    fn mass(state: &[f64], range: std::ops::Range<usize>) -> f64 {
        state[range].iter().sum()
    }

    #[test]
    fn test_pcr_positive_probabilities() {
        let layout = CompartmentLayout::canonical();
        let state = graded_state(&layout);
        let assay = TestAssay::new(TestType::Pcr, 0.8, 0.99).unwrap();
        let p = assay.positive_probabilities(&layout, &state);

        assert!((p.false_positive - 0.01 * mass(&state, 0..5)).abs() < 1e-12);
        // presymptomatic, symptomatic and postinfectious are detectable
        assert!((p.detected - 0.8 * mass(&state, 5..20)).abs() < 1e-12);
        // only presymptomatic and symptomatic are infectious
        assert!((p.true_positive - 0.8 * mass(&state, 5..19)).abs() < 1e-12);
        assert!((p.efficacy() - p.true_positive / (p.false_positive + p.detected)).abs() < 1e-15);
    }

    #[test]
    fn test_antigen_positive_probabilities() {
        let layout = CompartmentLayout::canonical();
        let state = graded_state(&layout);
        let assay = TestAssay::new(TestType::Antigen, 0.7, 0.98).unwrap();
        let p = assay.positive_probabilities(&layout, &state);

        let blind = mass(&state, 0..7) + mass(&state, 14..19);
        assert!((p.false_positive - 0.02 * blind).abs() < 1e-12);
        assert!((p.detected - 0.7 * mass(&state, 7..14)).abs() < 1e-12);
        assert_eq!(p.detected, p.true_positive);
    }

    #[test]
    fn test_positive_probabilities_by_row() {
        let layout = CompartmentLayout::canonical();
        let state = graded_state(&layout);
        let mut rows = DMatrix::zeros(2, layout.n_compartments());
        rows.set_row(1, &nalgebra::RowDVector::from_row_slice(&state));
        let assay = TestAssay::new(TestType::Pcr, 0.8, 0.99).unwrap();

        let by_row = assay.positive_probabilities_by_row(&layout, &rows);
        assert_eq!(by_row[0], PositiveProbabilities::default());
        assert_eq!(by_row[1], assay.positive_probabilities(&layout, &state));
    }
}
